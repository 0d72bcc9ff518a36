// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Geometry
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Subdomain lattice geometry.
//!
//! The global domain is a regular lattice of fixed-size subdomains.
//! Subdomain extents are compile-time constants; the configuration file
//! must agree with them (checked at startup).

/// Points per subdomain along x at the fine level.
pub const SUBDOMAIN_X: usize = 16;

/// Points per subdomain along y at the fine level.
pub const SUBDOMAIN_Y: usize = 16;

/// Number of sides a subdomain has.
pub const NSIDES: usize = 4;

/// One side of a rectangular subdomain.
///
/// `Up`/`Down` run along y, `Left`/`Right` along x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Up,
    Down,
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; NSIDES] = [Side::Up, Side::Down, Side::Left, Side::Right];

    /// The side a neighbor presents back across this one.
    pub fn opposite(self) -> Side {
        match self {
            Side::Up => Side::Down,
            Side::Down => Side::Up,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Outward unit normal (nx, ny) of this side.
    pub fn outward_normal(self) -> (f64, f64) {
        match self {
            Side::Up => (0.0, 1.0),
            Side::Down => (0.0, -1.0),
            Side::Left => (-1.0, 0.0),
            Side::Right => (1.0, 0.0),
        }
    }

    /// Dense index for per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Side::Up => 0,
            Side::Down => 1,
            Side::Left => 2,
            Side::Right => 3,
        }
    }
}

/// Position of a subdomain on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubdomainIdx {
    pub ix: usize,
    pub iy: usize,
}

impl SubdomainIdx {
    pub fn new(ix: usize, iy: usize) -> Self {
        SubdomainIdx { ix, iy }
    }
}

/// The lattice of subdomains covering the global domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lattice {
    pub nx: usize,
    pub ny: usize,
}

impl Lattice {
    pub fn new(nx: usize, ny: usize) -> Self {
        Lattice { nx, ny }
    }

    /// Total number of subdomains.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat slot index of a subdomain (x outer, y inner).
    pub fn flat(&self, idx: SubdomainIdx) -> usize {
        debug_assert!(idx.ix < self.nx && idx.iy < self.ny);
        idx.ix * self.ny + idx.iy
    }

    /// Inverse of [`Lattice::flat`].
    pub fn position(&self, flat: usize) -> SubdomainIdx {
        debug_assert!(flat < self.len());
        SubdomainIdx::new(flat / self.ny, flat % self.ny)
    }

    /// Iterate all subdomain positions in flat order.
    pub fn iter(&self) -> impl Iterator<Item = SubdomainIdx> + '_ {
        (0..self.len()).map(|k| self.position(k))
    }

    /// Whether `side` of `idx` lies on the outer boundary of the domain.
    pub fn is_outer(&self, idx: SubdomainIdx, side: Side) -> bool {
        match side {
            Side::Left => idx.ix == 0,
            Side::Right => idx.ix + 1 == self.nx,
            Side::Down => idx.iy == 0,
            Side::Up => idx.iy + 1 == self.ny,
        }
    }

    /// Neighbor across `side`, if any.
    pub fn neighbor(&self, idx: SubdomainIdx, side: Side) -> Option<SubdomainIdx> {
        if self.is_outer(idx, side) {
            return None;
        }
        Some(match side {
            Side::Left => SubdomainIdx::new(idx.ix - 1, idx.iy),
            Side::Right => SubdomainIdx::new(idx.ix + 1, idx.iy),
            Side::Down => SubdomainIdx::new(idx.ix, idx.iy - 1),
            Side::Up => SubdomainIdx::new(idx.ix, idx.iy + 1),
        })
    }

    /// Global node count along x at the fine level.
    pub fn global_nodes_x(&self) -> usize {
        self.nx * SUBDOMAIN_X
    }

    /// Global node count along y at the fine level.
    pub fn global_nodes_y(&self) -> usize {
        self.ny * SUBDOMAIN_Y
    }

    /// Global abscissa of a local fine node.
    pub fn global_x(&self, idx: SubdomainIdx, x: usize) -> usize {
        debug_assert!(x < SUBDOMAIN_X);
        idx.ix * SUBDOMAIN_X + x
    }

    /// Global ordinate of a local fine node.
    pub fn global_y(&self, idx: SubdomainIdx, y: usize) -> usize {
        debug_assert!(y < SUBDOMAIN_Y);
        idx.iy * SUBDOMAIN_Y + y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite_involution() {
        for side in Side::ALL {
            assert_eq!(side.opposite().opposite(), side);
        }
    }

    #[test]
    fn test_side_normals_oppose() {
        for side in Side::ALL {
            let (nx, ny) = side.outward_normal();
            let (ox, oy) = side.opposite().outward_normal();
            assert_eq!(nx, -ox);
            assert_eq!(ny, -oy);
        }
    }

    #[test]
    fn test_flat_position_roundtrip() {
        let lattice = Lattice::new(4, 3);
        for k in 0..lattice.len() {
            assert_eq!(lattice.flat(lattice.position(k)), k);
        }
    }

    #[test]
    fn test_outer_detection() {
        let lattice = Lattice::new(3, 2);
        assert!(lattice.is_outer(SubdomainIdx::new(0, 0), Side::Left));
        assert!(lattice.is_outer(SubdomainIdx::new(0, 0), Side::Down));
        assert!(!lattice.is_outer(SubdomainIdx::new(0, 0), Side::Right));
        assert!(lattice.is_outer(SubdomainIdx::new(2, 1), Side::Right));
        assert!(lattice.is_outer(SubdomainIdx::new(2, 1), Side::Up));
        assert!(!lattice.is_outer(SubdomainIdx::new(1, 1), Side::Left));
    }

    #[test]
    fn test_neighbor_symmetry() {
        let lattice = Lattice::new(4, 4);
        for idx in lattice.iter() {
            for side in Side::ALL {
                if let Some(peer) = lattice.neighbor(idx, side) {
                    assert_eq!(lattice.neighbor(peer, side.opposite()), Some(idx));
                }
            }
        }
    }

    #[test]
    fn test_global_coordinates() {
        let lattice = Lattice::new(2, 2);
        assert_eq!(lattice.global_nodes_x(), 2 * SUBDOMAIN_X);
        assert_eq!(lattice.global_x(SubdomainIdx::new(1, 0), 3), SUBDOMAIN_X + 3);
        assert_eq!(lattice.global_y(SubdomainIdx::new(0, 1), 0), SUBDOMAIN_Y);
    }
}
