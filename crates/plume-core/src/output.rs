// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Result Stream
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Binary result streaming.
//!
//! Snapshots append packed records of four little-endian `f32` values
//! (time index, global x, global y, value). Record order is not
//! significant; the reader sorts. Appends serialize through one lock
//! so concurrent emitters never interleave partial records.

use plume_types::error::PlumeResult;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Mutex;

/// One snapshot record of a single global node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRecord {
    pub time_index: usize,
    pub x: usize,
    pub y: usize,
    pub value: f64,
}

impl FieldRecord {
    fn to_bytes(self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&(self.time_index as f32).to_le_bytes());
        bytes[4..8].copy_from_slice(&(self.x as f32).to_le_bytes());
        bytes[8..12].copy_from_slice(&(self.y as f32).to_le_bytes());
        bytes[12..16].copy_from_slice(&(self.value as f32).to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; 16]) -> Self {
        let read = |k: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&bytes[4 * k..4 * k + 4]);
            f32::from_le_bytes(word)
        };
        FieldRecord {
            time_index: read(0) as usize,
            x: read(1) as usize,
            y: read(2) as usize,
            value: read(3) as f64,
        }
    }
}

/// Consumer of finished snapshots.
pub trait SnapshotSink: Send {
    fn emit(&mut self, t_step: usize, records: &[FieldRecord]) -> PlumeResult<()>;
}

/// Sink that drops every snapshot (dry runs, stability tests).
#[derive(Debug, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn emit(&mut self, _t_step: usize, _records: &[FieldRecord]) -> PlumeResult<()> {
        Ok(())
    }
}

/// Append-only binary result file.
#[derive(Debug)]
pub struct ResultStream {
    writer: Mutex<BufWriter<File>>,
}

impl ResultStream {
    /// Create (truncate) the result file.
    pub fn create<P: AsRef<Path>>(path: P) -> PlumeResult<Self> {
        let file = File::create(path)?;
        Ok(ResultStream {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Append one record atomically.
    pub fn append(&self, record: FieldRecord) -> PlumeResult<()> {
        let mut writer = self.writer.lock().expect("result stream lock poisoned");
        writer.write_all(&record.to_bytes())?;
        Ok(())
    }

    /// Append a batch of records under a single lock acquisition.
    pub fn append_batch(&self, records: &[FieldRecord]) -> PlumeResult<()> {
        let mut writer = self.writer.lock().expect("result stream lock poisoned");
        for record in records {
            writer.write_all(&record.to_bytes())?;
        }
        Ok(())
    }

    pub fn flush(&self) -> PlumeResult<()> {
        let mut writer = self.writer.lock().expect("result stream lock poisoned");
        writer.flush()?;
        Ok(())
    }
}

impl SnapshotSink for ResultStream {
    fn emit(&mut self, t_step: usize, records: &[FieldRecord]) -> PlumeResult<()> {
        tracing::debug!(t_step, count = records.len(), "appending snapshot records");
        self.append_batch(records)
    }
}

/// Read a result file back (test and tooling support).
pub fn read_records<P: AsRef<Path>>(path: P) -> PlumeResult<Vec<FieldRecord>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut bytes = [0u8; 16];
    loop {
        match reader.read_exact(&mut bytes) {
            Ok(()) => records.push(FieldRecord::from_bytes(&bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("plume_output_{tag}_{}.bin", std::process::id()))
    }

    #[test]
    fn test_record_byte_roundtrip() {
        let record = FieldRecord { time_index: 12, x: 3, y: 45, value: 1.25 };
        let restored = FieldRecord::from_bytes(&record.to_bytes());
        assert_eq!(restored, record);
    }

    #[test]
    fn test_stream_write_read() {
        let path = scratch_path("roundtrip");
        {
            let stream = ResultStream::create(&path).unwrap();
            stream
                .append(FieldRecord { time_index: 0, x: 0, y: 0, value: 0.5 })
                .unwrap();
            stream
                .append_batch(&[
                    FieldRecord { time_index: 1, x: 2, y: 3, value: 4.0 },
                    FieldRecord { time_index: 1, x: 2, y: 4, value: 5.0 },
                ])
                .unwrap();
            stream.flush().unwrap();
        }
        let records = read_records(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].x, 2);
        assert_eq!(records[2].y, 4);
        assert!((records[2].value - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_record_size_is_sixteen_bytes() {
        let path = scratch_path("size");
        {
            let stream = ResultStream::create(&path).unwrap();
            stream
                .append_batch(&[FieldRecord { time_index: 9, x: 8, y: 7, value: 6.0 }; 5])
                .unwrap();
            stream.flush().unwrap();
        }
        let len = std::fs::metadata(&path).unwrap().len();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(len, 5 * 16);
    }
}
