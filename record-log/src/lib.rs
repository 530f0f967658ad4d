use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use thiserror::Error;

/// A record as submitted by a client: an open JSON object with no fixed
/// schema. Arbitrary fields pass through untouched.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum RecordLogError {
    #[error("failed to access the record store")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record")]
    Serialize(#[from] serde_json::Error),

    #[error("record store writer lock poisoned")]
    LockPoisoned,
}

/// Append-only store of ingested records, one JSON object per line.
///
/// Appends are serialized by a process-local mutex and synced to disk before
/// they report success, so concurrent writers can neither lose each other's
/// records nor interleave partial lines. Log order is the order writers
/// acquire the lock. Records are never updated or deleted once written.
pub struct RecordLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RecordLog {
    pub const FILE_NAME: &'static str = "records.jsonl";

    /// Opens the store under `data_dir`, creating the directory if needed.
    ///
    /// An existing file is scanned once: everything after the first
    /// unparseable line is truncated away so that a crash-torn or corrupted
    /// tail can never propagate into reads. Dropping data this way is a
    /// deliberate recovery policy and is reported as a warning.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, RecordLogError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;

        let log = Self {
            path: data_dir.join(Self::FILE_NAME),
            lock: Mutex::new(()),
        };
        log.truncate_damaged_tail()?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably appends one record. Returns only after the line has been
    /// written and synced, so a success response is never lost to a crash.
    pub fn append(&self, record: &Record) -> Result<(), RecordLogError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().map_err(|_| RecordLogError::LockPoisoned)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }

    /// Reads every record currently in the store. A missing file is an empty
    /// store; a damaged line is skipped with a warning rather than failing
    /// the whole read.
    pub fn read_all(&self) -> Result<Vec<Record>, RecordLogError> {
        let _guard = self.lock.lock().map_err(|_| RecordLogError::LockPoisoned)?;
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) if err.kind() == ErrorKind::InvalidData => {
                    tracing::warn!("stopping read at undecodable bytes in {}", self.path.display());
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(&line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!("skipping damaged record line in {}: {}", self.path.display(), err);
                }
            }
        }
        Ok(records)
    }

    /// Cuts the file back to its longest parseable prefix. A fully garbled
    /// file resets to empty.
    fn truncate_damaged_tail(&self) -> Result<(), RecordLogError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let total_bytes = file.metadata()?.len();

        let mut reader = BufReader::new(file);
        let mut valid_bytes: u64 = 0;
        let mut valid_records: usize = 0;
        let mut line = String::new();
        loop {
            line.clear();
            let read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::InvalidData => break,
                Err(err) => return Err(err.into()),
            };
            // A line without a terminator is a torn append.
            if !line.ends_with('\n') {
                break;
            }
            if serde_json::from_str::<Record>(line.trim_end()).is_err() {
                break;
            }
            valid_bytes += read as u64;
            valid_records += 1;
        }

        if valid_bytes < total_bytes {
            tracing::warn!(
                "record store {} is damaged; keeping {} records, dropping {} trailing bytes",
                self.path.display(),
                valid_records,
                total_bytes - valid_bytes,
            );
            let file = OpenOptions::new().write(true).open(&self.path)?;
            file.set_len(valid_bytes)?;
            file.sync_data()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(id: &str) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::String(id.to_string()));
        record
    }

    #[test]
    fn test_read_all_on_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let log = RecordLog::open(dir.path()).unwrap();

        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_initializes_missing_store() {
        let dir = tempdir().unwrap();
        let log = RecordLog::open(dir.path()).unwrap();

        log.append(&record("a1")).unwrap();

        let all = log.read_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get("id"), Some(&Value::String("a1".to_string())));
    }

    #[test]
    fn test_appends_preserve_arrival_order() {
        let dir = tempdir().unwrap();
        let log = RecordLog::open(dir.path()).unwrap();

        for id in ["first", "second", "third"] {
            log.append(&record(id)).unwrap();
        }

        let ids: Vec<String> = log
            .read_all()
            .unwrap()
            .iter()
            .map(|r| r.get("id").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_garbage_store_resets_to_the_new_record() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(RecordLog::FILE_NAME), "this is not json\n").unwrap();

        let log = RecordLog::open(dir.path()).unwrap();
        log.append(&record("fresh")).unwrap();

        let all = log.read_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get("id"), Some(&Value::String("fresh".to_string())));
    }

    #[test]
    fn test_torn_trailing_line_is_dropped() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(RecordLog::FILE_NAME),
            "{\"id\":\"a\"}\n{\"id\":\"b\"}\n{\"id\":\"tr",
        )
        .unwrap();

        let log = RecordLog::open(dir.path()).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 2);

        log.append(&record("c")).unwrap();
        let ids: Vec<String> = log
            .read_all()
            .unwrap()
            .iter()
            .map(|r| r.get("id").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let dir = tempdir().unwrap();
        let log = Arc::new(RecordLog::open(dir.path()).unwrap());

        let mut handles = Vec::new();
        for thread in 0..8 {
            let log = Arc::clone(&log);
            handles.push(std::thread::spawn(move || {
                for i in 0..25 {
                    log.append(&record(&format!("{}-{}", thread, i))).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let all = log.read_all().unwrap();
        assert_eq!(all.len(), 200);

        let ids: HashSet<String> = all
            .iter()
            .map(|r| r.get("id").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), 200);
    }
}
