//! Append-only JSONL log.
//!
//! One JSON document per line. Used for the session and reward history
//! (`sessions.log`, `rewards.log`). Reads stream line by line, so a log may
//! grow past the size limit for whole-file reads.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LexisError, Result};

/// Maximum size of a single log line (1 MB).
pub const MAX_LINE_SIZE: u64 = 1024 * 1024;

/// Typed append-only log file.
#[derive(Debug, Clone)]
pub struct JsonlLog<T> {
    /// Path to the log file.
    path: PathBuf,
    _entry: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonlLog<T> {
    /// Create a log at the given path. The file is created on first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _entry: PhantomData,
        }
    }

    /// Append an entry to the log.
    pub fn append(&self, entry: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| LexisError::storage(parent, e))?;
        }

        let json = serde_json::to_string(entry)
            .map_err(|e| LexisError::serde(format!("failed to serialize log entry: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LexisError::storage(&self.path, e))?;

        writeln!(file, "{}", json).map_err(|e| LexisError::storage(&self.path, e))?;

        Ok(())
    }

    /// Visit every entry in append order.
    ///
    /// A torn final line (a crash mid-append) is skipped with a warning;
    /// a malformed line anywhere else is an error.
    pub fn for_each<F: FnMut(T)>(&self, mut visit: F) -> Result<()> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(LexisError::storage(&self.path, e)),
        };

        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let mut line_num = 0;
        loop {
            line.clear();
            let read = (&mut reader)
                .take(MAX_LINE_SIZE + 1)
                .read_line(&mut line)
                .map_err(|e| LexisError::storage(&self.path, e))?;
            if read == 0 {
                break;
            }
            line_num += 1;

            if line.len() as u64 > MAX_LINE_SIZE {
                return Err(LexisError::store(format!(
                    "{} line {} exceeds {} bytes",
                    self.path.display(),
                    line_num,
                    MAX_LINE_SIZE
                )));
            }

            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str(text) {
                Ok(entry) => visit(entry),
                // Only the last line can lack its newline
                Err(e) if !line.ends_with('\n') => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = line_num,
                        error = %e,
                        "skipping torn final log line"
                    );
                }
                Err(e) => {
                    return Err(LexisError::serde(format!(
                        "failed to parse {} line {}: {}",
                        self.path.display(),
                        line_num,
                        e
                    )));
                }
            }
        }

        Ok(())
    }

    /// Read all entries in append order.
    pub fn read_all(&self) -> Result<Vec<T>> {
        let mut entries = Vec::new();
        self.for_each(|entry| entries.push(entry))?;
        Ok(entries)
    }

    /// Up to `limit` entries, most recent first.
    pub fn read_recent(&self, limit: usize) -> Result<Vec<T>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut window = VecDeque::with_capacity(limit);
        self.for_each(|entry| {
            if window.len() == limit {
                window.pop_front();
            }
            window.push_back(entry);
        })?;
        Ok(window.into_iter().rev().collect())
    }

    /// Entries matching `predicate`, in append order.
    pub fn read_matching<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> Result<Vec<T>> {
        let mut entries = Vec::new();
        self.for_each(|entry| {
            if predicate(&entry) {
                entries.push(entry);
            }
        })?;
        Ok(entries)
    }

    /// Count the number of entries in the log.
    pub fn count(&self) -> Result<usize> {
        let mut count = 0;
        self.for_each(|_| count += 1)?;
        Ok(count)
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::MAX_FILE_SIZE;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        n: u32,
    }

    #[test]
    fn test_append_and_read() {
        let dir = TempDir::new().unwrap();
        let log: JsonlLog<Entry> = JsonlLog::new(dir.path().join("sub").join("test.log"));

        assert!(log.read_all().unwrap().is_empty());
        assert_eq!(log.count().unwrap(), 0);

        for n in 0..3 {
            log.append(&Entry { n }).unwrap();
        }

        assert_eq!(log.count().unwrap(), 3);
        assert_eq!(
            log.read_all().unwrap(),
            vec![Entry { n: 0 }, Entry { n: 1 }, Entry { n: 2 }]
        );
        assert_eq!(
            log.read_recent(2).unwrap(),
            vec![Entry { n: 2 }, Entry { n: 1 }]
        );
    }

    #[test]
    fn test_one_entry_per_line() {
        let dir = TempDir::new().unwrap();
        let log: JsonlLog<Entry> = JsonlLog::new(dir.path().join("test.log"));
        log.append(&Entry { n: 7 }).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "{\"n\":7}\n");
    }

    #[test]
    fn test_torn_final_line_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        fs::write(&path, "{\"n\":1}\n{\"n\":").unwrap();

        let log: JsonlLog<Entry> = JsonlLog::new(&path);
        assert_eq!(log.read_all().unwrap(), vec![Entry { n: 1 }]);
    }

    #[test]
    fn test_read_matching() {
        let dir = TempDir::new().unwrap();
        let log: JsonlLog<Entry> = JsonlLog::new(dir.path().join("test.log"));
        for n in 0..6 {
            log.append(&Entry { n }).unwrap();
        }

        let even = log.read_matching(|e| e.n % 2 == 0).unwrap();
        assert_eq!(even, vec![Entry { n: 0 }, Entry { n: 2 }, Entry { n: 4 }]);
        assert!(log.read_recent(0).unwrap().is_empty());
    }

    #[test]
    fn test_log_larger_than_read_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.log");
        let padding = "x".repeat(1024);
        let lines = (MAX_FILE_SIZE / 1024) as u32 + 100;
        let mut content = String::new();
        for n in 0..lines {
            content.push_str(&format!("{{\"n\":{},\"pad\":\"{}\"}}\n", n, padding));
        }
        fs::write(&path, content).unwrap();
        assert!(fs::metadata(&path).unwrap().len() > MAX_FILE_SIZE);

        let log: JsonlLog<Entry> = JsonlLog::new(&path);
        assert_eq!(
            log.read_recent(2).unwrap(),
            vec![Entry { n: lines - 1 }, Entry { n: lines - 2 }]
        );
        assert_eq!(log.read_matching(|e| e.n == 3).unwrap(), vec![Entry { n: 3 }]);
        assert_eq!(log.count().unwrap(), lines as usize);
    }

    #[test]
    fn test_overlong_line_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let line = format!("{{\"n\":1,\"pad\":\"{}\"}}\n", "x".repeat(MAX_LINE_SIZE as usize));
        fs::write(&path, line).unwrap();

        let log: JsonlLog<Entry> = JsonlLog::new(&path);
        let err = log.read_all().unwrap_err().to_string();
        assert!(err.contains("exceeds"));
    }

    #[test]
    fn test_malformed_middle_line_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        fs::write(&path, "{\"n\":1}\nnot json\n{\"n\":2}\n").unwrap();

        let log: JsonlLog<Entry> = JsonlLog::new(&path);
        let err = log.read_all().unwrap_err().to_string();
        assert!(err.contains("line 2"));
    }
}
