use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::engine::types::Transaction;

/// Append-only transaction log, one JSON record per line.
///
/// The engine's command loop is the only writer. Appends go straight to the
/// operating system; an explicit [`sync`](TransactionLog::sync) pushes them
/// to stable storage on checkpoint and shutdown.
pub struct TransactionLog {
    file: File,
    path: PathBuf,
}

impl TransactionLog {
    /// Opens (or creates) the log at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { file, path })
    }

    /// Reads every record currently in the log, oldest first.
    ///
    /// A final line that does not parse is treated as a torn append from a
    /// crash: it is logged and dropped, and replay stops there.
    pub fn replay(&self) -> io::Result<Vec<Transaction>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Transaction>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "dropping unparseable transaction log tail"
                    );
                    break;
                }
            }
        }
        Ok(records)
    }

    /// Appends one record and hands it to the operating system.
    pub fn append(&mut self, record: &Transaction) -> io::Result<()> {
        let mut line = serde_json::to_vec(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push(b'\n');
        self.file.write_all(&line)
    }

    /// Forces everything appended so far onto stable storage.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_data()
    }

    /// Empties the log and rewinds the write offset. Called after a
    /// checkpoint has made the logged records redundant.
    pub fn truncate(&mut self) -> io::Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
