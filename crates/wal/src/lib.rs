//! Write-ahead log: append-only, page-level durability and crash
//! recovery for the Pager (spec §4.B).
//!
//! Every record is length-prefixed and carries a monotonically
//! increasing `lsn`. A `Write` record captures a full page image before
//! it is applied to the main file; a `Commit` record marks the lsn up to
//! which writes are durable. Recovery replays every `Write` whose lsn is
//! at most the highest `Commit` lsn seen; anything after a torn or
//! missing commit is discarded, per spec "Failure semantics".


use bincode::config::{self, Config};
use bincode::serde::{decode_from_slice, encode_to_vec};
use common::{DbError, DbResult, PageId};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

fn bincode_config() -> impl Config {
    config::legacy()
}

/// A single WAL entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WalRecord {
    /// A full page image that must be applied to the main file.
    Write { lsn: u64, page: PageId, bytes: Vec<u8> },
    /// Marks every `Write` with `lsn` at most this one as durable.
    Commit { lsn: u64 },
}

impl WalRecord {
    fn lsn(&self) -> u64 {
        match self {
            WalRecord::Write { lsn, .. } => *lsn,
            WalRecord::Commit { lsn } => *lsn,
        }
    }
}

/// Append-only write-ahead log file, parallel to the main `.sawit` file
/// (conventionally `<name>.wal`).
pub struct Wal {
    path: PathBuf,
    file: File,
    next_lsn: u64,
}

impl Wal {
    /// Open or create the WAL file. Does not replay; call [`Wal::recover`]
    /// first if recovery is desired, then reopen for fresh appends.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| DbError::StorageFault(format!("open WAL {}: {e}", path.display())))?;
        Ok(Self { path, file, next_lsn: 1 })
    }

    /// Resume lsn allocation after a recovery so fresh appends don't
    /// collide with replayed ones.
    pub fn resume_from(&mut self, last_lsn: u64) {
        self.next_lsn = last_lsn + 1;
    }

    /// The lsn most recently assigned by [`Wal::append_write`]; used to
    /// mark a statement's commit point (spec invariant #5).
    pub fn last_lsn(&self) -> u64 {
        self.next_lsn.saturating_sub(1)
    }

    fn write_record(&mut self, record: &WalRecord) -> DbResult<()> {
        let bytes = encode_to_vec(record, bincode_config())
            .map_err(|e| DbError::StorageFault(format!("encode WAL record: {e}")))?;
        let len = bytes.len() as u32;
        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&bytes)?;
        Ok(())
    }

    /// Append a page-write record and return the lsn it was assigned.
    pub fn append_write(&mut self, page: PageId, bytes: &[u8]) -> DbResult<u64> {
        let lsn = self.next_lsn;
        self.next_lsn += 1;
        self.write_record(&WalRecord::Write {
            lsn,
            page,
            bytes: bytes.to_vec(),
        })?;
        Ok(lsn)
    }

    /// Append a commit marker for the given lsn (spec invariant #5: a
    /// commit marker is written before the statement returns success).
    pub fn append_commit(&mut self, lsn: u64) -> DbResult<()> {
        self.write_record(&WalRecord::Commit { lsn })
    }

    /// Force the WAL to durable storage.
    pub fn flush(&mut self) -> DbResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Replay the WAL at `path`, returning the ordered list of committed
    /// page writes to apply, and the highest lsn observed (so the caller
    /// can resume allocation past it). Stops at the first incomplete
    /// frame rather than erroring: a torn trailing record means the
    /// process crashed mid-append and that record was never committed.
    pub fn recover(path: impl AsRef<Path>) -> DbResult<(Vec<(PageId, Vec<u8>)>, u64)> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok((Vec::new(), 0));
        }
        let mut file = File::open(path)?;
        let mut pending: Vec<(u64, PageId, Vec<u8>)> = Vec::new();
        let mut max_committed_lsn = 0u64;
        let mut max_lsn_seen = 0u64;

        loop {
            let mut len_buf = [0u8; 4];
            match file.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(DbError::StorageFault(format!("read WAL length: {e}"))),
            }
            let len = u32::from_le_bytes(len_buf) as usize;
            let mut buf = vec![0u8; len];
            if file.read_exact(&mut buf).is_err() {
                // Torn trailing record: the crash landed mid-append.
                break;
            }
            let record: WalRecord = match decode_from_slice(&buf, bincode_config()) {
                Ok((r, _)) => r,
                Err(_) => break,
            };
            max_lsn_seen = max_lsn_seen.max(record.lsn());
            match record {
                WalRecord::Write { lsn, page, bytes } => pending.push((lsn, page, bytes)),
                WalRecord::Commit { lsn } => {
                    max_committed_lsn = max_committed_lsn.max(lsn);
                }
            }
        }

        pending.retain(|(lsn, _, _)| *lsn <= max_committed_lsn);
        pending.sort_by_key(|(lsn, _, _)| *lsn);
        Ok((
            pending.into_iter().map(|(_, p, b)| (p, b)).collect(),
            max_lsn_seen,
        ))
    }

    /// Truncate the WAL file after its records have been fully applied
    /// (spec §4.B "After successful replay, the WAL is truncated").
    pub fn checkpoint(&mut self) -> DbResult<()> {
        self.file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }

    pub fn close(self) -> DbResult<()> {
        Ok(())
    }
}
