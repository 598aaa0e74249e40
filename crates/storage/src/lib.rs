//! Pager: fixed-size page allocator, two-tier buffer/object cache, and
//! durable page writes for the single `.sawit` database file.
//!
//! # Page format
//!
//! Every page is exactly [`PAGE_SIZE`] bytes:
//!
//! ```text
//! offset 0..4   next-page pointer (u32 LE, 0 = end of chain)
//! offset 4..6   record count (u16 LE)
//! offset 6..8   free offset (u16 LE), always in [8, PAGE_SIZE]
//! offset 8..    records: len(u16 LE) || UTF-8 JSON payload, concatenated
//! ```
//!
//! Records are rows encoded as `serde_json` objects. The Pager does not
//! know about rows beyond decoding/encoding this tuple stream: the
//! catalog and executor are responsible for what the JSON means.

pub mod heap;
#[cfg(test)]
mod tests;

use common::{DbError, DbResult, PageId};
use lru::LruCache;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const PAGE_SIZE: usize = 4096;
const HEADER_LEN: usize = 8;
const NEXT_OFFSET: usize = 0;
const COUNT_OFFSET: usize = 4;
const FREE_OFFSET: usize = 6;

/// Raw decoded page header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageHeader {
    pub next_page: u32,
    pub record_count: u16,
    pub free_offset: u16,
}

impl PageHeader {
    fn read(data: &[u8; PAGE_SIZE]) -> Self {
        Self {
            next_page: u32::from_le_bytes(data[NEXT_OFFSET..NEXT_OFFSET + 4].try_into().unwrap()),
            record_count: u16::from_le_bytes(
                data[COUNT_OFFSET..COUNT_OFFSET + 2].try_into().unwrap(),
            ),
            free_offset: u16::from_le_bytes(data[FREE_OFFSET..FREE_OFFSET + 2].try_into().unwrap()),
        }
    }

    fn write(&self, data: &mut [u8; PAGE_SIZE]) {
        data[NEXT_OFFSET..NEXT_OFFSET + 4].copy_from_slice(&self.next_page.to_le_bytes());
        data[COUNT_OFFSET..COUNT_OFFSET + 2].copy_from_slice(&self.record_count.to_le_bytes());
        data[FREE_OFFSET..FREE_OFFSET + 2].copy_from_slice(&self.free_offset.to_le_bytes());
    }

    fn fresh() -> Self {
        Self {
            next_page: 0,
            record_count: 0,
            free_offset: HEADER_LEN as u16,
        }
    }
}

pub type PageBytes = [u8; PAGE_SIZE];

fn zeroed_page() -> PageBytes {
    [0u8; PAGE_SIZE]
}

/// Decode the `len || payload` tuple stream of a page into raw byte
/// records plus its header.
fn decode_records(data: &PageBytes) -> DbResult<(PageHeader, Vec<Vec<u8>>)> {
    let header = PageHeader::read(data);
    if !(HEADER_LEN..=PAGE_SIZE).contains(&(header.free_offset as usize)) {
        return Err(DbError::StorageFault(format!(
            "page free offset {} out of bounds",
            header.free_offset
        )));
    }
    let mut records = Vec::with_capacity(header.record_count as usize);
    let mut cursor = HEADER_LEN;
    let limit = header.free_offset as usize;
    while cursor < limit {
        if cursor + 2 > limit {
            return Err(DbError::StorageFault("torn record length prefix".into()));
        }
        let len = u16::from_le_bytes(data[cursor..cursor + 2].try_into().unwrap()) as usize;
        cursor += 2;
        if cursor + len > limit {
            return Err(DbError::StorageFault("torn record payload".into()));
        }
        records.push(data[cursor..cursor + len].to_vec());
        cursor += len;
    }
    if records.len() != header.record_count as usize {
        return Err(DbError::StorageFault(format!(
            "record count mismatch: header says {}, decoded {}",
            header.record_count,
            records.len()
        )));
    }
    Ok((header, records))
}

/// Encode a fresh page body from a next-pointer and an ordered list of
/// byte records (already-serialized JSON payloads).
fn encode_page(next_page: u32, records: &[Vec<u8>]) -> DbResult<PageBytes> {
    let mut data = zeroed_page();
    let mut cursor = HEADER_LEN;
    for r in records {
        if r.len() > u16::MAX as usize {
            return Err(DbError::StorageFault("record exceeds 64KiB".into()));
        }
        let needed = 2 + r.len();
        if cursor + needed > PAGE_SIZE {
            return Err(DbError::StorageFault("record does not fit in a page".into()));
        }
        data[cursor..cursor + 2].copy_from_slice(&(r.len() as u16).to_le_bytes());
        cursor += 2;
        data[cursor..cursor + r.len()].copy_from_slice(r);
        cursor += r.len();
    }
    let header = PageHeader {
        next_page,
        record_count: records.len() as u16,
        free_offset: cursor as u16,
    };
    header.write(&mut data);
    Ok(data)
}

/// How many more bytes of raw records a page with `used` bytes already
/// written can accept.
pub fn remaining_capacity(used_free_offset: u16) -> usize {
    PAGE_SIZE.saturating_sub(used_free_offset as usize)
}

/// Durability hook the Pager writes through before any page mutation
/// reaches the main file (spec §4.A "Durability").
pub trait WalSink: Send {
    fn log_page_write(&mut self, page: PageId, bytes: &PageBytes) -> DbResult<()>;
    fn flush(&mut self) -> DbResult<()>;
}

/// Fixed-size page allocator with a two-tier LRU cache: a buffer cache of
/// raw page bytes and an object cache of pre-decoded `(next, records)`
/// pairs (spec §4.A). Both evict independently but share access order.
pub struct Pager {
    path: PathBuf,
    file: File,
    num_pages: u32,
    buffer_cache: LruCache<PageId, PageBytes>,
    object_cache: LruCache<PageId, (PageId, Vec<Vec<u8>>)>,
    wal: Option<Box<dyn WalSink>>,
}

impl Pager {
    /// Open (creating if absent) the database file at `path`, formatting
    /// page 0 if the file is new (spec §3 "Lifecycle").
    pub fn open(path: impl AsRef<Path>, buffer_pool_pages: usize) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let is_new = !path.exists();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(DbError::StorageFault(format!(
                "database file {} has a torn trailing page",
                path.display()
            )));
        }
        let num_pages = (len / PAGE_SIZE as u64) as u32;
        let cap = NonZeroUsize::new(buffer_pool_pages.max(1)).unwrap();

        let mut pager = Self {
            path,
            file,
            num_pages,
            buffer_cache: LruCache::new(cap),
            object_cache: LruCache::new(cap),
            wal: None,
        };

        if is_new || num_pages == 0 {
            let id = pager.alloc_page()?;
            debug_assert_eq!(id.0, 0);
        }
        Ok(pager)
    }

    pub fn attach_wal(&mut self, wal: Box<dyn WalSink>) {
        self.wal = Some(wal);
    }

    pub fn page_count(&self) -> u32 {
        self.num_pages
    }

    fn check_bounds(&self, id: PageId) -> DbResult<()> {
        if id.0 >= self.num_pages {
            return Err(DbError::StorageFault(format!("page {} out of range", id.0)));
        }
        Ok(())
    }

    fn read_from_disk(&mut self, id: PageId) -> DbResult<PageBytes> {
        self.check_bounds(id)?;
        let mut buf = zeroed_page();
        self.file.seek(SeekFrom::Start(id.0 as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read the raw bytes of a page, consulting (and populating) the
    /// buffer cache.
    pub fn read_page(&mut self, id: PageId) -> DbResult<PageBytes> {
        if let Some(bytes) = self.buffer_cache.get(&id) {
            return Ok(*bytes);
        }
        let bytes = self.read_from_disk(id)?;
        self.buffer_cache.put(id, bytes);
        Ok(bytes)
    }

    /// Read a page's decoded `(next_page, row_bytes)` pair, consulting
    /// (and populating) the object cache.
    pub fn read_page_objects(&mut self, id: PageId) -> DbResult<(PageId, Vec<Vec<u8>>)> {
        if let Some(cached) = self.object_cache.get(&id) {
            return Ok(cached.clone());
        }
        let bytes = self.read_page(id)?;
        let (header, records) = decode_records(&bytes)?;
        let next = PageId(header.next_page);
        self.object_cache.put(id, (next, records.clone()));
        Ok((next, records))
    }

    /// Write raw page bytes through the WAL (if attached) and invalidate
    /// both cache tiers for this page id (spec §9 "Pager object cache
    /// with mutation").
    pub fn write_page(&mut self, id: PageId, bytes: PageBytes) -> DbResult<()> {
        if let Some(wal) = self.wal.as_mut() {
            wal.log_page_write(id, &bytes)?;
            wal.flush()?;
        }
        self.file.seek(SeekFrom::Start(id.0 as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(&bytes)?;
        self.buffer_cache.put(id, bytes);
        self.object_cache.pop(&id);
        Ok(())
    }

    /// Rewrite a page's entire record stream from scratch. Used by
    /// insert/update/delete so that a statement touching several rows in
    /// one page performs a single write (spec §9 `_pageId` hint note).
    pub fn write_page_objects(
        &mut self,
        id: PageId,
        next_page: PageId,
        records: &[Vec<u8>],
    ) -> DbResult<()> {
        let bytes = encode_page(next_page.0, records)?;
        self.write_page(id, bytes)?;
        Ok(())
    }

    /// Patch only a page's next-pointer, leaving its records untouched.
    pub fn set_next_page(&mut self, id: PageId, next_page: PageId) -> DbResult<()> {
        let mut bytes = self.read_page(id)?;
        let mut header = PageHeader::read(&bytes);
        header.next_page = next_page.0;
        header.write(&mut bytes);
        self.write_page(id, bytes)
    }

    /// Allocate a fresh zeroed page and extend the file by one page
    /// (spec §4.A "Allocation"). Pages are never freed in this core.
    pub fn alloc_page(&mut self) -> DbResult<PageId> {
        let id = PageId(self.num_pages);
        let page = PageHeader::fresh();
        let mut bytes = zeroed_page();
        page.write(&mut bytes);
        self.file.seek(SeekFrom::Start(id.0 as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(&bytes)?;
        self.num_pages += 1;
        self.buffer_cache.put(id, bytes);
        self.object_cache.put(id, (PageId(0), Vec::new()));
        Ok(id)
    }

    /// Force the main file (and WAL, if attached) to durable storage.
    pub fn flush(&mut self) -> DbResult<()> {
        self.file.sync_all()?;
        if let Some(wal) = self.wal.as_mut() {
            wal.flush()?;
        }
        Ok(())
    }

    pub fn close(mut self) -> DbResult<()> {
        self.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Walk a table's full page chain starting at `start`, returning the
    /// ids visited in order. Used by recovery/consistency checks and by
    /// the index rebuild scan.
    pub fn chain_ids(&mut self, start: PageId) -> DbResult<Vec<PageId>> {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        let mut current = start;
        while current.0 != 0 || ids.is_empty() {
            if !seen.insert(current) {
                return Err(DbError::StorageFault("page chain cycle detected".into()));
            }
            ids.push(current);
            let (next, _) = self.read_page_objects(current)?;
            if next.0 == 0 {
                break;
            }
            current = next;
        }
        Ok(ids)
    }
}
