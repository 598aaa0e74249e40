//! Bridges [`wal::Wal`] (owned separately so the database can append
//! commit markers after a statement's page writes) to the [`storage`]
//! crate's [`storage::WalSink`] hook, which the Pager calls before every
//! page write (spec §4.A "Durability").

use common::{DbResult, PageId};
use std::sync::{Arc, Mutex};
use storage::{PageBytes, WalSink};
use wal::Wal;

pub struct WalAdapter(pub Arc<Mutex<Wal>>);

impl WalSink for WalAdapter {
    fn log_page_write(&mut self, page: PageId, bytes: &PageBytes) -> DbResult<()> {
        self.0.lock().expect("wal mutex poisoned").append_write(page, bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> DbResult<()> {
        self.0.lock().expect("wal mutex poisoned").flush()
    }
}
