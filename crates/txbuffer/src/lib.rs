//! Per-session transaction buffer (spec §4.F).
//!
//! A session's writes inside an active transaction are redirected here
//! instead of being applied; `COMMIT` replays them in order against the
//! live executors, `ROLLBACK` discards them. `SELECT`s never read the
//! buffer — while a transaction is active they see only committed state,
//! an accepted simplification of this core.

use common::{DbError, DbResult};
use parser::Command;

/// One buffered mutation, recorded in the order it was issued.
#[derive(Clone, Debug)]
pub struct BufferedOp {
    pub command: Command,
}

/// Per-session buffer of mutations awaiting `COMMIT` or `ROLLBACK`.
#[derive(Default)]
pub struct TransactionBuffer {
    ops: Option<Vec<BufferedOp>>,
}

impl TransactionBuffer {
    pub fn new() -> Self {
        Self { ops: None }
    }

    pub fn is_active(&self) -> bool {
        self.ops.is_some()
    }

    /// Start a transaction. `BEGIN` inside an active transaction is an
    /// error (spec §4.F).
    pub fn begin(&mut self) -> DbResult<()> {
        if self.ops.is_some() {
            return Err(DbError::ConstraintViolation("transaction already active".into()));
        }
        self.ops = Some(Vec::new());
        Ok(())
    }

    /// Append a mutation to the buffer. Callers must check
    /// [`TransactionBuffer::is_active`] first; buffering without an
    /// active transaction is a programming error.
    pub fn buffer(&mut self, command: Command) -> DbResult<()> {
        self.ops
            .as_mut()
            .ok_or_else(|| DbError::ConstraintViolation("no active transaction".into()))?
            .push(BufferedOp { command });
        Ok(())
    }

    /// Discard the buffer.
    pub fn rollback(&mut self) {
        self.ops = None;
    }

    /// Take the buffered operations for replay against the live
    /// executors and clear the buffer. The caller is responsible for
    /// applying each operation in order and rolling back on the first
    /// failure (spec §4.F "a failure aborts and triggers rollback").
    pub fn take_for_commit(&mut self) -> DbResult<Vec<BufferedOp>> {
        self.ops
            .take()
            .ok_or_else(|| DbError::ConstraintViolation("no active transaction".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_then_buffer_then_commit_drains_in_order() {
        let mut buf = TransactionBuffer::new();
        assert!(!buf.is_active());
        buf.begin().unwrap();
        assert!(buf.is_active());
        buf.buffer(parser::parse("INSERT INTO t (id) VALUES (1)")).unwrap();
        buf.buffer(parser::parse("INSERT INTO t (id) VALUES (2)")).unwrap();
        let ops = buf.take_for_commit().unwrap();
        assert_eq!(ops.len(), 2);
        assert!(!buf.is_active());
    }

    #[test]
    fn rollback_discards_buffered_ops() {
        let mut buf = TransactionBuffer::new();
        buf.begin().unwrap();
        buf.buffer(parser::parse("DELETE FROM t WHERE id = 1")).unwrap();
        buf.rollback();
        assert!(!buf.is_active());
        assert!(buf.take_for_commit().is_err());
    }

    #[test]
    fn nested_begin_is_an_error() {
        let mut buf = TransactionBuffer::new();
        buf.begin().unwrap();
        assert!(buf.begin().is_err());
    }

    #[test]
    fn buffering_without_a_transaction_is_an_error() {
        let mut buf = TransactionBuffer::new();
        assert!(buf.buffer(parser::parse("COMMIT")).is_err());
    }
}
