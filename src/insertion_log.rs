//! InsertionLog: insertion-ordered record of weak entries.
//!
//! Entries are keyed by a monotonically increasing sequence number that is
//! never reused, so a traversal cursor stays valid across any mix of
//! removals and insertions between steps. The log strongly holds each
//! entry's weak handle and cancellation token; it is the sole source of
//! truth for iteration order.

use crate::reclaim::Token;
use std::collections::BTreeMap;
use std::rc::Weak;

pub(crate) struct LogEntry<T> {
    pub(crate) weak: Weak<T>,
    pub(crate) addr: usize,
    pub(crate) token: Token,
}

pub(crate) struct InsertionLog<T> {
    entries: BTreeMap<u64, LogEntry<T>>,
    next_seq: u64,
}

impl<T> InsertionLog<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Sequence number the next `push` will assign.
    pub(crate) fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub(crate) fn push(&mut self, weak: Weak<T>, addr: usize, token: Token) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let prev = self.entries.insert(seq, LogEntry { weak, addr, token });
        debug_assert!(prev.is_none(), "sequence numbers are never reused");
        seq
    }

    pub(crate) fn get(&self, seq: u64) -> Option<&LogEntry<T>> {
        self.entries.get(&seq)
    }

    pub(crate) fn remove(&mut self, seq: u64) -> Option<LogEntry<T>> {
        self.entries.remove(&seq)
    }

    /// First entry at or after `cursor`, in insertion order.
    pub(crate) fn first_from(&self, cursor: u64) -> Option<(u64, &LogEntry<T>)> {
        self.entries.range(cursor..).next().map(|(&seq, e)| (seq, e))
    }

    /// Raw entry count, stale entries included.
    pub(crate) fn raw_len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn take_entries(&mut self) -> BTreeMap<u64, LogEntry<T>> {
        core::mem::take(&mut self.entries)
    }
}
