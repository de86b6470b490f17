//! Reclamation subscriptions and their cancellation tokens.
//!
//! Every inserted element registers one subscription carrying its weak
//! handle and the sequence number of its log entry. A `Token` is the
//! opaque, content-free key minted per registration; its only use is
//! cancellation. Generational slotmap keys make an already-consumed token
//! inert, so cancellation is idempotent by construction and a token can
//! never alias a registration created later.

use slotmap::SlotMap;
use std::rc::Weak;

slotmap::new_key_type! {
    /// Cancellation key for one pending reclamation subscription.
    pub(crate) struct Token;
}

struct Registration<T> {
    weak: Weak<T>,
    seq: u64,
    addr: usize,
}

pub(crate) struct ReclaimRegistry<T> {
    subs: SlotMap<Token, Registration<T>>,
}

impl<T> ReclaimRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            subs: SlotMap::with_key(),
        }
    }

    pub(crate) fn register(&mut self, weak: Weak<T>, seq: u64, addr: usize) -> Token {
        self.subs.insert(Registration { weak, seq, addr })
    }

    /// Cancel a pending subscription. No-op for tokens already consumed by
    /// `sweep` or already cancelled.
    pub(crate) fn cancel(&mut self, token: Token) -> bool {
        self.subs.remove(token).is_some()
    }

    /// Visit every subscription whose handle no longer resolves, call
    /// `unlink(seq, addr)` for it, and consume it. Returns the number of
    /// subscriptions consumed.
    pub(crate) fn sweep(&mut self, mut unlink: impl FnMut(u64, usize)) -> usize {
        let before = self.subs.len();
        self.subs.retain(|_token, reg| {
            if reg.weak.strong_count() == 0 {
                unlink(reg.seq, reg.addr);
                false
            } else {
                true
            }
        });
        before - self.subs.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.subs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    /// Invariant: cancelling is idempotent and removes exactly the named
    /// registration.
    #[test]
    fn cancel_is_idempotent() {
        let a = Rc::new(1u32);
        let mut reg = ReclaimRegistry::new();
        let t = reg.register(Rc::downgrade(&a), 0, Rc::as_ptr(&a) as usize);
        assert_eq!(reg.len(), 1);
        assert!(reg.cancel(t));
        assert!(!reg.cancel(t));
        assert_eq!(reg.len(), 0);
    }

    /// Invariant: tokens are unique per registration; a token cancelled and
    /// a fresh registration for the same element do not alias.
    #[test]
    fn fresh_registration_mints_fresh_token() {
        let a = Rc::new(1u32);
        let addr = Rc::as_ptr(&a) as usize;
        let mut reg = ReclaimRegistry::new();
        let t1 = reg.register(Rc::downgrade(&a), 0, addr);
        assert!(reg.cancel(t1));
        let t2 = reg.register(Rc::downgrade(&a), 1, addr);
        assert_ne!(t1, t2);
        assert!(!reg.cancel(t1), "consumed token must stay inert");
        assert!(reg.cancel(t2));
    }

    /// Invariant: `sweep` consumes exactly the subscriptions whose handle
    /// no longer resolves and reports each to the unlink callback.
    #[test]
    fn sweep_selects_only_dead_handles() {
        let a = Rc::new(1u32);
        let b = Rc::new(2u32);
        let mut reg = ReclaimRegistry::new();
        reg.register(Rc::downgrade(&a), 0, Rc::as_ptr(&a) as usize);
        reg.register(Rc::downgrade(&b), 1, Rc::as_ptr(&b) as usize);

        let mut unlinked = Vec::new();
        assert_eq!(reg.sweep(|seq, _addr| unlinked.push(seq)), 0);
        assert!(unlinked.is_empty());

        drop(b);
        assert_eq!(reg.sweep(|seq, _addr| unlinked.push(seq)), 1);
        assert_eq!(unlinked, vec![1]);
        assert_eq!(reg.len(), 1);

        // Repeat sweep is a no-op until something else dies.
        assert_eq!(reg.sweep(|seq, _addr| unlinked.push(seq)), 0);
        drop(a);
        assert_eq!(reg.sweep(|seq, _addr| unlinked.push(seq)), 1);
        assert_eq!(unlinked, vec![1, 0]);
        assert_eq!(reg.len(), 0);
    }
}
