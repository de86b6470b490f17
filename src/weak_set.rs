//! WeakSet: public API composing the index, log, and registry.

use crate::identity_index::IdentityIndex;
use crate::insertion_log::InsertionLog;
use crate::reclaim::ReclaimRegistry;
use core::cell::RefCell;
use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

fn elem_addr<T>(value: &Rc<T>) -> usize {
    Rc::as_ptr(value) as usize
}

struct Inner<T, S> {
    index: IdentityIndex<S>,
    log: InsertionLog<T>,
    reclaim: ReclaimRegistry<T>,
}

/// An insertion-ordered set that holds its elements weakly.
///
/// Elements are `Rc<T>` allocations compared by identity (`Rc::ptr_eq`);
/// the set itself holds only `Weak<T>` handles. An element is a member
/// while a handle for it is registered *and* some strong reference outside
/// the set still owns the allocation. Once the last external `Rc` drops,
/// the element vanishes from every observation the set offers; its
/// internal bookkeeping is released by the first of removal, `clear`,
/// traversal pruning, or [`sweep`](WeakSet::sweep) to reach it.
///
/// ```
/// use rc_weakset::WeakSet;
/// use std::rc::Rc;
///
/// let set = WeakSet::new();
/// let a = Rc::new("a");
/// let b = Rc::new("b");
/// set.insert(&a);
/// set.insert(&b);
/// assert_eq!(set.len(), 2);
///
/// drop(b); // last strong reference gone
/// assert_eq!(set.len(), 1);
/// assert!(set.iter().all(|v| Rc::ptr_eq(&v, &a)));
/// ```
pub struct WeakSet<T, S = RandomState> {
    inner: RefCell<Inner<T, S>>, // single-threaded interior mutability
}

impl<T, S: BuildHasher> Inner<T, S> {
    /// Sequence number of the live entry for `value`, if registered.
    fn find_live(&self, value: &Rc<T>) -> Option<u64> {
        let log = &self.log;
        self.index.find(elem_addr(value), |seq| {
            log.get(seq)
                .and_then(|e| e.weak.upgrade())
                .map(|live| Rc::ptr_eq(&live, value))
                .unwrap_or(false)
        })
    }

    fn insert(&mut self, value: &Rc<T>) -> bool {
        if self.find_live(value).is_some() {
            return false;
        }
        // Always a fresh handle, token, and sequence number, even when a
        // stale entry for a prior incarnation is still unpruned.
        let addr = elem_addr(value);
        let seq = self.log.next_seq();
        let token = self.reclaim.register(Rc::downgrade(value), seq, addr);
        let pushed = self.log.push(Rc::downgrade(value), addr, token);
        debug_assert_eq!(pushed, seq);
        self.index.insert(addr, seq);
        debug_assert_eq!(self.reclaim.len(), self.log.raw_len());
        true
    }

    /// Destroy one entry: log, index slot, and pending subscription. The
    /// losing cleanup paths find nothing and return `false`.
    fn unlink(&mut self, seq: u64) -> bool {
        match self.log.remove(seq) {
            Some(entry) => {
                let removed = self.index.remove(entry.addr, seq);
                debug_assert!(removed, "index slot tracks its log entry");
                self.reclaim.cancel(entry.token);
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, value: &Rc<T>) -> bool {
        match self.find_live(value) {
            Some(seq) => self.unlink(seq),
            None => false,
        }
    }

    /// One traversal step: resolve the first entry at or after `cursor`,
    /// permanently unlinking every stale entry passed over.
    fn next_live(&mut self, mut cursor: u64) -> Option<(u64, Rc<T>)> {
        loop {
            let (seq, resolved) = {
                let (seq, entry) = self.log.first_from(cursor)?;
                (seq, entry.weak.upgrade())
            };
            match resolved {
                Some(value) => return Some((seq, value)),
                None => {
                    self.unlink(seq);
                    cursor = seq + 1;
                }
            }
        }
    }

    fn clear(&mut self) {
        for (_seq, entry) in self.log.take_entries() {
            self.reclaim.cancel(entry.token);
        }
        self.index.clear();
        debug_assert_eq!(
            self.reclaim.len(),
            0,
            "every registration belongs to a log entry"
        );
    }

    fn sweep(&mut self) -> usize {
        let Inner {
            index,
            log,
            reclaim,
        } = self;
        reclaim.sweep(|seq, addr| {
            let entry = log.remove(seq);
            debug_assert!(entry.is_some(), "a subscription names a live log entry");
            if entry.is_some() {
                index.remove(addr, seq);
            }
        })
    }
}

impl<T> WeakSet<T> {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<T> Default for WeakSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S: BuildHasher> WeakSet<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            inner: RefCell::new(Inner {
                index: IdentityIndex::with_hasher(hasher),
                log: InsertionLog::new(),
                reclaim: ReclaimRegistry::new(),
            }),
        }
    }

    /// Whether `value` is a member. O(1) average; identity comparison only.
    pub fn contains(&self, value: &Rc<T>) -> bool {
        self.inner.borrow().find_live(value).is_some()
    }

    /// Register `value` as a member. Returns `false` when already present
    /// (set semantics: re-inserting is a no-op). The set holds `value`
    /// only weakly; membership lapses with the last external strong
    /// reference.
    pub fn insert(&self, value: &Rc<T>) -> bool {
        self.inner.borrow_mut().insert(value)
    }

    /// Remove `value`. Returns `false` when not a member; that is not an
    /// error. Removal also cancels the entry's pending reclamation
    /// subscription, so a later [`sweep`](WeakSet::sweep) has nothing left
    /// to do for it.
    pub fn remove(&self, value: &Rc<T>) -> bool {
        self.inner.borrow_mut().remove(value)
    }

    /// Remove every entry, live or stale.
    pub fn clear(&self) {
        self.inner.borrow_mut().clear()
    }

    /// Number of live members.
    ///
    /// Never cached: the raw log may overcount not-yet-pruned stale
    /// entries, so this is a full pruning traversal, O(n) in the raw log
    /// length.
    pub fn len(&self) -> usize {
        let mut inner = self.inner.borrow_mut();
        let mut n = 0;
        let mut cursor = 0;
        while let Some((seq, _)) = inner.next_live(cursor) {
            n += 1;
            cursor = seq + 1;
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow_mut().next_live(0).is_none()
    }

    /// Release bookkeeping for every element that has been reclaimed, and
    /// return how many entries were released.
    ///
    /// Purely memory hygiene for workloads that mutate a lot but iterate
    /// rarely: every guarantee of this type holds whether or not `sweep`
    /// is ever called, because traversals prune stale entries themselves.
    pub fn sweep(&self) -> usize {
        self.inner.borrow_mut().sweep()
    }

    /// Traverse live members in insertion order.
    ///
    /// Each call starts a fresh traversal; traversals are independent and
    /// any number may coexist. The internal borrow is scoped to a single
    /// step, so the set may be mutated freely between steps, including
    /// removing the element just yielded. Elements inserted mid-traversal
    /// are appended after every cursor and become visible to in-flight
    /// traversals.
    pub fn iter(&self) -> Iter<'_, T, S> {
        Iter {
            set: self,
            cursor: 0,
        }
    }

    /// Alias of [`iter`](WeakSet::iter), mirroring the usual set-like
    /// surface where keys and values coincide.
    pub fn keys(&self) -> Iter<'_, T, S> {
        self.iter()
    }

    /// Alias of [`iter`](WeakSet::iter).
    pub fn values(&self) -> Iter<'_, T, S> {
        self.iter()
    }

    /// Traverse `(v, v)` pairs for exactly the elements [`iter`] yields,
    /// in the same order.
    ///
    /// [`iter`]: WeakSet::iter
    pub fn entries(&self) -> Entries<'_, T, S> {
        Entries { iter: self.iter() }
    }

    /// Invoke `f` once per live member, insertion order. The callback may
    /// mutate the set.
    pub fn for_each(&self, mut f: impl FnMut(&Rc<T>)) {
        for value in self.iter() {
            f(&value);
        }
    }
}

/// Lazy, restartable traversal over live members in insertion order.
pub struct Iter<'a, T, S = RandomState> {
    set: &'a WeakSet<T, S>,
    cursor: u64,
}

impl<'a, T, S: BuildHasher> Iterator for Iter<'a, T, S> {
    type Item = Rc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let (seq, value) = self.set.inner.borrow_mut().next_live(self.cursor)?;
        self.cursor = seq + 1;
        Some(value)
    }
}

/// Traversal yielding `(v, v)` pairs; see [`WeakSet::entries`].
pub struct Entries<'a, T, S = RandomState> {
    iter: Iter<'a, T, S>,
}

impl<'a, T, S: BuildHasher> Iterator for Entries<'a, T, S> {
    type Item = (Rc<T>, Rc<T>);

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|v| (v.clone(), v))
    }
}

impl<'a, T, S: BuildHasher> IntoIterator for &'a WeakSet<T, S> {
    type Item = Rc<T>;
    type IntoIter = Iter<'a, T, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> FromIterator<Rc<T>> for WeakSet<T> {
    fn from_iter<I: IntoIterator<Item = Rc<T>>>(iter: I) -> Self {
        let set = WeakSet::new();
        for value in iter {
            set.insert(&value);
        }
        set
    }
}

impl<T, S: BuildHasher> Extend<Rc<T>> for WeakSet<T, S> {
    fn extend<I: IntoIterator<Item = Rc<T>>>(&mut self, iter: I) {
        for value in iter {
            self.insert(&value);
        }
    }
}
