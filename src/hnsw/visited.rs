//! Visited-set tracking for graph traversal
//!
//! Every beam search needs a "have I expanded this slot" set. A fresh
//! allocation per query would dominate small searches, and zeroing a bitmap
//! is O(n); instead each thread keeps a small pool of epoch arrays:
//! marking is one store, membership is one load+compare, and clearing is an
//! epoch increment.

use std::cell::RefCell;

const POOL_LIMIT: usize = 4;
const MIN_CAPACITY: usize = 1024;

thread_local! {
    static POOL: RefCell<Vec<EpochSet>> = RefCell::new(Vec::with_capacity(POOL_LIMIT));
}

struct EpochSet {
    epochs: Vec<u32>,
    current: u32,
}

impl EpochSet {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            epochs: vec![0; capacity.max(MIN_CAPACITY)],
            current: 1,
        }
    }

    #[inline(always)]
    fn contains(&self, slot: usize) -> bool {
        slot < self.epochs.len() && self.epochs[slot] == self.current
    }

    #[inline(always)]
    fn insert(&mut self, slot: usize) {
        if slot >= self.epochs.len() {
            let target = (slot + 1)
                .checked_next_power_of_two()
                .unwrap_or(slot + 1)
                .max(MIN_CAPACITY);
            self.epochs.resize(target, 0);
        }
        self.epochs[slot] = self.current;
    }

    #[inline(always)]
    fn reset(&mut self) {
        self.current = self.current.wrapping_add(1);
        if self.current == 0 {
            // Epoch counter wrapped: fall back to the O(n) clear once every
            // 2^32 resets.
            self.epochs.fill(0);
            self.current = 1;
        }
    }
}

/// RAII handle over a pooled visited set; returns the set to the thread's
/// pool on drop.
pub(crate) struct VisitedGuard {
    set: Option<EpochSet>,
}

impl VisitedGuard {
    pub fn new(capacity: usize) -> Self {
        let mut set = POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            match pool.iter().position(|s| s.epochs.len() >= capacity) {
                Some(idx) => pool.swap_remove(idx),
                None => EpochSet::with_capacity(capacity),
            }
        });
        set.reset();
        Self { set: Some(set) }
    }

    #[inline(always)]
    pub fn contains(&self, slot: usize) -> bool {
        self.set.as_ref().expect("visited set taken").contains(slot)
    }

    #[inline(always)]
    pub fn insert(&mut self, slot: usize) {
        self.set.as_mut().expect("visited set taken").insert(slot);
    }
}

impl Drop for VisitedGuard {
    fn drop(&mut self) {
        if let Some(set) = self.set.take() {
            POOL.with(|pool| {
                let mut pool = pool.borrow_mut();
                if pool.len() < POOL_LIMIT {
                    pool.push(set);
                }
            });
        }
    }
}
