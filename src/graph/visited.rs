//! 图遍历时使用的已访问标记
//!
//! 每个线程缓存若干个按 epoch 标记的数组，清空时只需要递增 epoch，
//! 并发的搜索各自使用线程内的数组，互不影响。

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};

const POOL_SIZE: usize = 4;

thread_local! {
    static POOL: RefCell<Vec<EpochVisited>> = const { RefCell::new(Vec::new()) };
}

pub struct EpochVisited {
    epochs: Vec<u32>,
    epoch: u32,
}

impl EpochVisited {
    fn with_capacity(capacity: usize) -> Self {
        Self { epochs: vec![0; capacity.max(64)], epoch: 1 }
    }

    #[inline(always)]
    pub fn is_visited(&self, id: usize) -> bool {
        self.epochs.get(id) == Some(&self.epoch)
    }

    #[inline(always)]
    pub fn visit(&mut self, id: usize) {
        if id >= self.epochs.len() {
            self.epochs.resize((id + 1).next_power_of_two(), 0);
        }
        self.epochs[id] = self.epoch;
    }

    fn clear(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            // epoch 溢出后重置
            self.epochs.fill(0);
            self.epoch = 1;
        }
    }
}

/// 从线程池中借出的已访问标记，drop 时归还
pub struct VisitedGuard(Option<EpochVisited>);

impl VisitedGuard {
    pub fn new(capacity: usize) -> Self {
        let mut set = POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            match pool.iter().position(|s| s.epochs.len() >= capacity) {
                Some(i) => pool.swap_remove(i),
                None => EpochVisited::with_capacity(capacity),
            }
        });
        set.clear();
        Self(Some(set))
    }
}

impl Deref for VisitedGuard {
    type Target = EpochVisited;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref().expect("visited set taken")
    }
}

impl DerefMut for VisitedGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut().expect("visited set taken")
    }
}

impl Drop for VisitedGuard {
    fn drop(&mut self) {
        if let Some(set) = self.0.take() {
            POOL.with(|pool| {
                let mut pool = pool.borrow_mut();
                if pool.len() < POOL_SIZE {
                    pool.push(set);
                }
            });
        }
    }
}
