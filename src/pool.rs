//! 条目池 - 有界条目配额管理
//!
//! 条目数量有硬上限：超出后非阻塞分配立即失败，绝不阻塞或
//! 无界增长。满度策略（见 `table::flow_table`）是把稳态占用
//! 压回上限之下的反馈机制。

use crate::error::FlowError;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

/// 有界条目池
pub struct EntryPool {
    max: usize,
    current: AtomicUsize,
    peak: AtomicUsize,
    allocation_count: AtomicU64,
    deallocation_count: AtomicU64,
}

/// 池统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub max: usize,
    pub current_used: usize,
    pub peak_used: usize,
    pub allocation_count: u64,
    pub deallocation_count: u64,
}

impl EntryPool {
    pub fn new(max: usize) -> Arc<Self> {
        Arc::new(EntryPool {
            max,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            allocation_count: AtomicU64::new(0),
            deallocation_count: AtomicU64::new(0),
        })
    }

    /// 非阻塞获取一个条目配额
    pub fn try_acquire(self: &Arc<Self>) -> Result<PoolPermit, FlowError> {
        let mut current = self.current.load(Ordering::Relaxed);
        loop {
            if current >= self.max {
                return Err(FlowError::ResourceExhausted {
                    max: self.max,
                    current,
                });
            }
            match self.current.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        self.peak.fetch_max(current + 1, Ordering::Relaxed);
        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        Ok(PoolPermit {
            pool: Arc::clone(self),
        })
    }

    /// 当前占用
    pub fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// 配置上限
    pub fn max(&self) -> usize {
        self.max
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            max: self.max,
            current_used: self.current.load(Ordering::Relaxed),
            peak_used: self.peak.load(Ordering::Relaxed),
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            deallocation_count: self.deallocation_count.load(Ordering::Relaxed),
        }
    }

    fn release(&self) {
        self.current.fetch_sub(1, Ordering::AcqRel);
        self.deallocation_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// 池配额凭据，随条目存活，条目销毁时自动归还
pub struct PoolPermit {
    pool: Arc<EntryPool>,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        self.pool.release();
    }
}
