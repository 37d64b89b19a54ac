//! 流表统计 - 原子累积计数与快照导出

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// 流表累积统计
#[derive(Debug, Default)]
pub struct FlowStats {
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    collisions: AtomicU64,
    frees: AtomicU64,
    free_checks: AtomicU64,
    max_depth: AtomicU32,
    full: AtomicBool,
}

/// 统计快照，导出给调用方的只读视图
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowStatsSnapshot {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub collisions: u64,
    pub frees: u64,
    pub free_checks: u64,
    pub max_depth: u32,
    pub full: bool,
}

impl FlowStats {
    pub fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_collision(&self) {
        self.collisions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frees(&self, count: u64) {
        self.frees.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_free_check(&self) {
        self.free_checks.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录观测到的链深度，保留历史最大值
    pub fn observe_depth(&self, depth: u32) {
        self.max_depth.fetch_max(depth, Ordering::Relaxed);
    }

    pub fn set_full(&self, full: bool) {
        self.full.store(full, Ordering::Relaxed);
    }

    pub fn is_full(&self) -> bool {
        self.full.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> FlowStatsSnapshot {
        FlowStatsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
            free_checks: self.free_checks.load(Ordering::Relaxed),
            max_depth: self.max_depth.load(Ordering::Relaxed),
            full: self.full.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.lookups.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.collisions.store(0, Ordering::Relaxed);
        self.frees.store(0, Ordering::Relaxed);
        self.free_checks.store(0, Ordering::Relaxed);
        self.max_depth.store(0, Ordering::Relaxed);
    }

    /// 导出 Prometheus 文本格式指标
    pub fn export_prometheus(&self, table: &str) -> String {
        let snap = self.snapshot();
        let mut output = String::new();

        let counters = [
            ("flowcache_lookups_total", "查找总次数", snap.lookups),
            ("flowcache_hits_total", "命中总次数", snap.hits),
            ("flowcache_misses_total", "未命中总次数", snap.misses),
            ("flowcache_collisions_total", "桶冲突总次数", snap.collisions),
            ("flowcache_frees_total", "条目释放总数", snap.frees),
            ("flowcache_free_checks_total", "清扫检查的桶数", snap.free_checks),
        ];
        for (name, help, value) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name}{{table=\"{table}\"}} {value}\n"
            ));
        }
        output.push_str(&format!(
            "# HELP flowcache_max_chain_depth 观测到的最大链深度\n\
             # TYPE flowcache_max_chain_depth gauge\n\
             flowcache_max_chain_depth{{table=\"{table}\"}} {}\n",
            snap.max_depth
        ));
        output.push_str(&format!(
            "# HELP flowcache_full 表是否处于满状态\n\
             # TYPE flowcache_full gauge\n\
             flowcache_full{{table=\"{table}\"}} {}\n",
            snap.full as u8
        ));
        output
    }
}
