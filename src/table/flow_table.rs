//! 流表 - 分片存储、查找/插入算法与过期/满度策略

use crate::{
    config::{FlowTableConfig, TableMode, DEST_ONLY_IDLE, PRESSURE_IDLE},
    error::FlowError,
    hash::FlowHasher,
    pool::{EntryPool, PoolStats},
    stats::{FlowStats, FlowStatsSnapshot},
    sweeper::{SweepControl, FULL_SWEEP_INTERVAL, SWEEP_INTERVAL},
    table::{
        entry::{CachedFlow, FlowEntry},
        segment::Segment,
    },
    types::{Clock, FlowFlags, FlowKey, FlowResolver, KeyWords, LinkLayer, Protocol, Route},
};
use parking_lot::Mutex;
use std::{
    cell::Cell,
    sync::{
        atomic::{AtomicU32, AtomicUsize, Ordering},
        Arc,
    },
};

/// 线程注册计数，私有模式下为每个线程分配稳定槽位
static NEXT_THREAD_SLOT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THREAD_SLOT: Cell<Option<usize>> = const { Cell::new(None) };
}

/// 当前线程的全局槽位，首次使用时轮转分配
fn thread_slot() -> usize {
    THREAD_SLOT.with(|slot| match slot.get() {
        Some(s) => s,
        None => {
            let s = NEXT_THREAD_SLOT.fetch_add(1, Ordering::Relaxed);
            slot.set(Some(s));
            s
        }
    })
}

/// 四档空闲超时，按连接阶段区分，满度压力下整体收缩
struct IdleTimeouts {
    syn: AtomicU32,
    udp: AtomicU32,
    fin_wait: AtomicU32,
    tcp: AtomicU32,
}

impl IdleTimeouts {
    fn from_config(config: &FlowTableConfig) -> Self {
        IdleTimeouts {
            syn: AtomicU32::new(config.syn_idle),
            udp: AtomicU32::new(config.udp_idle),
            fin_wait: AtomicU32::new(config.fin_wait_idle),
            tcp: AtomicU32::new(config.tcp_idle),
        }
    }

    fn set_all(&self, secs: u32) {
        self.syn.store(secs, Ordering::Relaxed);
        self.udp.store(secs, Ordering::Relaxed);
        self.fin_wait.store(secs, Ordering::Relaxed);
        self.tcp.store(secs, Ordering::Relaxed);
    }
}

/// 一个分片：若干条带锁分段
struct Shard {
    stripes: Vec<Mutex<Segment>>,
}

/// 并发流表
///
/// 两种分片模式：
/// - `Shared`：单分片 + 条带锁数组（约 2 倍并行度、向上取 2 的幂），
///   条带由桶索引选定，同一桶的所有访问走同一把锁；
/// - `Private`：每工作线程一个完整分片（单条带），调用线程首次
///   访问时绑定到固定分片，锁基本无竞争。
pub struct FlowTable {
    config: FlowTableConfig,
    hasher: FlowHasher,
    shards: Vec<Shard>,
    /// 每分片条带数，2 的幂
    nstripes: usize,
    pool: Arc<EntryPool>,
    stats: FlowStats,
    idle: IdleTimeouts,
    resolver: Arc<dyn FlowResolver>,
    clock: Arc<dyn Clock>,
    control: Arc<SweepControl>,
}

impl FlowTable {
    /// 创建流表
    ///
    /// 解析器、时钟与清扫控制在构造时注入，之后所有查找共用。
    pub fn new(
        config: FlowTableConfig,
        resolver: Arc<dyn FlowResolver>,
        clock: Arc<dyn Clock>,
        control: Arc<SweepControl>,
    ) -> Result<Self, FlowError> {
        config.validate()?;

        let (nshards, nstripes) = match config.mode {
            TableMode::Shared => {
                let parallelism = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);
                // 条带数必须是 2 的幂且不超过桶数
                let mut stripes = (2 * parallelism).next_power_of_two();
                while stripes > config.size {
                    stripes >>= 1;
                }
                (1, stripes)
            }
            TableMode::Private { shards } => (shards, 1),
        };

        let buckets_per_stripe = config.size.div_ceil(nstripes);
        let shards = (0..nshards)
            .map(|_| Shard {
                stripes: (0..nstripes)
                    .map(|_| Mutex::new(Segment::new(buckets_per_stripe)))
                    .collect(),
            })
            .collect();

        Ok(FlowTable {
            hasher: FlowHasher::new(config.hash_all),
            shards,
            nstripes,
            pool: EntryPool::new(config.max_flows),
            stats: FlowStats::default(),
            idle: IdleTimeouts::from_config(&config),
            resolver,
            clock,
            control,
            config,
        })
    }

    /// 查找一条流，未命中时（若允许）走解析慢路径并插入
    ///
    /// `flags` 携带本次报文观测到的瞬态命中状态位（SYN/ACK/FIN/RST）
    /// 以及 `NO_AUTO`。返回 `None` 即缓存未命中，调用方自行走慢路径。
    pub fn lookup(&self, key: &FlowKey, fib: u32, flags: FlowFlags) -> Option<CachedFlow> {
        if !self.config.enabled {
            return None;
        }

        let mut flags = flags | key.proto().to_flags();
        if key.is_v6() {
            flags |= FlowFlags::IPV6;
        }
        // 全元组键控下观测到 RST/FIN 即标记强制过期
        if self.config.hash_all && flags.intersects(FlowFlags::RST | FlowFlags::FIN) {
            flags |= FlowFlags::STALE;
        }

        let (words, hash) = self.hasher.hash_key(key);

        // 端口全零说明不是需要保持状态的协议
        if self.config.hash_all && words.ports_word() == 0 {
            return None;
        }

        self.stats.record_lookup();

        let (stripe, slot) = self.locate(hash);
        {
            let mut seg = stripe.lock();
            let now = self.clock.uptime();
            let mut cur = &mut seg.buckets[slot];
            while let Some(entry) = cur {
                if entry.hash == hash
                    && entry.key == words
                    && entry.proto == key.proto()
                    && entry.fib == fib
                    && entry.route.is_up()
                    && entry.route.interface().is_some()
                    && entry.link.is_valid()
                {
                    self.stats.record_hit();
                    entry.last_access = now;
                    entry.flags.insert(flags.intersection(
                        FlowFlags::SYN
                            | FlowFlags::ACK
                            | FlowFlags::FIN
                            | FlowFlags::RST
                            | FlowFlags::STALE,
                    ));
                    return Some(CachedFlow {
                        hash,
                        route: Arc::clone(&entry.route),
                        link: Arc::clone(&entry.link),
                    });
                }
                cur = &mut entry.next;
            }
        }

        self.resolve_and_insert(key, fib, flags, words, hash)
    }

    /// 未命中慢路径：外部解析 + 插入
    fn resolve_and_insert(
        &self,
        key: &FlowKey,
        fib: u32,
        flags: FlowFlags,
        words: KeyWords,
        hash: u32,
    ) -> Option<CachedFlow> {
        if flags.contains(FlowFlags::NO_AUTO) || self.flow_full() {
            return None;
        }
        self.stats.record_miss();

        // 解析可能阻塞，必须发生在拿任何分段锁之前
        let route = self.resolver.resolve_route(key, fib)?;
        let iface = route.interface()?;
        if iface.is_loopback() || iface.is_point_to_point() {
            return None;
        }
        let link = self.resolver.resolve_link(&route, key)?;

        match self.insert_prepared(
            words,
            hash,
            key.proto(),
            fib,
            flags,
            Arc::clone(&route),
            Arc::clone(&link),
        ) {
            Ok(()) => {}
            // 竞争失败：别的查找已缓存该流，沿用自己的解析结果
            Err(FlowError::AlreadyExists { .. }) => {}
            Err(_) => return None,
        }
        Some(CachedFlow { hash, route, link })
    }

    /// 只查缓存，不触发慢路径解析
    ///
    /// 等价于携带 `NO_AUTO` 标志的查找，未命中以 `NotFound` 报告。
    pub fn lookup_cached(&self, key: &FlowKey, fib: u32) -> Result<CachedFlow, FlowError> {
        self.lookup(key, fib, FlowFlags::NO_AUTO)
            .ok_or(FlowError::NotFound)
    }

    /// 插入一条已完成外部解析的流
    pub fn insert_resolved(
        &self,
        key: &FlowKey,
        fib: u32,
        flags: FlowFlags,
        route: Arc<dyn Route>,
        link: Arc<dyn LinkLayer>,
    ) -> Result<(), FlowError> {
        let mut flags = flags | key.proto().to_flags();
        if key.is_v6() {
            flags |= FlowFlags::IPV6;
        }
        let (words, hash) = self.hasher.hash_key(key);
        self.insert_prepared(words, hash, key.proto(), fib, flags, route, link)
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_prepared(
        &self,
        words: KeyWords,
        hash: u32,
        proto: Protocol,
        fib: u32,
        flags: FlowFlags,
        route: Arc<dyn Route>,
        link: Arc<dyn LinkLayer>,
    ) -> Result<(), FlowError> {
        // 池配额与条目构造都在锁外完成；竞争失败时 entry 在
        // 分段锁释放之后才被丢弃（引用释放不在锁内）
        let permit = self.pool.try_acquire()?;
        let entry = Box::new(FlowEntry {
            hash,
            proto,
            flags: flags.intersection(FlowFlags::IPV6),
            fib,
            last_access: self.clock.uptime(),
            key: words,
            route,
            link,
            _permit: permit,
            next: None,
        });

        let (stripe, slot) = self.locate(hash);
        let mut seg = stripe.lock();

        if seg.buckets[slot].is_none() {
            seg.mask.set(slot);
            seg.buckets[slot] = Some(entry);
            return Ok(());
        }

        self.stats.record_collision();
        let now = self.clock.uptime();
        let mut depth: u32 = 0;
        let mut cur = &mut seg.buckets[slot];
        while let Some(existing) = cur {
            // 同哈希且未过期：键冲突或插入竞争败北
            if existing.hash == hash && !self.entry_stale(existing, now) {
                return Err(FlowError::AlreadyExists { hash });
            }
            depth += 1;
            cur = &mut existing.next;
        }
        self.stats.observe_depth(depth);
        *cur = Some(entry);
        Ok(())
    }

    /// 过期判定
    ///
    /// 哈希哨兵、失效的主机路由、接口缺失或链路 down、强制过期
    /// 标记，以及按连接阶段区分的空闲超时，任一命中即过期。
    fn entry_stale(&self, entry: &FlowEntry, now: u32) -> bool {
        if entry.hash == 0 {
            return true;
        }
        let Some(iface) = entry.route.interface() else {
            return true;
        };
        if entry.route.is_host_route() && !entry.route.is_up() {
            return true;
        }
        if !iface.is_link_up() {
            return true;
        }
        if entry.flags.contains(FlowFlags::STALE) {
            return true;
        }

        let idle = entry.idle_secs(now);
        let flags = entry.flags;
        let handshake = FlowFlags::SYN | FlowFlags::ACK | FlowFlags::FIN;

        if !flags.intersects(handshake) && idle > self.idle.udp.load(Ordering::Relaxed) {
            return true;
        }
        if flags.contains(FlowFlags::FIN) && idle > self.idle.fin_wait.load(Ordering::Relaxed) {
            return true;
        }
        if flags.contains(FlowFlags::SYN)
            && !flags.contains(FlowFlags::ACK)
            && idle > self.idle.syn.load(Ordering::Relaxed)
        {
            return true;
        }
        if flags.contains(FlowFlags::SYN | FlowFlags::ACK)
            && idle > self.idle.tcp.load(Ordering::Relaxed)
        {
            return true;
        }

        !entry.route.is_up()
    }

    /// 满度判定，双阈值去抖
    ///
    /// 占用超过 `max - max/32` 置满，降到 `max - max/8` 以下才清除。
    /// 置满时清扫间隔缩短 4 倍、目的-only 表的空闲超时收缩到数秒，
    /// 并提前唤醒清扫线程；清除时恢复宽松节奏。
    pub fn flow_full(&self) -> bool {
        let full = self.stats.is_full();
        let count = self.pool.current();
        let max = self.pool.max();

        if full && count < max - (max >> 3) {
            self.stats.set_full(false);
            self.control.set_interval(SWEEP_INTERVAL);
            if !self.config.hash_all {
                self.idle.set_all(DEST_ONLY_IDLE);
            }
            crate::log_info!("流表解除满状态 (占用 {}/{})", count, max);
        } else if !full && count > max - (max >> 5) {
            self.stats.set_full(true);
            self.control.set_interval(FULL_SWEEP_INTERVAL);
            if !self.config.hash_all {
                self.idle.set_all(PRESSURE_IDLE);
            }
            self.control.wake();
            crate::log_info!("流表进入满状态 (占用 {}/{})", count, max);
        }

        self.stats.is_full()
    }

    /// 清扫：摘除过期条目（`route` 为空）或指定路由的条目（定向冲刷）
    ///
    /// 两阶段：分段锁内扫位图、摘链、清位；解锁后才释放摘下
    /// 条目的路由/链路层引用并归还池配额。
    pub fn free_stale(&self, route: Option<&Arc<dyn Route>>) {
        for shard in &self.shards {
            for stripe in &shard.stripes {
                let mut freed: Vec<Box<FlowEntry>> = Vec::new();
                {
                    let mut seg = stripe.lock();
                    let now = self.clock.uptime();
                    let mut next = seg.mask.first_set_from(0);
                    while let Some(slot) = next {
                        if slot >= seg.buckets.len() {
                            crate::log_error!("位图扫描越界: {}", slot);
                            debug_assert!(slot < seg.buckets.len());
                            break;
                        }
                        self.stats.record_free_check();
                        seg.sweep_bucket(
                            slot,
                            |entry| match route {
                                // 只比较数据指针，胖指针的 vtable 部分不参与
                                Some(target) => {
                                    Arc::as_ptr(&entry.route) as *const ()
                                        == Arc::as_ptr(target) as *const ()
                                }
                                None => self.entry_stale(entry, now),
                            },
                            &mut freed,
                        );
                        next = seg.mask.first_set_from(slot + 1);
                    }
                }
                if !freed.is_empty() {
                    self.stats.record_frees(freed.len() as u64);
                }
                // 锁已释放，此处丢弃才真正释放引用与池配额
                drop(freed);
            }
        }
    }

    /// 定向冲刷：同步移除所有引用该路由的条目
    pub fn flush_route(&self, route: &Arc<dyn Route>) {
        self.free_stale(Some(route));
    }

    /// 统计快照
    pub fn stats(&self) -> FlowStatsSnapshot {
        self.stats.snapshot()
    }

    /// 条目池统计
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// 当前缓存条目数
    pub fn len(&self) -> usize {
        self.pool.current()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prometheus 文本格式指标
    pub fn export_prometheus(&self, table: &str) -> String {
        self.stats.export_prometheus(table)
    }

    /// 定位哈希对应的分段与段内桶号
    ///
    /// 桶索引用朴素取模（表尺寸无需是 2 的幂），条带由桶索引
    /// 选定，保证同一桶的查找、插入与清扫始终走同一把锁。
    fn locate(&self, hash: u32) -> (&Mutex<Segment>, usize) {
        let shard = &self.shards[self.shard_index()];
        let bucket = (hash as usize) % self.config.size;
        let stripe = bucket & (self.nstripes - 1);
        let slot = bucket / self.nstripes;
        (&shard.stripes[stripe], slot)
    }

    fn shard_index(&self) -> usize {
        match self.config.mode {
            TableMode::Shared => 0,
            TableMode::Private { shards } => thread_slot() % shards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ManualClock;
    use std::net::Ipv4Addr;
    use std::sync::atomic::AtomicBool;

    struct TestIface {
        link_up: AtomicBool,
        loopback: bool,
    }

    impl crate::types::Interface for TestIface {
        fn is_link_up(&self) -> bool {
            self.link_up.load(Ordering::Relaxed)
        }
        fn is_loopback(&self) -> bool {
            self.loopback
        }
        fn is_point_to_point(&self) -> bool {
            false
        }
    }

    struct TestRoute {
        up: AtomicBool,
        host: bool,
        iface: Arc<TestIface>,
    }

    impl crate::types::Route for TestRoute {
        fn is_up(&self) -> bool {
            self.up.load(Ordering::Relaxed)
        }
        fn is_host_route(&self) -> bool {
            self.host
        }
        fn interface(&self) -> Option<Arc<dyn crate::types::Interface>> {
            Some(self.iface.clone() as Arc<dyn crate::types::Interface>)
        }
    }

    struct TestLink {
        valid: AtomicBool,
    }

    impl crate::types::LinkLayer for TestLink {
        fn is_valid(&self) -> bool {
            self.valid.load(Ordering::Relaxed)
        }
    }

    struct TestResolver {
        route: Arc<TestRoute>,
        link: Arc<TestLink>,
    }

    impl crate::types::FlowResolver for TestResolver {
        fn resolve_route(&self, _key: &FlowKey, _fib: u32) -> Option<Arc<dyn Route>> {
            Some(self.route.clone() as Arc<dyn Route>)
        }
        fn resolve_link(
            &self,
            _route: &Arc<dyn Route>,
            _key: &FlowKey,
        ) -> Option<Arc<dyn LinkLayer>> {
            Some(self.link.clone() as Arc<dyn LinkLayer>)
        }
    }

    fn test_route() -> Arc<TestRoute> {
        Arc::new(TestRoute {
            up: AtomicBool::new(true),
            host: false,
            iface: Arc::new(TestIface {
                link_up: AtomicBool::new(true),
                loopback: false,
            }),
        })
    }

    fn test_table(config: FlowTableConfig) -> (Arc<FlowTable>, Arc<TestRoute>, Arc<ManualClock>) {
        let route = test_route();
        let link = Arc::new(TestLink {
            valid: AtomicBool::new(true),
        });
        let clock = Arc::new(ManualClock::new(1000));
        let resolver = Arc::new(TestResolver {
            route: route.clone(),
            link,
        });
        let table = FlowTable::new(
            config,
            resolver,
            clock.clone(),
            Arc::new(SweepControl::new()),
        )
        .expect("配置应有效");
        (Arc::new(table), route, clock)
    }

    fn tcp_key(dport: u16) -> FlowKey {
        FlowKey::v4(
            Protocol::Tcp,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            49152,
            dport,
        )
    }

    #[test]
    fn test_miss_then_hit() {
        let (table, _, _) = test_table(FlowTableConfig::default());
        let key = tcp_key(80);

        let first = table.lookup(&key, 0, FlowFlags::SYN).expect("应解析并插入");
        let second = table.lookup(&key, 0, FlowFlags::empty()).expect("应命中");
        assert_eq!(first.hash, second.hash);

        let snap = table.stats();
        assert_eq!(snap.lookups, 2);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_hit_refreshes_timestamp() {
        let (table, _, clock) = test_table(FlowTableConfig::default());
        let key = tcp_key(80);

        table.lookup(&key, 0, FlowFlags::SYN).unwrap();
        clock.advance(200);
        // 刷新后即使再过 200 秒也不足 SYN 超时
        table.lookup(&key, 0, FlowFlags::empty()).unwrap();
        clock.advance(200);
        table.free_stale(None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_no_auto_returns_miss() {
        let (table, _, _) = test_table(FlowTableConfig::default());
        assert!(table
            .lookup(&tcp_key(80), 0, FlowFlags::NO_AUTO)
            .is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_lookup_cached_reports_not_found() {
        let (table, _, _) = test_table(FlowTableConfig::default());
        let key = tcp_key(80);

        let err = table.lookup_cached(&key, 0).expect_err("空表应未命中");
        assert!(err.is_miss());
        assert_eq!(table.len(), 0, "只查缓存不插入");

        table.lookup(&key, 0, FlowFlags::SYN).unwrap();
        table.lookup_cached(&key, 0).expect("缓存后应命中");
    }

    #[test]
    fn test_disabled_table() {
        let config = FlowTableConfig {
            enabled: false,
            ..Default::default()
        };
        let (table, _, _) = test_table(config);
        assert!(table.lookup(&tcp_key(80), 0, FlowFlags::SYN).is_none());
        assert_eq!(table.stats().lookups, 0);
    }

    #[test]
    fn test_portless_key_rejected_when_hash_all() {
        let (table, _, _) = test_table(FlowTableConfig::default());
        let key = FlowKey::v4(
            Protocol::Other,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            0,
            0,
        );
        assert!(table.lookup(&key, 0, FlowFlags::empty()).is_none());
    }

    #[test]
    fn test_fib_mismatch_never_hits() {
        let (table, _, _) = test_table(FlowTableConfig::default());
        let key = tcp_key(80);

        table.lookup(&key, 0, FlowFlags::SYN).unwrap();
        // 不同 FIB 不命中缓存；插入因同哈希活跃条目败北，
        // 调用方沿用自己的解析结果
        table.lookup(&key, 7, FlowFlags::SYN).unwrap();

        let snap = table.stats();
        assert_eq!(snap.hits, 0);
        assert_eq!(snap.misses, 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_insert_detected() {
        let (table, route, _) = test_table(FlowTableConfig::default());
        let key = tcp_key(80);
        let link = Arc::new(TestLink {
            valid: AtomicBool::new(true),
        });

        table
            .insert_resolved(
                &key,
                0,
                FlowFlags::empty(),
                route.clone() as Arc<dyn Route>,
                link.clone() as Arc<dyn LinkLayer>,
            )
            .expect("首次插入应成功");

        let err = table
            .insert_resolved(
                &key,
                0,
                FlowFlags::empty(),
                route.clone() as Arc<dyn Route>,
                link as Arc<dyn LinkLayer>,
            )
            .expect_err("重复插入应失败");
        assert!(matches!(err, FlowError::AlreadyExists { .. }));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_link_down_entry_swept() {
        let (table, route, _) = test_table(FlowTableConfig::default());
        table.lookup(&tcp_key(80), 0, FlowFlags::SYN).unwrap();

        route.iface.link_up.store(false, Ordering::Relaxed);
        table.free_stale(None);

        assert_eq!(table.len(), 0);
        assert_eq!(table.stats().frees, 1);

        // 占用位已随空桶清除，再扫不检查任何桶
        let checks = table.stats().free_checks;
        table.free_stale(None);
        assert_eq!(table.stats().free_checks, checks);
    }

    #[test]
    fn test_rst_marks_entry_stale() {
        let (table, _, _) = test_table(FlowTableConfig::default());
        let key = tcp_key(80);

        table.lookup(&key, 0, FlowFlags::SYN).unwrap();
        // 命中时合并 RST 观测，条目被强制过期
        table.lookup(&key, 0, FlowFlags::RST).unwrap();
        table.free_stale(None);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_syn_idle_expiry() {
        let (table, _, clock) = test_table(FlowTableConfig::default());
        table.lookup(&tcp_key(80), 0, FlowFlags::SYN).unwrap();

        // 插入时不持久化握手位，无状态流走 UDP 档超时
        clock.advance(crate::config::UDP_IDLE + 1);
        table.free_stale(None);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_established_flow_survives_udp_idle() {
        let (table, _, clock) = test_table(FlowTableConfig::default());
        let key = tcp_key(80);

        table.lookup(&key, 0, FlowFlags::SYN).unwrap();
        // 命中合并 SYN+ACK，转入已建立档
        table.lookup(&key, 0, FlowFlags::SYN | FlowFlags::ACK).unwrap();

        clock.advance(crate::config::UDP_IDLE + 10);
        table.free_stale(None);
        assert_eq!(table.len(), 1);

        clock.advance(crate::config::TCP_IDLE + 1);
        table.free_stale(None);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_full_table_rejects_new_flows() {
        let config = FlowTableConfig {
            max_flows: 64,
            ..Default::default()
        };
        let (table, _, _) = test_table(config);

        // 填到满阈值之上: 64 - 64/32 = 62，即 63 条起算满
        for dport in 0..63u16 {
            table
                .lookup(&tcp_key(dport + 1), 0, FlowFlags::SYN)
                .expect("应插入成功");
        }
        assert!(table.flow_full());
        assert!(table.lookup(&tcp_key(9999), 0, FlowFlags::SYN).is_none());
        assert_eq!(table.len(), 63);
    }

    #[test]
    fn test_fullness_hysteresis_clears() {
        let config = FlowTableConfig {
            max_flows: 64,
            ..Default::default()
        };
        let (table, route, _) = test_table(config);

        for dport in 0..63u16 {
            table.lookup(&tcp_key(dport + 1), 0, FlowFlags::SYN).unwrap();
        }
        assert!(table.flow_full());

        // 定向冲刷清空占用，降到 max - max/8 = 56 之下后解除
        table.flush_route(&(route as Arc<dyn Route>));
        assert_eq!(table.len(), 0);
        assert!(!table.flow_full());
        assert!(table.lookup(&tcp_key(9999), 0, FlowFlags::SYN).is_some());
    }

    #[test]
    fn test_private_mode_basic() {
        let config = FlowTableConfig {
            mode: TableMode::Private { shards: 4 },
            ..Default::default()
        };
        let (table, _, _) = test_table(config);

        let key = tcp_key(80);
        table.lookup(&key, 0, FlowFlags::SYN).unwrap();
        // 同一线程固定落在同一分片，第二次必命中
        table.lookup(&key, 0, FlowFlags::empty()).unwrap();
        assert_eq!(table.stats().hits, 1);

        // 清扫覆盖所有分片
        table.free_stale(None);
        assert_eq!(table.len(), 1);
    }
}
