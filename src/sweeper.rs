//! 后台清扫线程与冲刷协调
//!
//! 清扫线程周期性地对注册的每张流表做一次满度评估加过期回收，
//! 周期在宽松与压力两档之间切换。冲刷方通过条件变量与周期计数
//! 和清扫线程会合，等到一个完整周期结束即可确认自己的请求之后
//! 的条目已被检查过。

use crate::table::FlowTable;
use parking_lot::{Condvar, Mutex};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// 宽松档清扫间隔
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(20);
/// 压力档清扫间隔，表满时启用
pub const FULL_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// 清扫线程与外界的会合点
///
/// 周期计数受互斥锁保护，两个条件变量分别用于"周期结束"
/// 广播与提前唤醒清扫线程。
pub struct SweepControl {
    cycles: Mutex<u64>,
    cycle_done: Condvar,
    wakeup: Condvar,
    interval_ms: AtomicU64,
    shutdown: AtomicBool,
}

impl Default for SweepControl {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepControl {
    pub fn new() -> Self {
        SweepControl {
            cycles: Mutex::new(0),
            cycle_done: Condvar::new(),
            wakeup: Condvar::new(),
            interval_ms: AtomicU64::new(SWEEP_INTERVAL.as_millis() as u64),
            shutdown: AtomicBool::new(false),
        }
    }

    /// 调整清扫间隔，下一次休眠生效
    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    /// 提前唤醒正在休眠的清扫线程
    pub fn wake(&self) {
        let _guard = self.cycles.lock();
        self.wakeup.notify_one();
    }

    /// 请求停机并唤醒所有等待方
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _guard = self.cycles.lock();
        self.wakeup.notify_all();
        self.cycle_done.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// 清扫线程专用：记一个周期结束，广播后按当前间隔休眠
    ///
    /// 计数递增、广播与休眠在同一把锁内完成，等待方不会在
    /// 计数与广播之间漏掉信号。
    pub(crate) fn finish_cycle_and_sleep(&self) {
        let mut cycles = self.cycles.lock();
        *cycles += 1;
        self.cycle_done.notify_all();
        if self.is_shutdown() {
            return;
        }
        let interval = self.interval();
        self.wakeup.wait_for(&mut cycles, interval);
    }

    /// 阻塞到下一个完整周期结束
    ///
    /// 当前周期可能已开始于调用之前，所以要跨过两次计数才能
    /// 保证确实有一轮完整扫描晚于本调用启动。每轮等待前都唤醒
    /// 清扫线程，休眠中的线程立即开始下一轮而不是睡满整个间隔。
    /// 停机时立即返回。
    pub fn wait_next_cycle(&self) {
        let mut cycles = self.cycles.lock();
        let target = *cycles + 2;
        while *cycles < target && !self.is_shutdown() {
            self.wakeup.notify_one();
            self.cycle_done.wait(&mut cycles);
        }
    }

    /// 已完成的清扫周期数
    pub fn cycles(&self) -> u64 {
        *self.cycles.lock()
    }
}

/// 后台清扫线程句柄，丢弃时停机并等待线程退出
pub struct Sweeper {
    control: Arc<SweepControl>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Sweeper {
    /// 启动清扫线程，接管给定各表的过期回收
    pub fn spawn(tables: Vec<Arc<FlowTable>>, control: Arc<SweepControl>) -> Self {
        let thread_control = Arc::clone(&control);
        let handle = thread::Builder::new()
            .name("flowcleaner".into())
            .spawn(move || {
                crate::log_info!("清扫线程启动, 管理 {} 张表", tables.len());
                while !thread_control.is_shutdown() {
                    for table in &tables {
                        table.flow_full();
                        table.free_stale(None);
                    }
                    thread_control.finish_cycle_and_sleep();
                }
                crate::log_info!("清扫线程退出");
            })
            .ok();
        if handle.is_none() {
            crate::log_error!("清扫线程启动失败");
        }
        Sweeper { control, handle }
    }

    pub fn control(&self) -> &Arc<SweepControl> {
        &self.control
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.control.request_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// 冲刷协调器
///
/// 定向冲刷同步执行；全量冲刷委托给清扫线程并等待其完成一个
/// 完整周期。
pub struct FlushCoordinator {
    control: Arc<SweepControl>,
    tables: Vec<Arc<FlowTable>>,
}

impl FlushCoordinator {
    pub fn new(tables: Vec<Arc<FlowTable>>, control: Arc<SweepControl>) -> Self {
        FlushCoordinator { control, tables }
    }

    /// 同步移除所有表中引用该路由的条目
    ///
    /// 路由删除路径调用，返回时引用已全部释放。
    pub fn flush_route(&self, route: &Arc<dyn crate::types::Route>) {
        for table in &self.tables {
            table.flush_route(route);
        }
    }

    /// 触发一轮全量清扫并等待其完成
    ///
    /// 唤醒逻辑在 `wait_next_cycle` 内完成。清扫线程不在时退化
    /// 为调用方就地扫描。
    pub fn flush_all(&self) {
        if self.control.is_shutdown() {
            for table in &self.tables {
                table.free_stale(None);
            }
            return;
        }
        self.control.wait_next_cycle();
    }
}
