//! 按流路由缓存库
//!
//! 为同一网络流（协议 + 地址/端口元组）的后续报文缓存一次昂贵的
//! 路由表与链路层解析结果，使其跳过完整慢路径。
//!
//! ## 主要特性
//! - 分片桶数组 + 占用位图，条带锁或按工作线程私有分片
//! - 加盐 32 位哈希，抵御哈希洪泛攻击
//! - 按连接阶段区分的空闲超时与负载自适应收缩
//! - 后台清扫线程，两阶段摘链/释放，不阻塞并发流量
//! - 定向（按路由）与全量同步冲刷
//!
//! ## 快速开始
//!
//! ```no_run
//! use flowcache::*;
//! use std::sync::Arc;
//!
//! # fn resolver() -> Arc<dyn FlowResolver> { unimplemented!() }
//! let control = Arc::new(SweepControl::new());
//! let table = Arc::new(FlowTable::new(
//!     FlowTableConfig::default(),
//!     resolver(),
//!     Arc::new(SystemClock::new()),
//!     control.clone(),
//! ).expect("配置无效"));
//!
//! let _sweeper = Sweeper::spawn(vec![table.clone()], control);
//!
//! let key = FlowKey::v4(Protocol::Tcp,
//!     "10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap(),
//!     49152, 80);
//! if let Some(flow) = table.lookup(&key, 0, FlowFlags::SYN) {
//!     println!("cached hash={:#x}", flow.hash);
//! }
//! ```

#![warn(clippy::all)]

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {};
}

// 核心模块导出
pub mod config;
pub mod error;
pub mod hash;
pub mod pool;
pub mod stats;
pub mod sweeper;
pub mod table;
pub mod types;

// 公共接口导出
pub use crate::{
    config::{FlowTableConfig, TableMode, FIN_WAIT_IDLE, SYN_IDLE, TCP_IDLE, UDP_IDLE},
    error::FlowError,
    hash::{jenkins_hash32, FlowHasher},
    pool::{EntryPool, PoolPermit, PoolStats},
    stats::{FlowStats, FlowStatsSnapshot},
    sweeper::{FlushCoordinator, SweepControl, Sweeper, FULL_SWEEP_INTERVAL, SWEEP_INTERVAL},
    table::{CachedFlow, FlowTable},
    types::{
        Clock, FlowFlags, FlowKey, FlowResolver, Interface, KeyWords, LinkLayer, ManualClock,
        Protocol, Route, SystemClock,
    },
};
