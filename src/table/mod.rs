//! 流表模块 - 分片桶存储与查找/插入算法

pub mod entry;
pub mod flow_table;
pub mod segment;

pub use entry::CachedFlow;
pub use flow_table::FlowTable;
