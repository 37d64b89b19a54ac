//! 哈希模块 - 加盐 32 位流哈希

pub mod flow_hash;
pub mod jenkins;

pub use flow_hash::FlowHasher;
pub use jenkins::jenkins_hash32;
