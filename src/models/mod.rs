//! 数据模型模块

pub mod catalog;
pub mod role;

pub use catalog::{Module, Operation, Page};
pub use role::*;
