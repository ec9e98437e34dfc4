//! HTTP 处理器模块

pub mod catalog;
pub mod health;
pub mod role;
pub mod selection;
pub mod template;
