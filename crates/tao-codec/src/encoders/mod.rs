//! 编码器实现模块.

pub mod wmv2;
