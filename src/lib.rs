//! Vital Triage - 生命体征模糊诊断
//!
//! 六项生命体征的模糊隶属度计算与按身份分支的规则诊断

pub mod config;
pub mod health;
pub mod server;

pub use anyhow::Result;
