//! Core functionality for mem-pool
//!
//! This module contains the fundamental building blocks shared by the pool:
//! - Configuration structures
//! - Common sizing constants

pub mod config;
pub mod types;

pub use config::PoolConfig;
pub use types::*;
