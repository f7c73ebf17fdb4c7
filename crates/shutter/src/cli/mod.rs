//! Command implementations.

pub mod cache;
pub mod config;
pub mod index;
pub mod overrides;
