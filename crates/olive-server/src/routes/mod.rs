//! HTTP handlers.

pub mod apps;
pub mod fs;
pub mod proxy;
