//! DocPort: projects, versions and files with pluggable blob storage.

pub mod config;
pub mod entities;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod pagination;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
