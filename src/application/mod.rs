//! Application services: report creation, archive rebuild, topics, retention.

pub mod archive;
pub mod bundle;
pub mod daily;
pub mod error;
pub mod reports;
pub mod retention;
pub mod storage;
pub mod topics;
