//! Gazette: render templated research reports, store them, and keep an archive index.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
