//! HTML views rendered from compile-time templates.

pub mod views;
