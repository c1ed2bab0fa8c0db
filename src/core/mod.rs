//! Core types: configuration, errors, time.

pub mod config;
pub mod error;
pub mod time;
