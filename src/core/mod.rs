//! Core infrastructure: configuration, release context, errors

pub mod config;
pub mod context;
pub mod error;
