//! Tracing initialization
//!
//! Log verbosity comes from `RUST_LOG`; output is either human-readable text
//! or one JSON object per line.

mod init_basic;

pub use init_basic::{init_telemetry, LogFormat};
