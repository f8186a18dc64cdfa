//! # Qaku Cache Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fake_codex.rs   # In-process Codex REST stand-in
//!     ├── scenarios.rs    # Pipeline against the real Codex client
//!     └── node.rs         # Full cache node: bus, exporter, shutdown
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qaku-cache-tests
//! cargo test -p qaku-cache-tests integration::scenarios::
//! ```

#![allow(dead_code)]

pub mod integration;
