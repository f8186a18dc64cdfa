//! # Integration Tests
//!
//! The cache node against an in-process Codex stand-in.

pub mod fake_codex;
pub mod gateway;
pub mod scenarios;
