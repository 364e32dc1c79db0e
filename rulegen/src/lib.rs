//! Natural-language to openHAB Rules-DSL generation with validation.
//!
//! This crate implements a bounded generate → validate loop: a hosted LLM
//! proposes a candidate rule, a syntax validator and an optional
//! context-aware validator (backed by a live controller snapshot) judge it,
//! and validator feedback accumulates into the next attempt's prompt. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (ranking, rule parsing,
//!   verdicts, loop state). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (environment, filesystem, HTTP,
//!   subprocesses). Isolated behind traits to enable scripting in tests.
//!
//! [`agents`] and [`generate`] coordinate core logic with I/O to implement
//! the CLI.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod generate;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
