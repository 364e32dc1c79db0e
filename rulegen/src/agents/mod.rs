//! LLM-backed agents: rule generation and the two validators.

pub mod context;
pub mod generator;
pub mod syntax;
