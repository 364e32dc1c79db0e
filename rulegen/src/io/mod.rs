//! Side-effecting operations: environment, filesystem, subprocesses, HTTP.

pub mod artifact;
pub mod bridge;
pub mod controller;
pub mod corpus;
pub mod deploy;
pub mod llm;
pub mod process;
pub mod prompt;
pub mod settings;
