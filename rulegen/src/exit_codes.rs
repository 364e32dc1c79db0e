//! Stable exit codes for the rulegen CLI.
//!
//! Completion always exits zero, whether or not validation passed; the
//! artifact was written either way.

/// Run completed and the artifact was written.
pub const OK: i32 = 0;
/// Invalid invocation or unrecoverable failure before an artifact existed.
pub const INVALID: i32 = 1;
