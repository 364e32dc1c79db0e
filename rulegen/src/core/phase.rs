//! Explicit state machine for the generate/validate loop.
//!
//! The orchestrator drives these states directly in a loop; there is no
//! recursion or callback control flow. Terminal states are `Succeeded` and
//! `ExhaustedFailed`.

/// Loop state for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// About to build a prompt and request a candidate.
    Generating,
    /// Candidate produced; awaiting the syntax verdict.
    SyntaxChecking,
    /// Syntax passed; awaiting the context verdict.
    ContextChecking,
    /// All enabled validations passed.
    Succeeded,
    /// Attempt budget exhausted without validator approval.
    ExhaustedFailed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::ExhaustedFailed)
    }

    /// Transition after a verdict, given whether attempts remain and whether
    /// context validation still has to run.
    pub fn after_verdict(self, passed: bool, attempts_remain: bool, context_pending: bool) -> Phase {
        match (self, passed) {
            (Phase::SyntaxChecking, true) if context_pending => Phase::ContextChecking,
            (Phase::SyntaxChecking, true) | (Phase::ContextChecking, true) => Phase::Succeeded,
            (Phase::SyntaxChecking | Phase::ContextChecking, false) => {
                if attempts_remain {
                    Phase::Generating
                } else {
                    Phase::ExhaustedFailed
                }
            }
            (phase, _) => phase,
        }
    }
}
