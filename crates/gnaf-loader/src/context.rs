//! Per-command logging context
//!
//! Each command invocation builds one [`LogContext`] and hands a clone to
//! every collaborator it constructs. Collaborators emit their events as
//! children of the command's span, so every line a command produces carries
//! the command name.

use tracing::{info_span, Span};

#[derive(Debug, Clone)]
pub struct LogContext {
    span: Span,
}

impl LogContext {
    /// Open the span for one command invocation.
    ///
    /// Must be called after the command's subscriber is installed; a span
    /// created without a subscriber stays disabled.
    pub fn for_command(command: &'static str) -> Self {
        Self {
            span: info_span!("command", name = command),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
