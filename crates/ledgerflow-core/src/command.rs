//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug + 'static {
    /// The type name for this command (for logging/routing).
    const COMMAND_TYPE: &'static str;

    /// The aggregate this command targets.
    fn aggregate_id(&self) -> Uuid;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The type name for this command.
    fn command_type(&self) -> &'static str {
        Self::COMMAND_TYPE
    }
}
