//! Action trait definition

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ArgBag;

use super::error::ActionError;

/// A callable payload a job can invoke by name
///
/// Implementations take positional args and a named-argument bag and
/// return a JSON value; errors are classified by the execution engine
/// and never abort a sweep.
#[async_trait]
pub trait Action: Send + Sync {
    /// Action name (matches the name jobs are scheduled with)
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Execute the action
    async fn execute(&self, args: &[Value], kwargs: &ArgBag) -> Result<Value, ActionError>;
}
