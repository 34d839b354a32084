//! sleep action - time-based payload

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::actions::{Action, ActionError};
use crate::domain::ArgBag;

/// Sleep for a number of milliseconds, then return null
pub struct SleepAction;

#[async_trait]
impl Action for SleepAction {
    fn name(&self) -> &'static str {
        "sleep"
    }

    fn description(&self) -> &'static str {
        "Sleep for `ms` milliseconds (first positional arg or kwarg)."
    }

    async fn execute(&self, args: &[Value], kwargs: &ArgBag) -> Result<Value, ActionError> {
        let ms = args
            .first()
            .or_else(|| kwargs.get("ms"))
            .ok_or(ActionError::MissingArgument { name: "ms" })?
            .as_u64()
            .ok_or_else(|| ActionError::InvalidArgument("ms must be a non-negative integer".to_string()))?;

        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(Value::Null)
    }
}
