//! add / sub actions - arithmetic payloads

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::actions::{Action, ActionError};
use crate::domain::ArgBag;

fn as_number(value: &Value) -> Result<f64, ActionError> {
    value
        .as_f64()
        .ok_or_else(|| ActionError::InvalidArgument(format!("expected a number, got {}", value)))
}

/// Sum all numeric positional args and all numeric kwarg values
pub struct AddAction;

#[async_trait]
impl Action for AddAction {
    fn name(&self) -> &'static str {
        "add"
    }

    fn description(&self) -> &'static str {
        "Sum all positional and named numeric inputs."
    }

    async fn execute(&self, args: &[Value], kwargs: &ArgBag) -> Result<Value, ActionError> {
        let mut total = 0.0;
        for arg in args {
            total += as_number(arg)?;
        }
        for value in kwargs.values() {
            total += as_number(value)?;
        }
        Ok(json!(total))
    }
}

/// Subtract the second positional arg from the first
pub struct SubAction;

#[async_trait]
impl Action for SubAction {
    fn name(&self) -> &'static str {
        "sub"
    }

    fn description(&self) -> &'static str {
        "Subtract the second positional input from the first."
    }

    async fn execute(&self, args: &[Value], _kwargs: &ArgBag) -> Result<Value, ActionError> {
        let [a, b] = args else {
            return Err(ActionError::InvalidArgument(format!(
                "sub takes exactly 2 positional args, got {}",
                args.len()
            )));
        };
        Ok(json!(as_number(a)? - as_number(b)?))
    }
}
