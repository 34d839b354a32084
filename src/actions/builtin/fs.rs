//! read_file / write_file actions - file system payloads

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::actions::{Action, ActionError};
use crate::domain::ArgBag;

fn path_arg<'a>(args: &'a [Value], kwargs: &'a ArgBag) -> Result<&'a str, ActionError> {
    args.first()
        .or_else(|| kwargs.get("path"))
        .and_then(|v| v.as_str())
        .ok_or(ActionError::MissingArgument { name: "path" })
}

/// Read a file and return its lines as a JSON array
pub struct ReadFileAction;

#[async_trait]
impl Action for ReadFileAction {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read a text file, returning its lines as an array."
    }

    async fn execute(&self, args: &[Value], kwargs: &ArgBag) -> Result<Value, ActionError> {
        let path = path_arg(args, kwargs)?;
        let content = tokio::fs::read_to_string(path).await?;
        let lines: Vec<Value> = content.lines().map(|l| json!(l)).collect();
        Ok(Value::Array(lines))
    }
}

/// Write content to a file, creating parent directories as needed
pub struct WriteFileAction;

#[async_trait]
impl Action for WriteFileAction {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write `content` to `path`, creating parent directories."
    }

    async fn execute(&self, args: &[Value], kwargs: &ArgBag) -> Result<Value, ActionError> {
        let path = path_arg(args, kwargs)?;
        let content = args
            .get(1)
            .or_else(|| kwargs.get("content"))
            .and_then(|v| v.as_str())
            .ok_or(ActionError::MissingArgument { name: "content" })?;

        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(path, content).await?;
        Ok(json!(content.len()))
    }
}
