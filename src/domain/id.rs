//! Job ID generation and handling
//!
//! Ids are uuid-v7 strings assigned exactly once, when the scheduler
//! accepts a job.

/// Generate a fresh job id
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Job ID wrapper for type-safe ID handling
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Create a fresh id
    pub fn new() -> Self {
        Self(generate_id())
    }

    /// Create from an existing ID string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the full ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string parses as a valid id
    pub fn is_valid(value: &str) -> bool {
        uuid::Uuid::parse_str(value).is_ok()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for JobId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}
