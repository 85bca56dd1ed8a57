use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one task inside a build unit (e.g. `:lib:compileJava`).
///
/// The controller never parses it; it is only compared and hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPath(String);

impl TaskPath {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}
