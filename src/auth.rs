use std::fmt;

use crate::error::{Result, ToolboxError};

pub const PAT_ENV_VAR: &str = "AZURE_DEVOPS_PAT";

/// Azure DevOps personal access token.
///
/// Read once at startup and handed to the client at construction. The
/// `Debug` impl never prints the secret.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    /// Validates a token taken from the environment or the command line.
    ///
    /// # Errors
    ///
    /// Returns `ToolboxError::Config` when the token is absent or blank.
    pub fn require(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            Some(token) if !token.is_empty() => Ok(Self(token.to_string())),
            _ => Err(ToolboxError::Config(format!(
                "Please set the {PAT_ENV_VAR} environment variable"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}
