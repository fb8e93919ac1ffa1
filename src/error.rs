use thiserror::Error;

use crate::cleanup::PipelineType;

#[derive(Error, Debug)]
pub enum ToolboxError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Credential rejected by Azure DevOps (status {status}); check AZURE_DEVOPS_PAT")]
    Auth { status: u16 },

    #[error("Failed to enumerate {pipeline_type} runs (page {page}): {source}")]
    Enumeration {
        pipeline_type: PipelineType,
        page: usize,
        #[source]
        source: Box<ToolboxError>,
    },

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("API request failed with status {status} after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("No user found with email: {0}")]
    UserNotFound(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolboxError {
    /// Errors that end the whole invocation rather than a single run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Auth { .. } | Self::Enumeration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ToolboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ToolboxError::Config("missing".into()).is_fatal());
        assert!(ToolboxError::Auth { status: 401 }.is_fatal());
        assert!(!ToolboxError::Api {
            status: 403,
            message: "denied".into()
        }
        .is_fatal());
        assert!(!ToolboxError::ApiErrorAfterRetries {
            status: 503,
            retries: 3
        }
        .is_fatal());
    }

    #[test]
    fn test_enumeration_error_reports_cause() {
        let err = ToolboxError::Enumeration {
            pipeline_type: PipelineType::Yaml,
            page: 2,
            source: Box::new(ToolboxError::ApiErrorAfterRetries {
                status: 503,
                retries: 5,
            }),
        };

        let message = err.to_string();
        assert!(message.contains("yaml"));
        assert!(message.contains("page 2"));
        assert!(message.contains("503"));
        assert!(err.is_fatal());
    }
}
