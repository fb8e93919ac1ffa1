use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cleanup::{PipelineRun, PipelineType, RunReference};

/// Envelope used by every Azure DevOps collection endpoint.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A YAML pipeline run as returned by the Build API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub id: u64,
    #[serde(default)]
    pub build_number: String,
    /// When the build was queued; used as the creation time
    pub queue_time: DateTime<Utc>,
    #[serde(default)]
    pub keep_forever: bool,
    #[serde(default)]
    pub retained_by_release: bool,
}

/// A classic release as returned by the Release Management API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub keep_forever: bool,
}

impl BuildRecord {
    pub fn into_run(self, project: &str) -> PipelineRun {
        PipelineRun {
            run_id: self.id,
            created_at: self.queue_time,
            pipeline_type: PipelineType::Yaml,
            display_name: self.build_number,
            retained: self.keep_forever || self.retained_by_release,
            reference: RunReference::Build {
                project: project.to_string(),
                build_id: self.id,
            },
        }
    }
}

impl ReleaseRecord {
    pub fn into_run(self, project: &str) -> PipelineRun {
        PipelineRun {
            run_id: self.id,
            created_at: self.created_on,
            pipeline_type: PipelineType::Release,
            display_name: self.name,
            retained: self.keep_forever,
            reference: RunReference::Release {
                project: project.to_string(),
                release_id: self.id,
            },
        }
    }
}

/// Retention lease protecting a build.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionLease {
    pub lease_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    pub descriptor: String,
    pub principal_name: Option<String>,
    pub mail_address: Option<String>,
    pub display_name: Option<String>,
}

impl GraphUser {
    /// Case-insensitive match on principal name or mail address.
    pub fn matches_email(&self, email: &str) -> bool {
        [&self.principal_name, &self.mail_address]
            .into_iter()
            .flatten()
            .any(|candidate| candidate.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMembership {
    pub container_descriptor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphGroup {
    pub descriptor: String,
    pub principal_name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_record_normalisation() {
        let record: BuildRecord = serde_json::from_str(
            r#"{
                "id": 42,
                "buildNumber": "20240105.3",
                "queueTime": "2024-01-05T10:00:00Z",
                "retainedByRelease": true,
                "status": "completed",
                "result": "succeeded"
            }"#,
        )
        .unwrap();

        let run = record.into_run("web");
        assert_eq!(run.run_id, 42);
        assert_eq!(run.pipeline_type, PipelineType::Yaml);
        assert_eq!(run.display_name, "20240105.3");
        assert!(run.retained);
        assert_eq!(
            run.reference,
            RunReference::Build {
                project: "web".to_string(),
                build_id: 42
            }
        );
    }

    #[test]
    fn test_release_record_normalisation() {
        let record: ReleaseRecord = serde_json::from_str(
            r#"{"id": 7, "name": "Release-7", "createdOn": "2024-02-01T08:30:00Z", "status": "active"}"#,
        )
        .unwrap();

        let run = record.into_run("web");
        assert_eq!(run.run_id, 7);
        assert_eq!(run.pipeline_type, PipelineType::Release);
        assert!(!run.retained);
        assert_eq!(run.created_at.to_rfc3339(), "2024-02-01T08:30:00+00:00");
    }

    #[test]
    fn test_list_response_without_value() {
        let response: ListResponse<BuildRecord> = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(response.value.is_empty());
    }

    #[test]
    fn test_graph_user_matches_email_case_insensitively() {
        let user = GraphUser {
            descriptor: "aad.abc".to_string(),
            principal_name: Some("Jane.Doe@Example.com".to_string()),
            mail_address: None,
            display_name: Some("Jane Doe".to_string()),
        };

        assert!(user.matches_email("jane.doe@example.com"));
        assert!(!user.matches_email("john@example.com"));
    }
}
