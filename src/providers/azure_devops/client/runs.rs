use futures::stream::{self, Stream};
use log::{debug, info};
use reqwest::Method;
use serde_json::json;

use super::core::{AzureDevOpsClient, Host};
use crate::cleanup::{PipelineRun, PipelineTarget, PipelineType, RunReference};
use crate::error::{Result, ToolboxError};
use crate::providers::azure_devops::types::{
    BuildRecord, ListResponse, ReleaseRecord, RetentionLease,
};

impl AzureDevOpsClient {
    /// Lazily pages through every run of a pipeline.
    ///
    /// Each item is one page (one HTTP call). The stream ends after the
    /// page without a continuation token, or right after the first error.
    pub fn list_runs<'a>(
        &'a self,
        target: &'a PipelineTarget,
    ) -> impl Stream<Item = Result<Vec<PipelineRun>>> + 'a {
        stream::try_unfold(Some(None::<String>), move |state| async move {
            let Some(continuation) = state else {
                return Ok::<_, ToolboxError>(None);
            };

            let (runs, next) = self.fetch_runs_page(target, continuation.as_deref()).await?;
            Ok(Some((runs, next.map(Some))))
        })
    }

    async fn fetch_runs_page(
        &self,
        target: &PipelineTarget,
        continuation: Option<&str>,
    ) -> Result<(Vec<PipelineRun>, Option<String>)> {
        let definition = target.pipeline_id.to_string();
        let top = self.page_size.to_string();

        let (host, resource, definition_param, order) = match target.pipeline_type {
            PipelineType::Yaml => (
                Host::Core,
                ["_apis", "build", "builds"],
                "definitions",
                "queueTimeDescending",
            ),
            PipelineType::Release => (
                Host::Release,
                ["_apis", "release", "releases"],
                "definitionId",
                "descending",
            ),
        };

        let mut segments = vec![target.project.as_str()];
        segments.extend(resource);
        let mut url = self.endpoint(host, &segments)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair(definition_param, &definition)
                .append_pair("$top", &top)
                .append_pair("queryOrder", order);
            if let Some(token) = continuation {
                query.append_pair("continuationToken", token);
            }
        }

        let project = target.project.as_str();
        match target.pipeline_type {
            PipelineType::Yaml => {
                let (records, next) = self.get_page::<BuildRecord>(url).await?;
                let runs = records.into_iter().map(|r| r.into_run(project)).collect();
                Ok((runs, next))
            }
            PipelineType::Release => {
                let (records, next) = self.get_page::<ReleaseRecord>(url).await?;
                let runs = records.into_iter().map(|r| r.into_run(project)).collect();
                Ok((runs, next))
            }
        }
    }

    /// Deletes a single build or release.
    pub async fn delete_run(&self, run: &PipelineRun) -> Result<()> {
        let url = match &run.reference {
            RunReference::Build { project, build_id } => self.endpoint(
                Host::Core,
                &[project.as_str(), "_apis", "build", "builds", &build_id.to_string()],
            )?,
            RunReference::Release {
                project,
                release_id,
            } => self.endpoint(
                Host::Release,
                &[
                    project.as_str(),
                    "_apis",
                    "release",
                    "releases",
                    &release_id.to_string(),
                ],
            )?,
        };

        self.send(Method::DELETE, url, None).await?;
        debug!("Deleted {} run {}", run.pipeline_type, run.run_id);
        Ok(())
    }

    /// Clears `keepForever` and removes retention leases so a retained run
    /// can be deleted. Returns the number of leases removed.
    pub async fn release_retention(&self, run: &PipelineRun) -> Result<usize> {
        let body = json!({ "keepForever": false });

        match &run.reference {
            RunReference::Build { project, build_id } => {
                let build_id = build_id.to_string();

                let build_url = self.endpoint(
                    Host::Core,
                    &[project.as_str(), "_apis", "build", "builds", &build_id],
                )?;
                self.send(Method::PATCH, build_url, Some(&body)).await?;

                let leases_url = self.endpoint(
                    Host::Core,
                    &[project.as_str(), "_apis", "build", "builds", &build_id, "leases"],
                )?;
                let leases: ListResponse<RetentionLease> = self.get_json(leases_url).await?;
                if leases.value.is_empty() {
                    return Ok(0);
                }

                let ids = leases
                    .value
                    .iter()
                    .map(|lease| lease.lease_id.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                let mut delete_url = self.endpoint(
                    Host::Core,
                    &[project.as_str(), "_apis", "build", "retention", "leases"],
                )?;
                delete_url.query_pairs_mut().append_pair("ids", &ids);
                self.send(Method::DELETE, delete_url, None).await?;

                info!(
                    "Removed {} retention lease(s) from build {}",
                    leases.value.len(),
                    run.run_id
                );
                Ok(leases.value.len())
            }
            RunReference::Release {
                project,
                release_id,
            } => {
                let url = self.endpoint(
                    Host::Release,
                    &[
                        project.as_str(),
                        "_apis",
                        "release",
                        "releases",
                        &release_id.to_string(),
                    ],
                )?;
                self.send(Method::PATCH, url, Some(&body)).await?;
                info!("Cleared keepForever on release {}", run.run_id);
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use mockito::Matcher;

    use super::*;
    use crate::providers::azure_devops::client::testing::test_client;

    fn target(pipeline_type: PipelineType) -> PipelineTarget {
        PipelineTarget {
            project: "web".to_string(),
            pipeline_id: 12,
            pipeline_type,
        }
    }

    #[tokio::test]
    async fn test_list_runs_follows_continuation_tokens() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/org/web/_apis/build/builds")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("definitions".into(), "12".into()),
                Matcher::UrlEncoded("$top".into(), "2".into()),
                Matcher::UrlEncoded("api-version".into(), "7.1".into()),
                Matcher::Regex("queryOrder=queueTimeDescending$".into()),
            ]))
            .with_status(200)
            .with_header("x-ms-continuationtoken", "page2")
            .with_body(
                r#"{"count": 2, "value": [
                    {"id": 3, "buildNumber": "b3", "queueTime": "2024-01-03T00:00:00Z"},
                    {"id": 2, "buildNumber": "b2", "queueTime": "2024-01-02T00:00:00Z"}
                ]}"#,
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/org/web/_apis/build/builds")
            .match_query(Matcher::UrlEncoded(
                "continuationToken".into(),
                "page2".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"count": 1, "value": [
                    {"id": 1, "buildNumber": "b1", "queueTime": "2024-01-01T00:00:00Z", "keepForever": true}
                ]}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let target = target(PipelineType::Yaml);
        let pages: Vec<Vec<PipelineRun>> = client.list_runs(&target).try_collect().await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 2);
        assert_eq!(pages[1][0].run_id, 1);
        assert!(pages[1][0].retained);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_runs_release_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/org/web/_apis/release/releases")
            .match_query(Matcher::UrlEncoded("definitionId".into(), "12".into()))
            .with_status(200)
            .with_body(
                r#"{"count": 1, "value": [
                    {"id": 40, "name": "Release-40", "createdOn": "2024-03-01T12:00:00Z"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let target = target(PipelineType::Release);
        let pages: Vec<Vec<PipelineRun>> = client.list_runs(&target).try_collect().await.unwrap();

        assert_eq!(pages.len(), 1);
        let run = &pages[0][0];
        assert_eq!(run.pipeline_type, PipelineType::Release);
        assert_eq!(run.display_name, "Release-40");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_run_uses_type_specific_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let build = server
            .mock("DELETE", "/org/project/_apis/build/builds/5")
            .match_query(Matcher::Any)
            .with_status(204)
            .create_async()
            .await;
        let release = server
            .mock("DELETE", "/org/project/_apis/release/releases/9")
            .match_query(Matcher::Any)
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let build_run = crate::cleanup::run::fixtures::build_run(5, 0);
        let release_run = PipelineRun {
            pipeline_type: PipelineType::Release,
            reference: RunReference::Release {
                project: "project".to_string(),
                release_id: 9,
            },
            ..crate::cleanup::run::fixtures::build_run(9, 0)
        };

        tokio_test::assert_ok!(client.delete_run(&build_run).await);
        tokio_test::assert_ok!(client.delete_run(&release_run).await);

        build.assert_async().await;
        release.assert_async().await;
    }

    #[tokio::test]
    async fn test_release_retention_for_build_removes_leases() {
        let mut server = mockito::Server::new_async().await;
        let patch = server
            .mock("PATCH", "/org/project/_apis/build/builds/5")
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(json!({ "keepForever": false })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let leases = server
            .mock("GET", "/org/project/_apis/build/builds/5/leases")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"count": 2, "value": [{"leaseId": 11}, {"leaseId": 12}]}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/org/project/_apis/build/retention/leases")
            .match_query(Matcher::UrlEncoded("ids".into(), "11,12".into()))
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let run = crate::cleanup::run::fixtures::build_run(5, 0);
        let removed = client.release_retention(&run).await.unwrap();

        assert_eq!(removed, 2);
        patch.assert_async().await;
        leases.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_release_retention_without_leases_skips_delete() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/org/project/_apis/build/builds/5")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/org/project/_apis/build/builds/5/leases")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"count": 0, "value": []}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/org/project/_apis/build/retention/leases")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let run = crate::cleanup::run::fixtures::build_run(5, 0);

        assert_eq!(client.release_retention(&run).await.unwrap(), 0);
        delete.assert_async().await;
    }
}
