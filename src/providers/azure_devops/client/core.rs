use log::{debug, warn};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use url::Url;

use crate::auth::Token;
use crate::config::Config;
use crate::error::{Result, ToolboxError};

use super::super::types::ListResponse;

const USER_AGENT: &str = concat!("azdo-toolbox/", env!("CARGO_PKG_VERSION"));
const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// Which Azure DevOps service a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Host {
    /// Build API (YAML pipelines, retention leases)
    Core,
    /// Release Management API (classic release pipelines)
    Release,
    /// Graph API (users, groups, memberships)
    Graph,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetrySettings {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetrySettings {
    /// Exponential backoff capped at `max_delay`. A server-provided
    /// `Retry-After` is used as-is; the cap only bounds our own guess.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| {
            self.base_delay
                .saturating_mul(1u32 << attempt.min(16))
                .min(self.max_delay)
        })
    }
}

/// Shared pause point so concurrent callers back off together after a 429.
#[derive(Debug, Default)]
struct BackoffGate {
    resume_at: Mutex<Option<Instant>>,
}

impl BackoffGate {
    async fn wait(&self) {
        let resume_at = *self
            .resume_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(resume_at) = resume_at {
            tokio::time::sleep_until(resume_at).await;
        }
    }

    fn hold_off(&self, delay: Duration) {
        let target = Instant::now() + delay;
        let mut resume_at = self
            .resume_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if resume_at.map_or(true, |current| current < target) {
            *resume_at = Some(target);
        }
    }
}

/// Authenticated client for one Azure DevOps organization.
pub struct AzureDevOpsClient {
    client: Client,
    organization: String,
    token: Token,
    core_url: Url,
    release_url: Url,
    graph_url: Url,
    api_version: String,
    graph_api_version: String,
    pub(super) page_size: usize,
    retry: RetrySettings,
    semaphore: Arc<Semaphore>,
    backoff: Arc<BackoffGate>,
}

impl AzureDevOpsClient {
    pub fn new(organization: &str, token: Token, config: &Config) -> Result<Self> {
        if organization.trim().is_empty() {
            return Err(ToolboxError::Config("Organization must not be empty".to_string()));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.http.timeout())
            .build()
            .map_err(|e| ToolboxError::Config(format!("Failed to create HTTP client: {e}")))?;

        let azure = &config.azure_devops;

        Ok(Self {
            client,
            organization: organization.to_string(),
            token,
            core_url: parse_host(&azure.core_url)?,
            release_url: parse_host(&azure.release_url)?,
            graph_url: parse_host(&azure.graph_url)?,
            api_version: azure.api_version.clone(),
            graph_api_version: azure.graph_api_version.clone(),
            page_size: azure.page_size.max(1),
            retry: RetrySettings {
                max_retries: config.http.max_retries,
                base_delay: config.http.retry_base_delay(),
                max_delay: config.http.retry_max_delay(),
            },
            semaphore: Arc::new(Semaphore::new(config.http.max_concurrent_requests.max(1))),
            backoff: Arc::new(BackoffGate::default()),
        })
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Construct `{host}/{organization}/{segments...}?api-version=...`.
    ///
    /// Each segment is percent-encoded individually.
    pub(crate) fn endpoint(&self, host: Host, segments: &[&str]) -> Result<Url> {
        let (base, api_version) = match host {
            Host::Core => (&self.core_url, &self.api_version),
            Host::Release => (&self.release_url, &self.api_version),
            Host::Graph => (&self.graph_url, &self.graph_api_version),
        };

        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| ToolboxError::Config(format!("Invalid base URL: {base}")))?
            .pop_if_empty()
            .push(&self.organization)
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", api_version);

        Ok(url)
    }

    /// Send a request, retrying 429, 5xx and connection failures.
    ///
    /// 401 (and the 203 sign-in page Azure DevOps serves for a bad PAT)
    /// become `ToolboxError::Auth` and are never retried. Any other
    /// non-success status becomes `ToolboxError::Api`.
    pub(crate) async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ToolboxError::Config(format!("Request limiter closed: {e}")))?;

        let mut retry_count = 0;
        loop {
            self.backoff.wait().await;

            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .basic_auth("", Some(self.token.as_str()));
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!("{method} {}", url.path());

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    if retry_count >= self.retry.max_retries {
                        return Err(e.into());
                    }
                    let delay = self.retry.delay(retry_count, None);
                    warn!(
                        "Network error ({e}), retrying in {}ms ({}/{})...",
                        delay.as_millis(),
                        retry_count + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == StatusCode::UNAUTHORIZED
                || status == StatusCode::NON_AUTHORITATIVE_INFORMATION
            {
                return Err(ToolboxError::Auth {
                    status: status.as_u16(),
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retry_count >= self.retry.max_retries {
                    return Err(ToolboxError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: self.retry.max_retries,
                    });
                }

                let delay = self.retry.delay(retry_count, retry_after(&response));
                warn!(
                    "Azure DevOps API error (status {status}). Waiting {}ms before retry {}/{}...",
                    delay.as_millis(),
                    retry_count + 1,
                    self.retry.max_retries
                );

                if status == StatusCode::TOO_MANY_REQUESTS {
                    self.backoff.hold_off(delay);
                } else {
                    tokio::time::sleep(delay).await;
                }
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(ToolboxError::Api {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            return Ok(response);
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(Method::GET, url, None).await?;
        Ok(response.json().await?)
    }

    /// Fetch one page of a collection plus the continuation token for the next.
    pub(crate) async fn get_page<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<(Vec<T>, Option<String>)> {
        let response = self.send(Method::GET, url, None).await?;

        let continuation = response
            .headers()
            .get(CONTINUATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(ToString::to_string);

        let page: ListResponse<T> = response.json().await?;
        debug!(
            "Fetched page of {} item(s), more pages: {}",
            page.value.len(),
            continuation.is_some()
        );

        Ok((page.value, continuation))
    }
}

fn parse_host(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| ToolboxError::Config(format!("Invalid base URL '{raw}': {e}")))
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
