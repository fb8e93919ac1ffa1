use futures::stream::{self, Stream, TryStreamExt};
use log::debug;
use std::pin::pin;

use super::core::{AzureDevOpsClient, Host};
use crate::error::{Result, ToolboxError};
use crate::providers::azure_devops::types::{GraphGroup, GraphMembership, GraphUser, ListResponse};

impl AzureDevOpsClient {
    /// Lazily pages through the organization's users.
    pub fn list_users(&self) -> impl Stream<Item = Result<Vec<GraphUser>>> + '_ {
        stream::try_unfold(Some(None::<String>), move |state| async move {
            let Some(continuation) = state else {
                return Ok::<_, ToolboxError>(None);
            };

            let mut url = self.endpoint(Host::Graph, &["_apis", "graph", "users"])?;
            if let Some(token) = continuation.as_deref() {
                url.query_pairs_mut().append_pair("continuationToken", token);
            }

            let (users, next) = self.get_page::<GraphUser>(url).await?;
            Ok(Some((users, next.map(Some))))
        })
    }

    /// Pages through users until one matches `email`; stops early on a hit.
    pub async fn find_user_by_email(&self, email: &str) -> Result<GraphUser> {
        let mut pages = pin!(self.list_users());
        let mut scanned = 0;

        while let Some(users) = pages.try_next().await? {
            scanned += users.len();
            if let Some(user) = users.into_iter().find(|user| user.matches_email(email)) {
                debug!("Resolved {email} after scanning {scanned} user(s)");
                return Ok(user);
            }
        }

        Err(ToolboxError::UserNotFound(email.to_string()))
    }

    /// Groups and teams the subject belongs to directly.
    pub async fn list_memberships(&self, subject_descriptor: &str) -> Result<Vec<GraphMembership>> {
        let mut url = self.endpoint(
            Host::Graph,
            &["_apis", "graph", "Memberships", subject_descriptor],
        )?;
        url.query_pairs_mut().append_pair("direction", "up");

        let response: ListResponse<GraphMembership> = self.get_json(url).await?;
        Ok(response.value)
    }

    pub async fn get_group(&self, group_descriptor: &str) -> Result<GraphGroup> {
        let url = self.endpoint(Host::Graph, &["_apis", "graph", "groups", group_descriptor])?;
        self.get_json(url).await
    }
}
