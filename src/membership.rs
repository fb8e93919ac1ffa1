use log::{info, warn};
use serde::Serialize;

use crate::error::Result;
use crate::providers::azure_devops::types::GraphGroup;
use crate::providers::AzureDevOpsClient;

/// A user and the groups/teams they belong to.
#[derive(Debug, Serialize)]
pub struct UserMemberships {
    pub email: String,
    pub descriptor: String,
    pub display_name: Option<String>,
    pub groups: Vec<GraphGroup>,
}

/// Resolves `email` to a user and lists the groups and teams it belongs to.
///
/// Read-only. A group whose details cannot be fetched is still listed,
/// identified by its descriptor only.
///
/// # Errors
///
/// Returns `ToolboxError::UserNotFound` when no user matches, or any
/// transport error from the user or membership listing.
pub async fn lookup_memberships(client: &AzureDevOpsClient, email: &str) -> Result<UserMemberships> {
    info!("Fetching data for user: {email}");

    let user = client.find_user_by_email(email).await?;
    info!("User descriptor found: {}", user.descriptor);

    let memberships = client.list_memberships(&user.descriptor).await?;
    info!("Found {} memberships for this user", memberships.len());

    let lookups = memberships.into_iter().map(|membership| async move {
        let descriptor = membership.container_descriptor;
        match client.get_group(&descriptor).await {
            Ok(group) => group,
            Err(err) => {
                warn!("Could not retrieve details for {descriptor}: {err}");
                GraphGroup {
                    descriptor,
                    principal_name: None,
                    display_name: None,
                    description: None,
                }
            }
        }
    });

    let mut groups = futures::future::join_all(lookups).await;
    groups.sort_by(|a, b| {
        a.principal_name
            .cmp(&b.principal_name)
            .then_with(|| a.descriptor.cmp(&b.descriptor))
    });

    Ok(UserMemberships {
        email: email.to_string(),
        descriptor: user.descriptor,
        display_name: user.display_name,
        groups,
    })
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::error::ToolboxError;
    use crate::providers::azure_devops::testing::test_client;

    #[tokio::test]
    async fn test_lookup_memberships_resolves_groups() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/org/_apis/graph/users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"count": 1, "value": [
                    {"descriptor": "aad.jane", "principalName": "jane@example.com",
                     "mailAddress": "jane@example.com", "displayName": "Jane"}
                ]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/org/_apis/graph/Memberships/aad.jane")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"count": 2, "value": [
                    {"containerDescriptor": "vssgp.web", "memberDescriptor": "aad.jane"},
                    {"containerDescriptor": "vssgp.gone", "memberDescriptor": "aad.jane"}
                ]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/org/_apis/graph/groups/vssgp.web")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"descriptor": "vssgp.web", "principalName": "[web]\\Web Team",
                    "displayName": "Web Team", "description": "Frontend"}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/org/_apis/graph/groups/vssgp.gone")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = lookup_memberships(&client, "jane@example.com").await.unwrap();

        assert_eq!(result.descriptor, "aad.jane");
        assert_eq!(result.display_name.as_deref(), Some("Jane"));
        assert_eq!(result.groups.len(), 2);
        // Unresolved group sorts first (None < Some)
        assert_eq!(result.groups[0].descriptor, "vssgp.gone");
        assert!(result.groups[0].principal_name.is_none());
        assert_eq!(result.groups[1].display_name.as_deref(), Some("Web Team"));
    }

    #[tokio::test]
    async fn test_lookup_memberships_unknown_user() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/org/_apis/graph/users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"count": 0, "value": []}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let err = lookup_memberships(&client, "nobody@example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, ToolboxError::UserNotFound(_)));
    }
}
