use crate::config::UserEntry;
use crate::domain::AuthenticatedUser;
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// Identity collaborator: resolves a bearer token to an authenticated user.
/// Registration and approval workflows live behind this boundary.
#[async_trait]
pub trait IdentityPort: Send + Sync {
    async fn authenticate(&self, token: &str) -> Option<AuthenticatedUser>;
}

/// Token table loaded from configuration. Each user gets a stable id for the
/// lifetime of the process.
pub struct StaticTokenIdentity {
    users: HashMap<String, AuthenticatedUser>,
}

impl StaticTokenIdentity {
    pub fn from_entries(entries: &[UserEntry]) -> Self {
        let users = entries
            .iter()
            .map(|entry| {
                (
                    entry.token.clone(),
                    AuthenticatedUser {
                        id: Uuid::new_v4(),
                        username: entry.username.clone(),
                        is_admin: entry.is_admin,
                        is_approved: entry.is_approved,
                    },
                )
            })
            .collect();
        Self { users }
    }
}

#[async_trait]
impl IdentityPort for StaticTokenIdentity {
    async fn authenticate(&self, token: &str) -> Option<AuthenticatedUser> {
        self.users.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_tokens_only() {
        let identity = StaticTokenIdentity::from_entries(&[UserEntry {
            token: "t-1".to_string(),
            username: "alice".to_string(),
            is_admin: false,
            is_approved: true,
        }]);

        let user = identity.authenticate("t-1").await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(identity.authenticate("t-2").await.is_none());
    }
}
