//! Host plugin API seam
//!
//! The boards service runs inside a host application that owns users. Only
//! the user listing is needed here, so that is all the trait exposes.

use async_trait::async_trait;
use boards_core::models::{User, UserGetOptions};
use boards_core::AppError;
use std::sync::Mutex;

/// User operations provided by the host application
#[async_trait]
pub trait HostApi: Send + Sync {
    /// One page of users matching `options`. An empty page ends the listing.
    async fn get_users(&self, options: &UserGetOptions) -> Result<Vec<User>, AppError>;
}

/// Host API serving a fixed user list
///
/// Applies the role and active filters and pages the result the way the host
/// does. Every request is recorded.
#[derive(Default)]
pub struct StaticHostApi {
    users: Vec<User>,
    requests: Mutex<Vec<UserGetOptions>>,
}

impl StaticHostApi {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Options of every `get_users` call, in call order.
    pub fn requests(&self) -> Vec<UserGetOptions> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl HostApi for StaticHostApi {
    async fn get_users(&self, options: &UserGetOptions) -> Result<Vec<User>, AppError> {
        self.requests
            .lock()
            .map_err(|_| AppError::HostApi("request log lock poisoned".to_string()))?
            .push(options.clone());

        if options.per_page == 0 {
            return Err(AppError::HostApi("per_page must be positive".to_string()));
        }

        Ok(self
            .users
            .iter()
            .filter(|user| !options.active || user.is_active())
            .filter(|user| options.role.is_empty() || user.has_role(&options.role))
            .skip(options.page * options.per_page)
            .take(options.per_page)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, roles: &str, delete_at: i64) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            email: format!("{}@example.com", id),
            roles: roles.to_string(),
            delete_at,
        }
    }

    #[tokio::test]
    async fn filters_by_role_and_activity() {
        let host = StaticHostApi::new(vec![
            user("admin1", "system_user system_admin", 0),
            user("member", "system_user", 0),
            user("gone", "system_admin", 42),
        ]);

        let admins = host
            .get_users(&UserGetOptions::system_admins(50))
            .await
            .unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, "admin1");
        assert_eq!(host.requests().len(), 1);
    }

    #[tokio::test]
    async fn pages_through_results() {
        let host = StaticHostApi::new(vec![
            user("a", "system_admin", 0),
            user("b", "system_admin", 0),
            user("c", "system_admin", 0),
        ]);

        let mut options = UserGetOptions::system_admins(2);
        assert_eq!(host.get_users(&options).await.unwrap().len(), 2);
        options.page = 1;
        let second = host.get_users(&options).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "c");
        options.page = 2;
        assert!(host.get_users(&options).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_page_size_is_rejected() {
        let host = StaticHostApi::default();
        let err = host
            .get_users(&UserGetOptions::system_admins(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::HostApi(_)));
    }
}
