use serde::{Deserialize, Serialize};

use crate::constants::{ADMIN_PAGE_SIZE, SYSTEM_ADMIN_ROLE_ID};

/// User as exposed by the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Space separated role ids, as the host stores them.
    #[serde(default)]
    pub roles: String,
    #[serde(default)]
    pub delete_at: i64,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.split_whitespace().any(|r| r == role)
    }

    pub fn is_active(&self) -> bool {
        self.delete_at == 0
    }
}

/// Team a workspace is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub display_name: String,
}

/// Filter and paging options for listing host users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGetOptions {
    pub active: bool,
    pub role: String,
    pub per_page: usize,
    pub page: usize,
}

impl UserGetOptions {
    /// First page of active system administrators.
    pub fn system_admins(per_page: usize) -> Self {
        Self {
            active: true,
            role: SYSTEM_ADMIN_ROLE_ID.to_string(),
            per_page,
            page: 0,
        }
    }
}

impl Default for UserGetOptions {
    fn default() -> Self {
        Self::system_admins(ADMIN_PAGE_SIZE)
    }
}
