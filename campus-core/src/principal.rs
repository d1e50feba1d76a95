//! Authenticated principals and login requests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role tag. `SuperAdmin` is system-level; every other value is a
/// tenant role the frontend defines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Tenant(String),
}

impl Role {
    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("superadmin") {
            Role::SuperAdmin
        } else {
            Role::Tenant(value)
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::SuperAdmin => "SuperAdmin".to_string(),
            Role::Tenant(name) => name,
        }
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default, alias = "schoolCode", alias = "code")]
    pub tenant_code: Option<String>,
    pub email: String,
    pub password: String,
}

/// A user that passed the auth gate. Never carries credential material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub school_id: Option<String>,
    pub email: String,
    pub role: Role,
    /// Remaining user columns, as stored.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}
