// Login gate: tenant code + email + password.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use campus_core::errors::CampusError;
use campus_core::{Authenticator, LoginRequest, Principal, Role};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::password::PasswordHasher;

/// A stored user together with what the gate needs to judge a login.
#[derive(Debug, Clone, Default)]
pub struct CredentialRecord {
    /// User columns without credential material.
    pub user: Map<String, Value>,
    pub password_hash: Option<String>,
    pub school_code: Option<String>,
    pub school_status: Option<String>,
}

impl CredentialRecord {
    fn role(&self) -> Role {
        let raw = self
            .user
            .get("role")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Role::from(raw)
    }

    fn into_principal(self) -> Principal {
        let role = self.role();
        let mut profile = self.user;
        let id = profile
            .remove("id")
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_default();
        let school_id = profile
            .remove("schoolId")
            .and_then(|v| v.as_str().map(str::to_string));
        let email = profile
            .remove("email")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        profile.remove("role");
        profile.remove("password");

        Principal {
            id,
            school_id,
            email,
            role,
            profile,
        }
    }
}

/// Looks up login candidates by normalized email.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn resolve_by_email(&self, email_key: &str) -> Result<Vec<CredentialRecord>>;
}

#[derive(Clone, Debug)]
pub struct AuthGateOptions {
    pub error_message: String,
    pub blocked_message: String,
    /// School statuses that block tenant users, compared case-insensitively.
    pub blocked_statuses: Vec<String>,
}

impl Default for AuthGateOptions {
    fn default() -> Self {
        Self {
            error_message: "Usuário ou senha incorretos".to_string(),
            blocked_message: "Acesso da escola bloqueado".to_string(),
            blocked_statuses: vec!["bloqueado".to_string(), "blocked".to_string()],
        }
    }
}

pub struct AuthGate {
    resolver: Arc<dyn PrincipalResolver>,
    hasher: PasswordHasher,
    options: AuthGateOptions,
}

/// Comparison key for tenant codes and emails.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl AuthGate {
    pub fn new(resolver: Arc<dyn PrincipalResolver>, hasher: PasswordHasher) -> Self {
        Self {
            resolver,
            hasher,
            options: AuthGateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AuthGateOptions) -> Self {
        self.options = options;
        self
    }

    fn invalid(&self) -> anyhow::Error {
        CampusError::invalid_credentials(&self.options.error_message).into_anyhow()
    }

    fn is_blocked(&self, status: Option<&str>) -> bool {
        let Some(status) = status.map(normalize_key) else {
            return false;
        };
        self.options
            .blocked_statuses
            .iter()
            .any(|s| normalize_key(s) == status)
    }

    fn password_matches(&self, password: &str, candidate: &CredentialRecord) -> bool {
        let Some(stored) = candidate.password_hash.as_deref() else {
            return false;
        };
        match self.hasher.verify_password(password, stored) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "auth.malformed_hash");
                false
            }
        }
    }
}

#[async_trait]
impl Authenticator for AuthGate {
    async fn authenticate(&self, request: &LoginRequest) -> Result<Principal> {
        let email = normalize_key(&request.email);
        if email.is_empty() || request.password.is_empty() {
            return Err(self.invalid());
        }
        let tenant_code = request
            .tenant_code
            .as_deref()
            .map(normalize_key)
            .filter(|c| !c.is_empty());

        let candidates = self.resolver.resolve_by_email(&email).await?;

        for candidate in candidates {
            let role = candidate.role();
            if !role.is_super_admin() {
                let school_code = candidate.school_code.as_deref().map(normalize_key);
                match (&tenant_code, school_code) {
                    (Some(wanted), Some(actual)) if *wanted == actual => {}
                    _ => continue,
                }
            }

            if !self.password_matches(&request.password, &candidate) {
                continue;
            }

            if !role.is_super_admin() && self.is_blocked(candidate.school_status.as_deref()) {
                warn!(email = %email, "auth.blocked");
                return Err(CampusError::access_blocked(&self.options.blocked_message).into_anyhow());
            }

            let principal = candidate.into_principal();
            info!(user = %principal.id, school = ?principal.school_id, "auth.login");
            return Ok(principal);
        }

        Err(self.invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::ErrorKind;
    use serde_json::json;

    struct StaticResolver {
        records: Vec<CredentialRecord>,
    }

    #[async_trait]
    impl PrincipalResolver for StaticResolver {
        async fn resolve_by_email(&self, email_key: &str) -> Result<Vec<CredentialRecord>> {
            Ok(self
                .records
                .iter()
                .filter(|r| {
                    r.user
                        .get("email")
                        .and_then(|v| v.as_str())
                        .map(|e| normalize_key(e) == email_key)
                        .unwrap_or(false)
                })
                .cloned()
                .collect())
        }
    }

    fn record(id: &str, email: &str, role: &str, pw: &str, code: Option<&str>, status: &str) -> CredentialRecord {
        let hasher = PasswordHasher::with_cost(4);
        let user = json!({"id": id, "email": email, "role": role, "schoolId": code.map(|_| "s1"), "name": "Ana"});
        CredentialRecord {
            user: user.as_object().cloned().unwrap(),
            password_hash: Some(hasher.hash_password(pw).unwrap()),
            school_code: code.map(str::to_string),
            school_status: Some(status.to_string()),
        }
    }

    fn gate(records: Vec<CredentialRecord>) -> AuthGate {
        AuthGate::new(Arc::new(StaticResolver { records }), PasswordHasher::with_cost(4))
    }

    fn login(code: Option<&str>, email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            tenant_code: code.map(str::to_string),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn matches_code_and_email_case_insensitively() {
        let gate = gate(vec![record("u1", "a@x.com", "Diretor", "pw1", Some("ABC"), "Ativo")]);
        let principal = gate.authenticate(&login(Some("abc"), "A@X.com", "pw1")).await.unwrap();
        assert_eq!(principal.id, "u1");
        assert_eq!(principal.school_id.as_deref(), Some("s1"));
        assert!(principal.profile.get("password").is_none());
        assert_eq!(principal.profile["name"], "Ana");
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let gate = gate(vec![record("u1", "a@x.com", "Diretor", "pw1", Some("ABC"), "Ativo")]);
        let err = gate.authenticate(&login(Some("abc"), "a@x.com", "wrong")).await.unwrap_err();
        assert_eq!(CampusError::kind_of(&err), ErrorKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn wrong_tenant_code_is_invalid_credentials() {
        let gate = gate(vec![record("u1", "a@x.com", "Diretor", "pw1", Some("ABC"), "Ativo")]);
        let err = gate.authenticate(&login(Some("XYZ"), "a@x.com", "pw1")).await.unwrap_err();
        assert_eq!(CampusError::kind_of(&err), ErrorKind::InvalidCredentials);
        let err = gate.authenticate(&login(None, "a@x.com", "pw1")).await.unwrap_err();
        assert_eq!(CampusError::kind_of(&err), ErrorKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn blocked_school_is_access_blocked() {
        let gate = gate(vec![record("u1", "a@x.com", "Diretor", "pw1", Some("ABC"), "Bloqueado")]);
        let err = gate.authenticate(&login(Some("abc"), "a@x.com", "pw1")).await.unwrap_err();
        assert_eq!(CampusError::kind_of(&err), ErrorKind::AccessBlocked);

        let err = gate.authenticate(&login(Some("abc"), "a@x.com", "nope")).await.unwrap_err();
        assert_eq!(CampusError::kind_of(&err), ErrorKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn super_admin_bypasses_code_and_block() {
        let gate = gate(vec![record("root", "root@x.com", "SuperAdmin", "pw", None, "Bloqueado")]);
        let principal = gate.authenticate(&login(None, "ROOT@x.com", "pw")).await.unwrap();
        assert_eq!(principal.role, Role::SuperAdmin);
        let principal = gate.authenticate(&login(Some("any"), "root@x.com", "pw")).await.unwrap();
        assert_eq!(principal.id, "root");
    }

    #[tokio::test]
    async fn same_email_in_two_schools_picks_by_code() {
        let gate = gate(vec![
            record("u1", "a@x.com", "Professor", "pw1", Some("ABC"), "Ativo"),
            record("u2", "a@x.com", "Professor", "pw2", Some("DEF"), "Ativo"),
        ]);
        let principal = gate.authenticate(&login(Some("def"), "a@x.com", "pw2")).await.unwrap();
        assert_eq!(principal.id, "u2");
    }
}
