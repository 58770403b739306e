use serde::Deserialize;
use std::fmt;

/// Bearer token attached to every gateway request
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    #[serde(other)]
    Other,
}

/// The signed-in principal
///
/// Created once on login (or from a token handed in by the caller) and
/// passed explicitly to everything that talks to the backend. Dropping it
/// is the sign-out.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub credential: Credential,
    pub role: UserRole,
    /// Learning plan picked after sign-in; kept client side only
    pub plan: Option<String>,
}

impl AuthSession {
    pub fn new(credential: Credential, role: UserRole) -> Self {
        Self {
            credential,
            role,
            plan: None,
        }
    }

    pub fn with_plan(mut self, plan: Option<String>) -> Self {
        self.plan = plan.filter(|plan| !plan.trim().is_empty());
        self
    }

    /// Session for a token obtained out of band; the role is unknown
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(Credential::new(token), UserRole::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("secret-token");
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("secret-token"));
        assert_eq!(credential.token(), "secret-token");
    }

    #[test]
    fn test_plan_is_optional() {
        let auth = AuthSession::from_token("tok");
        assert_eq!(auth.plan, None);

        let auth = auth.with_plan(Some("Concept Clarity".to_string()));
        assert_eq!(auth.plan.as_deref(), Some("Concept Clarity"));
        assert_eq!(auth.with_plan(Some("  ".to_string())).plan, None);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(
            serde_json::from_str::<UserRole>("\"teacher\"").unwrap(),
            UserRole::Teacher
        );
        assert_eq!(
            serde_json::from_str::<UserRole>("\"admin\"").unwrap(),
            UserRole::Other
        );
    }
}
