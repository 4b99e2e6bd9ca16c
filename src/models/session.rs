//! Session (authentication state) model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current authentication state.
///
/// A session without a token is anonymous: reads still work against public
/// content, writes are refused.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl Session {
    /// An anonymous session
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session holding a bearer token
    pub fn authenticated(token: &str, display_name: Option<&str>) -> Self {
        Self {
            token: Some(token.to_string()),
            display_name: display_name.map(str::to_string),
        }
    }

    /// Bearer token, if signed in
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// User display name, if known
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Whether a token is present
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Token and profile returned by a successful login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token
    pub token: String,
    /// User display name
    pub display_name: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("display_name", &self.display_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::authenticated("secret-jwt", Some("Ada"));
        let printed = format!("{session:?}");
        assert!(!printed.contains("secret-jwt"));
        assert!(printed.contains("Ada"));
    }

    #[test]
    fn test_anonymous_has_no_token() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
    }
}
