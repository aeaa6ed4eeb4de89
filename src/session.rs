use std::fmt::{Debug, Formatter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::endpoints::Endpoint;
use crate::error::ApiError;
use crate::transport::{Api, ApiRequest};

/// Supplies the bearer token to the views. \
/// A session without a token suppresses every authenticated request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    refresh_token: Option<String>,
}

/// Tokens returned by the login endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPair {
    access: String,
    refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RefreshedToken {
    access: String,
}

/// What the server returns after creating an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupReceipt {
    pub id: u64,
    pub email: String,
}

impl Session {

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session for an already known access token. Blank tokens count as absent.
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.trim().is_empty()).then_some(token),
            refresh_token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The token to authenticate requests with, or [`ApiError::NoSession`]
    pub fn bearer(&self) -> Result<&str, ApiError> {
        self.token().ok_or(ApiError::NoSession)
    }

    /// Drops all tokens
    pub fn logout(&mut self) {
        self.token = None;
        self.refresh_token = None;
    }

    /// Obtains a token pair for the given credentials
    pub fn login(api: &impl Api, email: &str, password: &str) -> Result<Self, ApiError> {
        let request = ApiRequest::post(api.endpoints().url(Endpoint::Login))
            .json(json!({ "email": email, "password": password }));
        let pair: TokenPair = api.send(request)?.json()?;
        log::info!("Logged in as {}", email);
        Ok(Self {
            token: Some(pair.access),
            refresh_token: pair.refresh,
        })
    }

    /// Exchanges the refresh token for a new access token
    pub fn refresh(&mut self, api: &impl Api) -> Result<(), ApiError> {
        let refresh = self.refresh_token.as_deref().ok_or(ApiError::NoSession)?;
        let request = ApiRequest::post(api.endpoints().url(Endpoint::TokenRefresh))
            .json(json!({ "refresh": refresh }));
        let refreshed: RefreshedToken = api.send(request)?.json()?;
        self.token = Some(refreshed.access);
        log::debug!("Access token refreshed");
        Ok(())
    }

}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("refreshable", &self.refresh_token.is_some())
            .finish()
    }
}

/// Creates a new account. Does not log in.
pub fn signup(api: &impl Api, email: &str, password: &str) -> Result<SignupReceipt, ApiError> {
    let request = ApiRequest::post(api.endpoints().url(Endpoint::Signup))
        .json(json!({ "email": email, "password": password }));
    api.send(request)?.json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;
    use crate::transport::{Method, RequestBody};

    #[test]
    fn test_blank_token_is_absent() {
        assert!(!Session::with_token("  ").is_authenticated());
        assert!(matches!(Session::anonymous().bearer(), Err(ApiError::NoSession)));
        assert_eq!(Session::with_token("abc").bearer().unwrap(), "abc");
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", Session::with_token("eyJhbGciOi.secret"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_login_and_refresh() {
        let api = MockApi::new();
        api.respond(200, r#"{"access": "a1", "refresh": "r1"}"#)
            .respond(200, r#"{"access": "a2"}"#);
        let mut session = Session::login(&api, "ana@x.com", "pw").unwrap();
        assert_eq!(session.token(), Some("a1"));
        let login = api.last_request();
        assert_eq!(login.method, Method::Post);
        assert_eq!(login.url.path(), "/api/users/token/");
        assert!(login.bearer.is_none());
        assert_eq!(login.body, RequestBody::Json(json!({"email": "ana@x.com", "password": "pw"})));

        session.refresh(&api).unwrap();
        assert_eq!(session.token(), Some("a2"));
        assert_eq!(api.last_request().body, RequestBody::Json(json!({"refresh": "r1"})));
    }

    #[test]
    fn test_failed_login() {
        let api = MockApi::new();
        api.respond(401, r#"{"detail": "No active account found with the given credentials"}"#);
        let err = Session::login(&api, "ana@x.com", "wrong").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { status: 401, .. }));
    }

    #[test]
    fn test_refresh_without_refresh_token() {
        let api = MockApi::new();
        let mut session = Session::with_token("a1");
        assert!(matches!(session.refresh(&api), Err(ApiError::NoSession)));
        assert_eq!(api.request_count(), 0);
    }

    #[test]
    fn test_signup() {
        let api = MockApi::new();
        api.respond(201, r#"{"id": 9, "email": "new@x.com"}"#);
        let receipt = signup(&api, "new@x.com", "pw").unwrap();
        assert_eq!(receipt, SignupReceipt { id: 9, email: "new@x.com".to_string() });
        assert_eq!(api.last_request().url.path(), "/api/users/signup/");
    }
}
