//! Two-step archive.org login and request authorization

use super::{ArchiveClient, http_builder, parse_json, send_with_metrics};
use crate::error::{ArchiveError, AuthStage, Result};
use reqwest::RequestBuilder;
use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{AUTHORIZATION, COOKIE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "/account/login";
const S3_KEYS_PATH: &str = "/account/s3.php?output_json=1";

/// Login intermittently fails unless this cookie is already present
const PRIMING_COOKIE: &str = "test-cookie=1; Path=/";

pub const LOGGED_IN_USER_COOKIE: &str = "logged-in-user";
pub const LOGGED_IN_SIG_COOKIE: &str = "logged-in-sig";

/// Short-lived session cookies issued by the web login form
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookies {
    pub user: String,
    pub signature: String,
}

impl SessionCookies {
    pub fn cookie_header(&self) -> String {
        format!(
            "{}={}; {}={}",
            LOGGED_IN_USER_COOKIE, self.user, LOGGED_IN_SIG_COOKIE, self.signature
        )
    }

    /// Pick the two session cookies out of a `name=value; name=value` header
    fn from_cookie_header(header: &str) -> Option<Self> {
        let mut user = None;
        let mut signature = None;

        for pair in header.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match name.trim() {
                LOGGED_IN_USER_COOKIE => user = Some(value.to_string()),
                LOGGED_IN_SIG_COOKIE => signature = Some(value.to_string()),
                _ => {}
            }
        }

        Some(Self {
            user: user?,
            signature: signature?,
        })
    }
}

impl fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookies")
            .field("user", &self.user)
            .field("signature", &"<redacted>")
            .finish()
    }
}

/// Long-lived S3-style key pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_key: String,
}

impl AccessKeys {
    pub fn authorization_header(&self) -> String {
        format!("LOW {}:{}", self.access_key, self.secret_key)
    }
}

impl fmt::Debug for AccessKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKeys")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Credentials attached to every authenticated request
///
/// The caller owns persistence; the type serializes so it can be stored and
/// restored across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthorizationContext {
    Session(SessionCookies),
    Keys(AccessKeys),
}

impl AuthorizationContext {
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            AuthorizationContext::Session(cookies) => {
                request.header(COOKIE, cookies.cookie_header())
            }
            AuthorizationContext::Keys(keys) => {
                request.header(AUTHORIZATION, keys.authorization_header())
            }
        }
    }

    pub fn variant(&self) -> &'static str {
        match self {
            AuthorizationContext::Session(_) => "session",
            AuthorizationContext::Keys(_) => "keys",
        }
    }
}

/// Everything a successful login produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub email: String,
    pub cookies: SessionCookies,
    pub keys: AccessKeys,
}

impl UserSession {
    /// Key-based authorization, preferred for capture calls
    pub fn authorization(&self) -> AuthorizationContext {
        AuthorizationContext::Keys(self.keys.clone())
    }

    pub fn cookie_authorization(&self) -> AuthorizationContext {
        AuthorizationContext::Session(self.cookies.clone())
    }
}

impl From<UserSession> for AuthorizationContext {
    fn from(session: UserSession) -> Self {
        AuthorizationContext::Keys(session.keys)
    }
}

#[derive(Debug, Deserialize)]
struct KeysResponse {
    #[serde(default)]
    key: Option<KeyPair>,
}

#[derive(Debug, Deserialize)]
struct KeyPair {
    #[serde(default)]
    s3accesskey: Option<String>,
    #[serde(default)]
    s3secretkey: Option<String>,
}

impl KeysResponse {
    fn into_keys(self) -> Option<AccessKeys> {
        let key = self.key?;
        let access_key = key.s3accesskey.filter(|k| !k.is_empty())?;
        let secret_key = key.s3secretkey.filter(|k| !k.is_empty())?;
        Some(AccessKeys {
            access_key,
            secret_key,
        })
    }
}

impl ArchiveClient {
    /// Log in and return key-based authorization.
    ///
    /// No context is returned unless both the web login and the key exchange
    /// succeed.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthorizationContext> {
        self.login_session(email, password)
            .await
            .map(|session| session.authorization())
    }

    /// Log in and return both the session cookies and the access keys
    pub async fn login_session(&self, email: &str, password: &str) -> Result<UserSession> {
        let result = self.try_login(email, password).await;

        match &result {
            Ok(_) => {
                self.metrics.login_succeeded();
                info!(email, "Login succeeded");
            }
            Err(e) => {
                self.metrics.login_failed();
                warn!(email, error = %e, "Login failed");
            }
        }

        result
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<UserSession> {
        let cookies = self
            .web_login(email, password)
            .await
            .map_err(|e| e.into_auth(AuthStage::WebLogin))?;

        let keys = self.fetch_access_keys(&cookies).await?;

        Ok(UserSession {
            email: email.to_string(),
            cookies,
            keys,
        })
    }

    /// POST the login form through a client bound to a jar that lives only
    /// for this call, then read the session cookies back out of it.
    async fn web_login(&self, email: &str, password: &str) -> Result<SessionCookies> {
        let base = Url::parse(&self.settings.web_base_url).map_err(|e| {
            ArchiveError::InvalidUrl(format!("{}: {}", self.settings.web_base_url, e))
        })?;

        let jar = Arc::new(Jar::default());
        jar.add_cookie_str(PRIMING_COOKIE, &base);

        let client = http_builder(&self.settings)?
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| ArchiveError::Config(e.to_string()))?;

        debug!(email, "Submitting login form");

        let request = client.post(self.web_endpoint(LOGIN_PATH)).form(&[
            ("username", email),
            ("password", password),
            ("action", "login"),
        ]);
        send_with_metrics(&self.metrics, request).await?;

        // Cookies without an explicit Path default to /account, so look them up
        // from the login URL rather than the site root
        let login_endpoint = self.web_endpoint(LOGIN_PATH);
        let login_url = Url::parse(&login_endpoint)
            .map_err(|e| ArchiveError::InvalidUrl(format!("{}: {}", login_endpoint, e)))?;
        let header = jar
            .cookies(&login_url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
            .unwrap_or_default();

        SessionCookies::from_cookie_header(&header).ok_or_else(|| ArchiveError::Auth {
            stage: AuthStage::WebLogin,
            reason: format!(
                "server did not issue {} and {} cookies",
                LOGGED_IN_USER_COOKIE, LOGGED_IN_SIG_COOKIE
            ),
        })
    }

    /// Exchange session cookies for the account's S3-style keys
    pub async fn fetch_access_keys(&self, cookies: &SessionCookies) -> Result<AccessKeys> {
        let request = self
            .http
            .get(self.web_endpoint(S3_KEYS_PATH))
            .header(COOKIE, cookies.cookie_header());

        let body = self
            .send(request)
            .await
            .map_err(|e| e.into_auth(AuthStage::KeyExchange))?;

        let response: KeysResponse = parse_json(&body, "keys response")
            .map_err(|e| e.into_auth(AuthStage::KeyExchange))?;

        response.into_keys().ok_or_else(|| ArchiveError::Auth {
            stage: AuthStage::KeyExchange,
            reason: "response is missing key.s3accesskey or key.s3secretkey".to_string(),
        })
    }

    /// Forget a session.
    ///
    /// The server is not contacted. Login cookies never outlive the login call,
    /// so dropping the context is all that is left to do; the caller must also
    /// discard any stored copy.
    pub fn logout(&self, context: AuthorizationContext) {
        info!(auth = context.variant(), "Logged out");
        drop(context);
    }
}
