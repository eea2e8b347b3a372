//! Identity provider boundary.
//!
//! Sign-in is delegated to a hosted OpenID Connect login page. The rest of the
//! crate only sees [`IdentityGateway`]; [`OidcGateway`] talks to an
//! Auth0-style tenant.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::config::IdentityConfig;
use crate::error::{Result, WasteSorterError};
use crate::models::UserIdentity;

/// Scopes requested at login
pub const LOGIN_SCOPE: &str = "openid profile email";

/// Hosted-login identity provider
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// URL to send the browser to for sign-in; `state` comes back on the callback
    fn login(&self, state: &str) -> Result<String>;

    /// Exchange an authorization code for the signed-in user's identity
    async fn handle_callback(&self, code: &str) -> Result<UserIdentity>;

    /// URL that ends the provider session and returns to `return_to`
    fn logout(&self, return_to: &str) -> Result<String>;
}

/// Authorization-code flow against an Auth0-style tenant
pub struct OidcGateway {
    base: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
    nickname: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

impl OidcGateway {
    /// `redirect_uri` is the absolute URL of this service's callback route
    pub fn new(config: &IdentityConfig, redirect_uri: String) -> Result<Self> {
        let base = Url::parse(&format!("https://{}/", config.domain.trim_end_matches('/')))
            .map_err(|e| WasteSorterError::InvalidConfig(format!("identity domain: {e}")))?;

        Ok(Self {
            base,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri,
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| WasteSorterError::Identity(format!("bad endpoint {path}: {e}")))
    }
}

#[async_trait]
impl IdentityGateway for OidcGateway {
    fn login(&self, state: &str) -> Result<String> {
        let mut url = self.endpoint("authorize")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", LOGIN_SCOPE)
            .append_pair("state", state);
        Ok(url.into())
    }

    async fn handle_callback(&self, code: &str) -> Result<UserIdentity> {
        let token: TokenResponse = self
            .http
            .post(self.endpoint("oauth/token")?)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let info: UserInfo = self
            .http
            .get(self.endpoint("userinfo")?)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(subject = %info.sub, "Resolved user identity");
        Ok(info.into())
    }

    fn logout(&self, return_to: &str) -> Result<String> {
        let mut url = self.endpoint("v2/logout")?;
        url.query_pairs_mut()
            .append_pair("returnTo", return_to)
            .append_pair("client_id", &self.client_id);
        Ok(url.into())
    }
}

impl From<UserInfo> for UserIdentity {
    fn from(info: UserInfo) -> Self {
        let name = info
            .name
            .or(info.nickname)
            .or_else(|| info.email.clone())
            .unwrap_or_else(|| "User".to_string());

        Self {
            subject: info.sub,
            name,
            email: info.email,
            picture: info.picture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> OidcGateway {
        let config = IdentityConfig {
            domain: "tenant.example.com".to_string(),
            client_id: "abc".to_string(),
            client_secret: "shh".to_string(),
        };
        OidcGateway::new(&config, "http://localhost:5000/callback".to_string()).unwrap()
    }

    #[test]
    fn test_login_url_carries_client_and_state() {
        let url = Url::parse(&gateway().login("xyz").unwrap()).unwrap();
        assert_eq!(url.host_str(), Some("tenant.example.com"));
        assert_eq!(url.path(), "/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".to_string(), "abc".to_string())));
        assert!(pairs.contains(&("state".to_string(), "xyz".to_string())));
        assert!(pairs.contains(&("redirect_uri".to_string(), "http://localhost:5000/callback".to_string())));
    }

    #[test]
    fn test_logout_url_returns_to_site() {
        let url = Url::parse(&gateway().logout("http://localhost:5000/").unwrap()).unwrap();
        assert_eq!(url.path(), "/v2/logout");
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "returnTo" && v == "http://localhost:5000/"));
    }

    #[test]
    fn test_userinfo_name_falls_back_to_nickname() {
        let identity: UserIdentity = UserInfo {
            sub: "auth0|1".to_string(),
            name: None,
            nickname: Some("sam".to_string()),
            email: None,
            picture: None,
        }
        .into();
        assert_eq!(identity.name, "sam");
    }
}
