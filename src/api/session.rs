//! Cookie-backed sessions.
//!
//! The signed-in user and the pending login `state` both live in private
//! (encrypted and authenticated) cookies, so the server keeps no session
//! table. Each payload carries its own expiry, checked on every read.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::UserIdentity;

use super::AppState;

/// Cookie carrying the signed-in session
pub const SESSION_COOKIE: &str = "waste_sorter_session";
/// Cookie carrying the login `state` between `/login` and `/callback`
pub const LOGIN_STATE_COOKIE: &str = "waste_sorter_login_state";

/// Seconds a session stays valid after sign-in
pub const SESSION_TTL_SECS: i64 = 2 * 60 * 60;
/// Seconds a login round trip through the provider may take
pub const LOGIN_STATE_TTL_SECS: i64 = 10 * 60;

/// Cookie encryption key derived from the configured secret
#[must_use]
pub fn session_key(secret: &str) -> Key {
    Key::derive_from(&Sha256::digest(secret.as_bytes()))
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Row id in the users table
    pub user_id: i64,
    /// Identity reported by the provider at login
    pub identity: UserIdentity,
    /// Instant after which the session is ignored
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Session starting now and lasting [`SESSION_TTL_SECS`]
    #[must_use]
    pub fn new(user_id: i64, identity: UserIdentity) -> Self {
        Self {
            user_id,
            identity,
            expires_at: Utc::now() + Duration::seconds(SESSION_TTL_SECS),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LoginState {
    value: String,
    expires_at: DateTime<Utc>,
}

fn build_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

fn read_payload<T: DeserializeOwned>(jar: &PrivateCookieJar, name: &str) -> Option<T> {
    let cookie = jar.get(name)?;
    match serde_json::from_str(cookie.value()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            debug!(cookie = name, error = %e, "Ignoring malformed cookie payload");
            None
        }
    }
}

/// Store the session in the jar
pub fn start_session(jar: PrivateCookieJar, session: &Session) -> Result<PrivateCookieJar> {
    let value = serde_json::to_string(session)?;
    Ok(jar.add(build_cookie(SESSION_COOKIE, value)))
}

/// Live session from the jar; missing, undecryptable and expired cookies all
/// read as `None`
#[must_use]
pub fn read_session(jar: &PrivateCookieJar) -> Option<Session> {
    read_payload::<Session>(jar, SESSION_COOKIE).filter(|session| session.expires_at > Utc::now())
}

/// Drop the session cookie
#[must_use]
pub fn end_session(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(removal_cookie(SESSION_COOKIE))
}

/// Fresh login `state`, remembered in the jar until the callback
pub fn issue_login_state(jar: PrivateCookieJar) -> Result<(PrivateCookieJar, String)> {
    let state = LoginState {
        value: Uuid::new_v4().simple().to_string(),
        expires_at: Utc::now() + Duration::seconds(LOGIN_STATE_TTL_SECS),
    };
    let cookie = build_cookie(LOGIN_STATE_COOKIE, serde_json::to_string(&state)?);
    Ok((jar.add(cookie), state.value))
}

/// Consume the pending login `state`; true only if `presented` matches an
/// unexpired one. The cookie is removed either way.
#[must_use]
pub fn take_login_state(jar: PrivateCookieJar, presented: &str) -> (PrivateCookieJar, bool) {
    let valid = read_payload::<LoginState>(&jar, LOGIN_STATE_COOKIE)
        .is_some_and(|state| state.expires_at > Utc::now() && state.value == presented);
    (jar.remove(removal_cookie(LOGIN_STATE_COOKIE)), valid)
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Extractor for routes that need a signed-in user; redirects to `/login`
/// otherwise
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// The live session
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, Key::from_ref(state));

        read_session(&jar)
            .map(|session| Self { session })
            .ok_or_else(|| Redirect::to("/login"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};
    use axum::response::IntoResponse;

    fn identity() -> UserIdentity {
        UserIdentity {
            subject: "auth0|1".to_string(),
            name: "Sam".to_string(),
            email: None,
            picture: None,
        }
    }

    /// Carry the jar's `Set-Cookie` headers over to a fresh request jar
    fn round_trip(jar: PrivateCookieJar, key: &Key) -> PrivateCookieJar {
        let response = (jar, ()).into_response();
        let mut headers = HeaderMap::new();
        for value in response.headers().get_all(header::SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap();
            headers.append(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        }
        PrivateCookieJar::from_headers(&headers, key.clone())
    }

    #[test]
    fn test_session_round_trip() {
        let key = session_key("secret");
        let session = Session::new(1, identity());

        let jar = start_session(PrivateCookieJar::new(key.clone()), &session).unwrap();
        let jar = round_trip(jar, &key);
        assert_eq!(read_session(&jar), Some(session));

        let jar = end_session(jar);
        assert_eq!(read_session(&jar), None);
    }

    #[test]
    fn test_cookie_from_other_key_is_ignored() {
        let key = session_key("secret");
        let jar = start_session(PrivateCookieJar::new(key.clone()), &Session::new(1, identity())).unwrap();

        let other = round_trip(jar, &session_key("other-secret"));
        assert_eq!(read_session(&other), None);
    }

    #[test]
    fn test_forged_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("waste_sorter_session={\"user_id\":1}"),
        );
        let jar = PrivateCookieJar::from_headers(&headers, session_key("secret"));
        assert_eq!(read_session(&jar), None);
    }

    #[test]
    fn test_expired_session_is_ignored() {
        let key = session_key("secret");
        let mut session = Session::new(1, identity());
        session.expires_at = Utc::now() - Duration::seconds(1);

        let jar = round_trip(start_session(PrivateCookieJar::new(key.clone()), &session).unwrap(), &key);
        assert_eq!(read_session(&jar), None);
    }

    #[test]
    fn test_login_state_is_single_use() {
        let key = session_key("secret");
        let (jar, state) = issue_login_state(PrivateCookieJar::new(key.clone())).unwrap();
        let jar = round_trip(jar, &key);

        let (jar, valid) = take_login_state(jar, "never-issued");
        assert!(!valid);
        // The mismatch consumed the pending state
        let (_, valid) = take_login_state(jar, &state);
        assert!(!valid);

        let (jar, state) = issue_login_state(PrivateCookieJar::new(key.clone())).unwrap();
        let (jar, valid) = take_login_state(round_trip(jar, &key), &state);
        assert!(valid);
        let (_, valid) = take_login_state(jar, &state);
        assert!(!valid);
    }

    #[test]
    fn test_short_secret_still_yields_key() {
        // Any secret length is accepted; distinct secrets give distinct keys
        assert_ne!(session_key("a").master(), session_key("b").master());
    }
}
