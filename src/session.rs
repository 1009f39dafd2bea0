//! Signed-in state, its persistence, and the login/register flows.

use anyhow::Result;
use log::{debug, warn};

use crate::api::JobsApi;
use crate::error::ApiError;
use crate::models::{Credentials, User};
use crate::storage::Storage;

const USER_KEY: &str = "user";
const TOKEN_KEY: &str = "token";

/// A user together with the bearer token issued for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    pub user: User,
    pub token: String,
}

/// Who is signed in, if anyone. Passed explicitly to everything that makes
/// authenticated calls and replaced as a whole on login/logout, so a token
/// is never seen without its user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    auth: Option<Auth>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User, token: String) -> Self {
        Self {
            auth: Some(Auth { user, token }),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.auth.as_ref().map(|a| &a.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }
}

/// Keeps the session in [`Storage`] under the `user` and `token` keys.
pub struct SessionStore<'a> {
    storage: &'a Storage,
}

impl<'a> SessionStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Load the saved session. Missing, half-written or unparsable data is
    /// wiped and yields an anonymous session.
    pub fn restore(&self) -> Session {
        match self.read() {
            Ok(Some(session)) => session,
            Ok(None) => Session::anonymous(),
            Err(e) => {
                warn!("discarding saved session: {:#}", e);
                if let Err(e) = self.clear() {
                    warn!("failed to clear saved session: {:#}", e);
                }
                Session::anonymous()
            }
        }
    }

    fn read(&self) -> Result<Option<Session>> {
        let user = self.storage.get(USER_KEY)?;
        let token = self.storage.get(TOKEN_KEY)?;
        match (user, token) {
            (None, None) => Ok(None),
            (Some(user), Some(token)) if !token.is_empty() => {
                let user: User = serde_json::from_str(&user)?;
                Ok(Some(Session::authenticated(user, token)))
            }
            _ => anyhow::bail!("user and token are not both present"),
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        match &session.auth {
            Some(auth) => {
                let user = serde_json::to_string(&auth.user)?;
                self.storage
                    .set_all(&[(USER_KEY, user.as_str()), (TOKEN_KEY, auth.token.as_str())])
            }
            None => self.clear(),
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove_all(&[USER_KEY, TOKEN_KEY])
    }
}

pub async fn login(api: &dyn JobsApi, credentials: &Credentials) -> Result<Session, ApiError> {
    let response = api.login(credentials).await?;
    debug!("signed in as {}", response.user.email);
    Ok(Session::authenticated(response.user, response.token))
}

/// Create the account, then sign straight in with the same credentials.
pub async fn register_and_login(
    api: &dyn JobsApi,
    credentials: &Credentials,
) -> Result<Session, ApiError> {
    api.register(credentials).await?;
    login(api, credentials).await
}
