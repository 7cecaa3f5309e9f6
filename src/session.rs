//! Authenticated session and its on-disk copy
use super::error::SessionError;
use super::lifecycle::Actor;
use super::types::User;
use sled::Batch;
use std::path::Path;
use std::sync::Arc;

pub const TOKEN_KEY: &str = "room_booking_auth_token";
pub const USER_KEY: &str = "room_booking_user";

/// Bearer credential issued by `/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Credential {
    #[n(0)]
    pub access_token: String,
    #[n(1)]
    pub token_type: String,
}

/// A logged-in user. Created on login or restore, dropped on logout or a 401.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub credential: Credential,
    pub user: User,
}

impl Session {
    pub fn new(credential: Credential, user: User) -> Self {
        Self { credential, user }
    }
    pub fn token(&self) -> &str {
        &self.credential.access_token
    }
    pub fn actor(&self) -> Actor {
        Actor::from(&self.user)
    }
}

/// Persists the current session under two fixed keys. Both keys are written
/// and removed together.
pub struct SessionStore {
    instance: Arc<sled::Db>,
}

impl SessionStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    pub fn open(path: &Path) -> Result<Self, SessionError> {
        let db = sled::open(path)?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Returns `None` unless both the token and the user profile are present.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let token = self.instance.get(TOKEN_KEY)?;
        let user = self.instance.get(USER_KEY)?;

        match (token, user) {
            (Some(token), Some(user)) => {
                let credential: Credential = minicbor::decode(&token)?;
                let user: User = minicbor::decode(&user)?;
                Ok(Some(Session::new(credential, user)))
            }
            _ => Ok(None),
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let encode_err = |e: minicbor::encode::Error<_>| SessionError::Encode(e.to_string());
        let token = minicbor::to_vec(&session.credential).map_err(encode_err)?;
        let user = minicbor::to_vec(&session.user).map_err(encode_err)?;

        let mut batch = Batch::default();
        batch.insert(TOKEN_KEY, token);
        batch.insert(USER_KEY, user);
        self.instance.apply_batch(batch)?;
        self.instance.flush()?;

        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        let mut batch = Batch::default();
        batch.remove(TOKEN_KEY);
        batch.remove(USER_KEY);
        self.instance.apply_batch(batch)?;
        self.instance.flush()?;

        Ok(())
    }
}
