use std::env;
use std::fmt;

use crate::error::{FetchError, Result};

/// Earthdata login pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Source of the login pair. Storage is the caller's concern.
pub trait CredentialProvider {
    fn credentials(&self) -> Result<Credentials>;
}

/// Reads `EARTHDATA_USERNAME`/`EARTHDATA_PASSWORD`, falling back to
/// `NASA_USERNAME`/`NASA_PASSWORD`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl EnvCredentials {
    fn lookup(primary: &str, fallback: &str) -> Option<String> {
        env::var(primary)
            .or_else(|_| env::var(fallback))
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

impl CredentialProvider for EnvCredentials {
    fn credentials(&self) -> Result<Credentials> {
        let username = Self::lookup("EARTHDATA_USERNAME", "NASA_USERNAME");
        let password = Self::lookup("EARTHDATA_PASSWORD", "NASA_PASSWORD");

        match (username, password) {
            (Some(username), Some(password)) => Ok(Credentials::new(username, password)),
            _ => Err(FetchError::Auth(
                "Earthdata credentials missing: set EARTHDATA_USERNAME and EARTHDATA_PASSWORD"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}
