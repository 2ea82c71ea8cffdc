//! Password session holding the derived key between operations.

use crate::crypto::{derive_key, validate_password, DerivedKey, Salt};
use crate::error::{Error, Result};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// The caller's unlocked password and the key derived from it.
///
/// A session is passed explicitly into every vault operation. The key is
/// derived lazily per device salt and cached, so a sequence of operations
/// against one storage pays for Argon2 once. [`Session::clear`] wipes both
/// the password and the key; dropping the session does the same.
pub struct Session {
    password: Option<Zeroizing<String>>,
    cached: Option<(Salt, DerivedKey)>,
}

impl Session {
    /// Start a session, rejecting passwords shorter than the minimum.
    pub fn new(password: &str) -> Result<Self> {
        validate_password(password.as_bytes())?;
        Ok(Self {
            password: Some(Zeroizing::new(password.to_string())),
            cached: None,
        })
    }

    /// Key for the given device salt, deriving it on first use.
    pub fn key_for(&mut self, salt: &Salt) -> Result<&DerivedKey> {
        let cached = matches!(&self.cached, Some((cached_salt, _)) if cached_salt == salt);
        if !cached {
            let password = self
                .password
                .as_ref()
                .ok_or_else(|| Error::Validation("session has been cleared".to_string()))?;
            debug!("deriving key for device salt");
            let key = derive_key(password.as_bytes(), salt)?;
            self.cached = Some((*salt, key));
        }

        match &self.cached {
            Some((_, key)) => Ok(key),
            None => Err(Error::Validation("session has been cleared".to_string())),
        }
    }

    /// Whether the session still holds a password.
    pub fn is_active(&self) -> bool {
        self.password.is_some()
    }

    /// Wipe the password and any cached key.
    pub fn clear(&mut self) {
        self.password = None;
        self.cached = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("active", &self.is_active())
            .field("key_cached", &self.cached.is_some())
            .finish()
    }
}
