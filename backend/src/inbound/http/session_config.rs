//! Session key loading.
//!
//! The cookie signing key is read from a file at startup. A missing file may
//! fall back to a generated key in development; a file that exists but holds
//! too few bytes is always rejected.

use std::path::{Path, PathBuf};

use actix_web::cookie::Key;
use tracing::warn;
use zeroize::Zeroizing;

/// Fewest key file bytes accepted.
pub const SESSION_KEY_MIN_LEN: usize = 64;

/// Errors raised while loading the session key.
#[derive(Debug, thiserror::Error)]
pub enum SessionKeyError {
    /// Reading the session key file failed.
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The session key file exists but holds too few bytes.
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
}

/// Derive the session key from `path`.
///
/// When the file cannot be read and `allow_ephemeral` is set, a random key is
/// generated instead; sessions then do not survive a restart.
///
/// # Errors
///
/// [`SessionKeyError::KeyTooShort`] for files under
/// [`SESSION_KEY_MIN_LEN`] bytes, and [`SessionKeyError::KeyRead`] for
/// unreadable files when no ephemeral key is allowed.
pub fn load_session_key(path: &Path, allow_ephemeral: bool) -> Result<Key, SessionKeyError> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let bytes = Zeroizing::new(bytes);
            if bytes.len() < SESSION_KEY_MIN_LEN {
                return Err(SessionKeyError::KeyTooShort {
                    path: path.to_path_buf(),
                    length: bytes.len(),
                    min_len: SESSION_KEY_MIN_LEN,
                });
            }
            Ok(Key::derive_from(&bytes))
        }
        Err(error) if allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using temporary session key (dev only)"
            );
            Ok(Key::generate())
        }
        Err(source) => Err(SessionKeyError::KeyRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}
