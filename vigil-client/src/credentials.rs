//! Credential providers
//!
//! The bearer token can rotate while a view is open, so it is never cached:
//! every request and every live-channel reconnect asks the provider again.

use std::path::PathBuf;

use tokio::runtime::{Handle, RuntimeFlavor};

/// Source of the current bearer token
pub trait CredentialProvider: Send + Sync {
    /// Token to use right now, if any
    fn current_token(&self) -> Option<String>;
}

/// Never supplies a token
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn current_token(&self) -> Option<String> {
        None
    }
}

/// A fixed token
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn current_token(&self) -> Option<String> {
        non_empty(self.0.clone())
    }
}

/// Reads the token from an environment variable on every call
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvToken {
    fn current_token(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(non_empty)
    }
}

/// Reads the token from a file on every call
///
/// A missing or unreadable file means no token. The read is a small
/// synchronous one; on a multi-threaded tokio runtime it runs under
/// `block_in_place` so other tasks keep moving.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for TokenFile {
    fn current_token(&self) -> Option<String> {
        let read = || std::fs::read_to_string(&self.path);
        let contents = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(read)
            }
            _ => read(),
        };

        match contents {
            Ok(contents) => non_empty(contents),
            Err(e) => {
                tracing::debug!("Token file {} unreadable: {}", self.path.display(), e);
                None
            }
        }
    }
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn current_token(&self) -> Option<String> {
        self().and_then(non_empty)
    }
}

fn non_empty(token: String) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
