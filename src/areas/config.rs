//! Author identity lookup
//!
//! Commits take an explicit identity when the caller has one. Otherwise the
//! stage asks an `IdentityResolver`, which the repository builds from the
//! environment (`GIT_AUTHOR_NAME`, `GIT_AUTHOR_EMAIL`) and then the
//! repository's `.git/config` (`user.name`, `user.email`).

use crate::artifacts::objects::commit::Identity;
use crate::errors::StageResult;
use std::path::Path;
use tracing::warn;

pub trait IdentityResolver {
    /// The identity to commit as, or `None` if this source has none
    fn resolve_identity(&self) -> StageResult<Option<Identity>>;
}

/// Identity from `GIT_AUTHOR_NAME` and `GIT_AUTHOR_EMAIL`
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvIdentity;

impl IdentityResolver for EnvIdentity {
    fn resolve_identity(&self) -> StageResult<Option<Identity>> {
        let name = std::env::var("GIT_AUTHOR_NAME").ok();
        let email = std::env::var("GIT_AUTHOR_EMAIL").ok();

        Ok(name.zip(email).map(|(name, email)| Identity::new(name, email)))
    }
}

/// Timestamp from `GIT_AUTHOR_DATE`, in RFC 2822 or `%Y-%m-%d %H:%M:%S %z`
pub fn author_date_from_env() -> Option<chrono::DateTime<chrono::FixedOffset>> {
    std::env::var("GIT_AUTHOR_DATE").ok().and_then(|date_str| {
        chrono::DateTime::parse_from_rfc2822(&date_str)
            .or_else(|_| chrono::DateTime::parse_from_str(&date_str, "%Y-%m-%d %H:%M:%S %z"))
            .ok()
    })
}

/// Identity from the `[user]` section of a git config file
#[derive(Debug, Clone)]
pub struct RepoConfig {
    path: Box<Path>,
}

impl RepoConfig {
    pub fn new(path: Box<Path>) -> Self {
        RepoConfig { path }
    }

    /// Read a `section.key` value; missing files and keys are `None`
    pub fn get(&self, key: &str) -> Option<String> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(&*self.path)
                    .format(config::FileFormat::Ini)
                    .required(false),
            )
            .build();

        match settings {
            Ok(settings) => settings.get_string(key).ok(),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "unable to parse git config");
                None
            }
        }
    }
}

impl IdentityResolver for RepoConfig {
    fn resolve_identity(&self) -> StageResult<Option<Identity>> {
        let name = self.get("user.name");
        let email = self.get("user.email");

        Ok(name.zip(email).map(|(name, email)| Identity::new(name, email)))
    }
}

/// First resolver that yields an identity wins
#[derive(Default)]
pub struct ChainedIdentity {
    resolvers: Vec<Box<dyn IdentityResolver>>,
}

impl ChainedIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, resolver: impl IdentityResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl IdentityResolver for ChainedIdentity {
    fn resolve_identity(&self) -> StageResult<Option<Identity>> {
        for resolver in &self.resolvers {
            if let Some(identity) = resolver.resolve_identity()? {
                return Ok(Some(identity));
            }
        }

        Ok(None)
    }
}

/// A fixed identity, for embedding callers that already know who commits
impl IdentityResolver for Identity {
    fn resolve_identity(&self) -> StageResult<Option<Identity>> {
        Ok(Some(self.clone()))
    }
}
