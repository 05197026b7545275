//! AWS session setup.
//!
//! The profile comes from the command line, else `AWS_PROFILE`, else
//! `default`. Inside a snap package `HOME` points into the snap's private
//! area, so the shared `~/.aws` files are located from the real user home
//! instead and handed to aws-config explicitly.

use std::env;
use std::path::PathBuf;

use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::{BehaviorVersion, SdkConfig};
use tracing::debug;

/// Environment variable naming the shared-config profile.
pub const PROFILE_ENV: &str = "AWS_PROFILE";
/// Profile used when none is given.
pub const DEFAULT_PROFILE: &str = "default";
/// Environment variable overriding the DynamoDB endpoint.
pub const ENDPOINT_ENV: &str = "DYNOCSV_ENDPOINT_URL";

const SNAP_ENV: &str = "SNAP";
const SNAP_NAME_ENV: &str = "SNAP_NAME";
const SNAP_REVISION_ENV: &str = "SNAP_REVISION";
const HOME_ENV: &str = "HOME";

/// Where the process is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    /// A regular install.
    Native,
    /// Confined inside a snap package.
    Snap {
        /// `SNAP_NAME`.
        name: String,
        /// `SNAP_REVISION`.
        revision: String,
    },
}

impl Runtime {
    /// Detect the runtime from the process environment.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Any of `SNAP`, `SNAP_NAME` or `SNAP_REVISION` being set, even to an
    /// empty value, means a snap runtime.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let snap = lookup(SNAP_ENV);
        let name = lookup(SNAP_NAME_ENV);
        let revision = lookup(SNAP_REVISION_ENV);
        if snap.is_none() && name.is_none() && revision.is_none() {
            return Self::Native;
        }
        Self::Snap {
            name: name.unwrap_or_default(),
            revision: revision.unwrap_or_default(),
        }
    }

    /// The user's real home directory, given the `HOME` this process sees.
    #[must_use]
    pub fn user_home(&self, home: &str) -> String {
        match self {
            Self::Native => home.to_owned(),
            Self::Snap { name, revision } => {
                let suffix = format!("/snap/{name}/{revision}");
                home.strip_suffix(&suffix).unwrap_or(home).to_owned()
            }
        }
    }
}

/// Pick the profile: explicit flag, else `AWS_PROFILE`, else `default`.
#[must_use]
pub fn resolve_profile(flag: Option<&str>, env_profile: Option<&str>) -> String {
    flag.filter(|p| !p.is_empty())
        .or(env_profile)
        .unwrap_or(DEFAULT_PROFILE)
        .to_owned()
}

/// Everything needed to build an [`SdkConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Shared-config profile name.
    pub profile: String,
    /// Endpoint override, e.g. a local DynamoDB.
    pub endpoint_url: Option<String>,
    /// Detected runtime.
    pub runtime: Runtime,
    /// `HOME` as seen by the process.
    pub home: Option<String>,
}

impl SessionConfig {
    /// Resolve from command-line values and the process environment.
    #[must_use]
    pub fn from_env(profile: Option<&str>, endpoint_url: Option<String>) -> Self {
        let env_profile = env::var(PROFILE_ENV).ok();
        let endpoint_url = endpoint_url
            .or_else(|| env::var(ENDPOINT_ENV).ok())
            .filter(|u| !u.is_empty());
        Self {
            profile: resolve_profile(profile, env_profile.as_deref()),
            endpoint_url,
            runtime: Runtime::detect(),
            home: env::var(HOME_ENV).ok(),
        }
    }

    /// Directory holding the shared `config` and `credentials` files, when
    /// it has to be given explicitly.
    #[must_use]
    pub fn shared_files_dir(&self) -> Option<PathBuf> {
        match (&self.runtime, &self.home) {
            (Runtime::Snap { .. }, Some(home)) => {
                Some(PathBuf::from(self.runtime.user_home(home)).join(".aws"))
            }
            _ => None,
        }
    }

    /// Load the SDK configuration.
    pub async fn load(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).profile_name(&self.profile);

        if let Some(dir) = self.shared_files_dir() {
            debug!(dir = %dir.display(), "Reading shared AWS files from the real user home");
            let files = ProfileFiles::builder()
                .with_file(ProfileFileKind::Config, dir.join("config"))
                .with_file(ProfileFileKind::Credentials, dir.join("credentials"))
                .build();
            loader = loader.profile_files(files);
        }

        if let Some(url) = &self.endpoint_url {
            debug!(endpoint = %url, "Using endpoint override");
            loader = loader.endpoint_url(url);
        }

        debug!(profile = %self.profile, "Loading AWS configuration");
        loader.load().await
    }
}
