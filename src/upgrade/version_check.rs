use reqwest::header::{ACCEPT, USER_AGENT};
use semver::Version;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

use crate::config::Settings;
use crate::constants::{AUTOCREW_VERSION, RELEASE_CHECK_TIMEOUT};
use crate::core::AutocrewError;

/// The subset of a published release descriptor AutoCrew reads.
///
/// Only `tag_name` is required; the other fields are logged when present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseDescriptor {
    /// Release tag, e.g. `"v2.2.0"`.
    pub tag_name: String,
    /// Release title.
    #[serde(default)]
    pub name: Option<String>,
    /// Web page of the release.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Whether the release is marked as a pre-release.
    #[serde(default)]
    pub prerelease: bool,
    /// Publication timestamp as reported by the endpoint.
    #[serde(default)]
    pub published_at: Option<String>,
}

/// Somewhere the latest release descriptor can be fetched from.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    /// Fetch the latest published release.
    async fn latest_release(&self) -> Result<ReleaseDescriptor, AutocrewError>;

    /// Short description for log messages (usually the URL).
    fn describe(&self) -> &str;
}

/// [`ReleaseSource`] that queries a GitHub-style `releases/latest` endpoint.
pub struct GitHubReleaseSource {
    url: String,
    user_agent: String,
    client: reqwest::Client,
}

impl GitHubReleaseSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: format!("autocrew/{AUTOCREW_VERSION}"),
            client: reqwest::Client::new(),
        }
    }
}

impl ReleaseSource for GitHubReleaseSource {
    async fn latest_release(&self) -> Result<ReleaseDescriptor, AutocrewError> {
        debug!("Fetching latest release from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/vnd.github+json")
            .timeout(RELEASE_CHECK_TIMEOUT)
            .send()
            .await
            .map_err(|e| AutocrewError::NetworkUnavailable {
                operation: format!("GET {}", self.url),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AutocrewError::NetworkUnavailable {
                operation: format!("GET {}", self.url),
                reason: format!("endpoint returned HTTP {status}"),
            });
        }

        let body = response.text().await.map_err(|e| AutocrewError::NetworkUnavailable {
            operation: format!("GET {}", self.url),
            reason: e.to_string(),
        })?;

        parse_release_descriptor(&body, &self.url)
    }

    fn describe(&self) -> &str {
        &self.url
    }
}

/// Decode a release descriptor from JSON.
pub fn parse_release_descriptor(
    body: &str,
    source_name: &str,
) -> Result<ReleaseDescriptor, AutocrewError> {
    serde_json::from_str(body).map_err(|e| AutocrewError::MalformedRemoteData {
        source_name: source_name.to_string(),
        reason: format!("invalid release descriptor: {e}"),
    })
}

/// Parse a release tag into a [`Version`].
///
/// Accepts a leading `v`/`V` and pads a missing minor or patch component
/// with zero, so `v2.2` parses as `2.2.0` and `3-rc.1` as `3.0.0-rc.1`.
pub fn parse_version_tag(tag: &str) -> Result<Version, semver::Error> {
    let tag = tag.trim();
    let tag = tag.strip_prefix(['v', 'V']).unwrap_or(tag);

    let split = tag.find(['-', '+']).unwrap_or(tag.len());
    let (core, suffix) = tag.split_at(split);
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => tag.to_string(),
    };

    Version::parse(&padded)
}

/// How the remote version relates to the local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComparison {
    /// The remote version is newer than the local one.
    Newer,
    /// Both have the same precedence.
    Same,
    /// The remote version is older than the local one.
    Older,
}

/// Compare by semantic-versioning precedence. Build metadata is ignored.
#[must_use]
pub fn compare(local: &Version, remote: &Version) -> VersionComparison {
    let precedence = |v: &Version| (v.major, v.minor, v.patch, v.pre.clone());
    match precedence(remote).cmp(&precedence(local)) {
        Ordering::Greater => VersionComparison::Newer,
        Ordering::Equal => VersionComparison::Same,
        Ordering::Less => VersionComparison::Older,
    }
}

/// Result of a startup version check. Never an error: failures become
/// [`VersionStatus::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    /// A newer release has been published.
    UpdateAvailable(Version),
    /// The running version is the latest (or newer than the latest).
    UpToDate,
    /// The check failed; the reason is shown to the user.
    Unknown(String),
}

impl VersionStatus {
    /// The newer version, if one is available.
    #[must_use]
    pub const fn newer_version(&self) -> Option<&Version> {
        match self {
            Self::UpdateAvailable(v) => Some(v),
            _ => None,
        }
    }

    /// One-line notice for the startup banner.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::UpdateAvailable(v) => {
                format!("An updated version of AutoCrew is available: {v}")
            }
            Self::UpToDate => "You are running the latest version of AutoCrew.".to_string(),
            Self::Unknown(reason) => format!("Error checking for the latest version: {reason}"),
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Queries a [`ReleaseSource`] and compares against the running version.
pub struct VersionChecker<S> {
    source: S,
    current: Version,
}

impl VersionChecker<GitHubReleaseSource> {
    /// Checker for the running binary against the configured endpoint.
    pub fn from_settings(settings: &Settings) -> Result<Self, AutocrewError> {
        let current = parse_version_tag(AUTOCREW_VERSION)?;
        Ok(Self::new(GitHubReleaseSource::new(&settings.releases_url), current))
    }
}

impl<S: ReleaseSource> VersionChecker<S> {
    pub const fn new(source: S, current: Version) -> Self {
        Self {
            source,
            current,
        }
    }

    #[must_use]
    pub const fn current_version(&self) -> &Version {
        &self.current
    }

    /// Fetch the latest release and parse its tag.
    pub async fn latest_version(&self) -> Result<Version, AutocrewError> {
        let release = self.source.latest_release().await?;
        debug!(
            "Latest release from {}: tag={} name={:?} prerelease={} published_at={:?}",
            self.source.describe(),
            release.tag_name,
            release.name,
            release.prerelease,
            release.published_at
        );

        parse_version_tag(&release.tag_name).map_err(|e| AutocrewError::MalformedRemoteData {
            source_name: self.source.describe().to_string(),
            reason: format!("tag '{}' is not a version: {e}", release.tag_name),
        })
    }

    /// Check for a newer release, downgrading every failure to
    /// [`VersionStatus::Unknown`].
    pub async fn check(&self) -> VersionStatus {
        match self.latest_version().await {
            Ok(latest) => match compare(&self.current, &latest) {
                VersionComparison::Newer => {
                    debug!("Update available: {} -> {}", self.current, latest);
                    VersionStatus::UpdateAvailable(latest)
                }
                VersionComparison::Same | VersionComparison::Older => {
                    debug!("Already on latest version ({} >= {})", self.current, latest);
                    VersionStatus::UpToDate
                }
            },
            Err(e) => {
                debug!("Update check failed: {}", e);
                VersionStatus::Unknown(e.to_string())
            }
        }
    }
}
