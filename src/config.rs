//! Configuration types for extraction and generation.
//!
//! Everything a [`crate::session::StudySession`] needs to know is collected in
//! [`StudyConfig`], built via its [`StudyConfigBuilder`]. The library never
//! reads environment variables itself; the CLI maps flags and env vars onto
//! this struct.

use crate::error::StudyError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Generation endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/generate";

/// Configuration for a study session.
///
/// Built via [`StudyConfig::builder()`] or using [`StudyConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2study::{GenerationMode, StudyConfig};
///
/// let config = StudyConfig::builder()
///     .endpoint("http://localhost:8000/api/generate")
///     .mode(GenerationMode::Quiz)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StudyConfig {
    /// URL of the generation service. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Mode the session starts in. Default: [`GenerationMode::All`].
    pub mode: GenerationMode,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Path to a libpdfium shared library. If None, the system library is used.
    pub pdfium_library: Option<PathBuf>,

    /// Whole-request timeout for the generation call in seconds.
    ///
    /// `None` leaves timing entirely to the transport, which is what the
    /// generation flow expects by default.
    pub request_timeout_secs: Option<u64>,

    /// Download timeout for URL document handles in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-page extraction events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            mode: GenerationMode::default(),
            password: None,
            pdfium_library: None,
            request_timeout_secs: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyConfig")
            .field("endpoint", &self.endpoint)
            .field("mode", &self.mode)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library", &self.pdfium_library)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl StudyConfig {
    /// Create a new builder for `StudyConfig`.
    pub fn builder() -> StudyConfigBuilder {
        StudyConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StudyConfig`].
#[derive(Debug)]
pub struct StudyConfigBuilder {
    config: StudyConfig,
}

impl StudyConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn mode(mut self, mode: GenerationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudyConfig, StudyError> {
        let c = &self.config;
        let url = reqwest::Url::parse(&c.endpoint).map_err(|e| {
            StudyError::InvalidConfig(format!("endpoint '{}' is not a valid URL: {}", c.endpoint, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(StudyError::InvalidConfig(format!(
                "endpoint must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(StudyError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(StudyError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which artefacts the generation service should produce.
///
/// Serialised verbatim into the request body; the service alone decides what
/// each mode means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Summary, quiz and assignments. (default)
    #[default]
    All,
    /// Summary only.
    Summary,
    /// Quiz only.
    Quiz,
    /// Assignment ideas only.
    Assignments,
}

impl GenerationMode {
    /// Wire value of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::All => "all",
            GenerationMode::Summary => "summary",
            GenerationMode::Quiz => "quiz",
            GenerationMode::Assignments => "assignments",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(GenerationMode::All),
            "summary" => Ok(GenerationMode::Summary),
            "quiz" => Ok(GenerationMode::Quiz),
            "assignments" => Ok(GenerationMode::Assignments),
            other => Err(StudyError::InvalidConfig(format!(
                "unknown generation mode '{other}' (expected all, summary, quiz or assignments)"
            ))),
        }
    }
}
