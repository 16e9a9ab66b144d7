//! Pipeline configuration.

use serde::Serialize;
use thiserror::Error;
use vellum_core::LanguageVersion;

/// Configuration errors. These invalidate the pipeline itself: one
/// diagnostic is computed per build and all file-level processing is
/// suppressed for the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("language version {version} is not supported by this compiler (latest: {latest})", latest = LanguageVersion::LATEST)]
    UnsupportedVersion { version: LanguageVersion },
    #[error("a root namespace is required")]
    MissingRootNamespace,
    #[error("'{namespace}' is not a valid root namespace")]
    InvalidRootNamespace { namespace: String },
}

/// Code generation toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct GenerationOptions {
    /// Omit the checksum header line.
    pub suppress_checksum: bool,
    /// Emit declarations only: type and component marker, no render body.
    pub suppress_primary_body: bool,
    /// Allow component tag names starting with any uppercase letter, not
    /// just ASCII.
    pub support_localized_names: bool,
}

/// The immutable configuration bundle for one pipeline.
///
/// Built once per (language-version, option-set) pair; engines are cached by
/// this value, so it is compared and hashed structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PipelineConfig {
    pub language_version: LanguageVersion,
    /// Namespace generated types are rooted under, e.g. `my_app`.
    pub root_namespace: String,
    pub options: GenerationOptions,
    /// When set, the whole generator is disabled for the build.
    pub suppressed: bool,
}

impl PipelineConfig {
    pub fn new(language_version: LanguageVersion, root_namespace: impl Into<String>) -> Self {
        Self {
            language_version,
            root_namespace: root_namespace.into(),
            options: GenerationOptions::default(),
            suppressed: false,
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the configuration. Called once per build cycle, before any
    /// file-level work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.language_version > LanguageVersion::LATEST
            || self.language_version < LanguageVersion::V1_0
        {
            return Err(ConfigError::UnsupportedVersion {
                version: self.language_version,
            });
        }
        if self.root_namespace.is_empty() {
            return Err(ConfigError::MissingRootNamespace);
        }
        let valid = self.root_namespace.split("::").all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        });
        if !valid {
            return Err(ConfigError::InvalidRootNamespace {
                namespace: self.root_namespace.clone(),
            });
        }
        Ok(())
    }
}
