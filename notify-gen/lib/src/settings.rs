//! Project settings loaded from `notify-gen.toml`.
//!
//! ```toml
//! [markers]
//! include = "Notify"
//! exclude = "NonNotify"
//!
//! [defaults]
//! naming_convention = "LeadingUnderscore"
//! compare_method = "EqualityComparer"
//! ```
//!
//! Every key is optional. A missing file means [`GeneratorSettings::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{CompareMethod, GenerationConfig, NamingConvention};
use crate::conventions::{ATTRIBUTE_SUFFIX, DEFAULT_EXCLUDE_MARKER, DEFAULT_INCLUDE_MARKER};
use crate::error::NotifyGenError;

/// Settings that shape marker recognition and the library-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub markers: MarkerNames,
    pub defaults: Defaults,
}

/// Short names of the inclusion and exclusion markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerNames {
    pub include: String,
    pub exclude: String,
}

impl Default for MarkerNames {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE_MARKER.to_string(),
            exclude: DEFAULT_EXCLUDE_MARKER.to_string(),
        }
    }
}

impl MarkerNames {
    /// Type identity of the inclusion marker (`NotifyAttribute`).
    pub fn include_type(&self) -> String {
        with_attribute_suffix(&self.include)
    }

    /// Type identity of the exclusion marker (`NonNotifyAttribute`).
    pub fn exclude_type(&self) -> String {
        with_attribute_suffix(&self.exclude)
    }
}

/// Library-wide defaults, the last level of configuration resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub naming_convention: NamingConvention,
    pub compare_method: CompareMethod,
}

impl GeneratorSettings {
    /// File name looked up by [`GeneratorSettings::discover`].
    pub const FILE_NAME: &'static str = "notify-gen.toml";

    /// Create settings with the built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inclusion marker short name.
    pub fn include_marker(mut self, name: impl Into<String>) -> Self {
        self.markers.include = name.into();
        self
    }

    /// Set the exclusion marker short name.
    pub fn exclude_marker(mut self, name: impl Into<String>) -> Self {
        self.markers.exclude = name.into();
        self
    }

    /// Set the library-wide default naming convention.
    pub fn naming_convention(mut self, convention: NamingConvention) -> Self {
        self.defaults.naming_convention = convention;
        self
    }

    /// Set the library-wide default compare method.
    pub fn compare_method(mut self, method: CompareMethod) -> Self {
        self.defaults.compare_method = method;
        self
    }

    /// The defaults as a generation config.
    pub fn generation_defaults(&self) -> GenerationConfig {
        GenerationConfig {
            naming_convention: self.defaults.naming_convention,
            compare_method: self.defaults.compare_method,
        }
    }

    /// Parses settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads settings from a TOML file.
    ///
    /// ## Errors
    /// Returns an error if the file cannot be read or is not valid settings TOML.
    pub fn load(path: &Path) -> Result<Self, NotifyGenError> {
        let content = std::fs::read_to_string(path).map_err(|source| NotifyGenError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content).map_err(|source| NotifyGenError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `notify-gen.toml` from `dir`, falling back to the defaults when
    /// the file does not exist.
    ///
    /// ## Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn discover(dir: &Path) -> Result<Self, NotifyGenError> {
        let path = dir.join(Self::FILE_NAME);
        if !path.is_file() {
            tracing::debug!(dir = %dir.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(path = %path.display(), "loading settings");
        Self::load(&path)
    }
}

fn with_attribute_suffix(name: &str) -> String {
    if name.ends_with(ATTRIBUTE_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{ATTRIBUTE_SUFFIX}")
    }
}
