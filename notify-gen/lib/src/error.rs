use std::path::PathBuf;

use thiserror::Error;

/// Errors emitted by notify-gen at the host boundary.
///
/// The analysis core never fails: "not a target", "up to date" and "needs
/// regeneration" are all ordinary values. Errors only come from reading,
/// parsing and rewriting source files and from loading settings.
#[derive(Debug, Error)]
pub enum NotifyGenError {
    #[error("Failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported language for `{path}`")]
    UnsupportedLanguage { path: PathBuf },

    #[error("Failed to parse `{path}`")]
    ParseFailed { path: PathBuf },

    #[error("Invalid settings in `{path}`: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write output file `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Generated edits for class `{class}` overlap at byte {offset}")]
    OverlappingEdits { class: String, offset: usize },
}
