//! Change-notification property generator.
//!
//! Scans a class declaration for properties marked for change notification and
//! plans the generated backing members: one backing field and one cached
//! event-args value per property, a `PropertyChanged` event, and a shared
//! comparison-guarded `SetProperty` helper. Regeneration is idempotent: a class
//! whose generated region already matches its marked properties is reported as
//! up to date and left alone.
//!
//! ## Pipeline
//!
//! ```text
//! ClassDecl ──► marker::MarkerResolver ──► staleness::detect ──► plan::build ──► emit
//!                    (selection + config)      (UpToDate | Stale)     (EditPlan)
//! ```
//!
//! [`analyzer::Generator`] runs the whole pipeline for one class. The
//! [`csharp`] module is the host: it lowers C# source into the [`syntax`]
//! model with tree-sitter and applies plans back to the source text.
//!
//! ## Example
//!
//! ```no_run
//! use notify_gen_lib::csharp::{SourceFile, regenerate};
//! use notify_gen_lib::{Generator, GeneratorSettings};
//!
//! let file = SourceFile::open("ViewModel.cs").unwrap();
//! let generator = Generator::new(GeneratorSettings::default());
//! let report = regenerate(&file, &generator).unwrap();
//! if let Some(source) = report.rewritten {
//!     println!("{source}");
//! }
//! ```

pub mod analyzer;
pub mod config;
pub mod conventions;
pub mod csharp;
pub mod emit;
pub mod error;
pub mod marker;
pub mod plan;
pub mod region;
pub mod settings;
pub mod staleness;
pub mod syntax;

#[cfg(test)]
pub(crate) mod test_utils;

pub use analyzer::{Analysis, Diagnostic, Generator};
pub use config::{CompareMethod, GenerationConfig, NamingConvention, field_name};
pub use error::NotifyGenError;
pub use marker::{MarkerResolver, MarkerType, NameResolver, Resolution, SymbolResolver};
pub use plan::EditPlan;
pub use settings::GeneratorSettings;
pub use staleness::{StaleReason, Staleness};
pub use syntax::{ClassDecl, CodeRange, Member, MemberId, MemberKind};
