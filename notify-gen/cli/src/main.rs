use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{Generator as CompletionGenerator, Shell};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use notify_gen_lib::csharp::{
    self, ClassReport, ClassStatus, EXTENSION, FileReport, SourceFile, SourceSymbols,
};
use notify_gen_lib::{Generator, GeneratorSettings, NotifyGenError};
use owo_colors::{OwoColorize, Style};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "notify-gen",
    version,
    about = "Generates change-notification plumbing for marked C# properties"
)]
struct Cli {
    /// Glob patterns for files to ignore
    #[arg(long, value_name = "GLOB", global = true)]
    ignore: Vec<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors (plain text output)
    #[arg(long, global = true)]
    plain: bool,

    /// Settings file (defaults to ./notify-gen.toml when present)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Returns the output format based on flags.
    fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.plain {
            OutputFormat::Plain
        } else {
            OutputFormat::Pretty
        }
    }
}

/// Arguments for the check command
#[derive(clap::Args, Debug, Clone)]
struct CheckArgs {
    /// Glob patterns for files to include
    #[arg(value_name = "GLOB", num_args = 1..)]
    inputs: Vec<String>,
}

/// Arguments for the fix command
#[derive(clap::Args, Debug, Clone)]
struct FixArgs {
    /// Glob patterns for files to include
    #[arg(value_name = "GLOB", num_args = 1..)]
    inputs: Vec<String>,

    /// Print the regenerated sources instead of writing them
    #[arg(long)]
    dry_run: bool,
}

/// Arguments for the completions command
#[derive(clap::Args, Debug, Clone)]
struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Report classes whose generated members are out of date
    Check(CheckArgs),
    /// Regenerate out-of-date classes in place
    Fix(FixArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Command {
    /// Returns the input glob patterns from the subcommand.
    fn inputs(&self) -> &[String] {
        match self {
            Self::Check(args) => &args.inputs,
            Self::Fix(args) => &args.inputs,
            Self::Completions(_) => &[],
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    NotifyGen(#[from] NotifyGenError),

    #[error("Invalid file pattern: {0}")]
    Ignore(#[from] ignore::Error),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to resolve the working directory: {0}")]
    CurrentDir(std::io::Error),

    #[error("No C# source files matched under `{}`", path.display())]
    NoSourceFiles { path: PathBuf },
}

/// What the run found, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Clean,
    NeedsRegeneration,
}

#[derive(Debug, Clone, Copy)]
enum OutputFormat {
    /// Colored output (default when TTY)
    Pretty,
    /// Plain text without colors
    Plain,
    /// JSON output
    Json,
}

/// Configuration for output styling.
struct OutputConfig {
    use_colors: bool,
}

impl OutputConfig {
    fn new(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Pretty => {
                let no_color = std::env::var("NO_COLOR").is_ok();
                let is_tty = std::io::stdout().is_terminal();
                Self {
                    use_colors: !no_color && is_tty,
                }
            }
            OutputFormat::Plain | OutputFormat::Json => Self { use_colors: false },
        }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.use_colors {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    // RUST_LOG wins over -v flags
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,notify_gen_lib=info,notify_gen=info".to_string(),
            2 => "info,notify_gen_lib=debug,notify_gen=debug".to_string(),
            _ => "debug,notify_gen_lib=trace,notify_gen=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Completions need no files and no logging
    if let Command::Completions(args) = &cli.command {
        print_completions(args.shell, &mut Cli::command());
        return ExitCode::SUCCESS;
    }

    init_tracing(cli.verbose, cli.log_json);

    match run(&cli) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::NeedsRegeneration) => ExitCode::from(1),
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<Outcome, CliError> {
    let root_dir = std::env::current_dir().map_err(CliError::CurrentDir)?;
    let settings = match &cli.config {
        Some(path) => GeneratorSettings::load(path)?,
        None => GeneratorSettings::discover(&root_dir)?,
    };
    let generator = Generator::new(settings);

    let files = collect_files(&root_dir, cli.command.inputs(), &cli.ignore)?;
    tracing::info!(files = files.len(), "collected source files");

    let sources = files
        .iter()
        .map(SourceFile::open)
        .collect::<Result<Vec<_>, _>>()?;

    // Marker declarations may live in any of the files.
    let mut symbols = SourceSymbols::new();
    for source in &sources {
        symbols.add_file(source);
    }

    let output_format = cli.output_format();
    let output_config = OutputConfig::new(output_format);

    match &cli.command {
        Command::Check(_) => {
            let reports = sources
                .iter()
                .map(|source| csharp::check(source, &generator, &symbols))
                .filter(|report| !report.classes.is_empty())
                .collect::<Vec<_>>();

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
                OutputFormat::Pretty | OutputFormat::Plain => {
                    render_check(&reports, &output_config, &root_dir);
                }
            }

            if reports.iter().any(FileReport::needs_regeneration) {
                Ok(Outcome::NeedsRegeneration)
            } else {
                Ok(Outcome::Clean)
            }
        }
        Command::Fix(args) => {
            let mut reports = Vec::new();
            for source in &sources {
                let report = csharp::regenerate_with(source, &generator, &symbols)?;
                if let Some(rewritten) = &report.rewritten
                    && !args.dry_run
                {
                    write_atomic(&report.file, rewritten)?;
                    tracing::info!(file = %report.file.display(), "rewrote file");
                }
                if !report.classes.is_empty() {
                    reports.push(report);
                }
            }

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
                OutputFormat::Pretty | OutputFormat::Plain => {
                    render_fix(&reports, &output_config, &root_dir, args.dry_run);
                }
            }

            Ok(Outcome::Clean)
        }
        Command::Completions(_) => Ok(Outcome::Clean),
    }
}

/// Prints shell completions to stdout.
fn print_completions<G: CompletionGenerator>(generator: G, cmd: &mut clap::Command) {
    clap_complete::generate(generator, cmd, cmd.get_name().to_string(), &mut std::io::stdout());
}

fn collect_files(
    root: &Path,
    inputs: &[String],
    ignores: &[String],
) -> Result<Vec<PathBuf>, CliError> {
    let mut overrides = OverrideBuilder::new(root);
    for input in inputs {
        overrides.add(input)?;
    }
    for ignore in ignores {
        overrides.add(&format!("!{ignore}"))?;
    }

    let overrides = overrides.build()?;
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .standard_filters(true)
        .hidden(false)
        .overrides(overrides)
        .build();

    for entry in walker {
        let entry = entry?;

        let is_file = entry
            .file_type()
            .map(|file| file.is_file())
            .unwrap_or(false);
        let is_csharp = entry
            .path()
            .extension()
            .is_some_and(|extension| extension == EXTENSION);

        if is_file && is_csharp {
            files.push(entry.into_path());
        }
    }

    files.sort();

    if files.is_empty() {
        return Err(CliError::NoSourceFiles {
            path: root.to_path_buf(),
        });
    }

    Ok(files)
}

/// Writes `content` to a sibling temp file, then renames it over `path`.
fn write_atomic(path: &Path, content: &str) -> Result<(), NotifyGenError> {
    let temp_path = path.with_extension("cs.tmp");
    fs::write(&temp_path, content).map_err(|source| NotifyGenError::Write {
        path: temp_path.clone(),
        source,
    })?;

    fs::rename(&temp_path, path).map_err(|source| NotifyGenError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(|relative| relative.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

fn status_label(class: &ClassReport) -> (String, Style) {
    match (&class.status, &class.reason) {
        (ClassStatus::UpToDate, _) => ("up to date".to_string(), Style::new().green()),
        (ClassStatus::NeedsRegeneration, Some(reason)) => (
            format!("needs regeneration ({reason})"),
            Style::new().red().bold(),
        ),
        (ClassStatus::NeedsRegeneration, None) => {
            ("needs regeneration".to_string(), Style::new().red().bold())
        }
    }
}

fn render_check(reports: &[FileReport], config: &OutputConfig, root: &Path) {
    let mut total = 0;
    let mut stale = 0;

    for report in reports {
        let file = display_path(&report.file, root);
        for class in &report.classes {
            total += 1;
            if class.status == ClassStatus::NeedsRegeneration {
                stale += 1;
            }

            let (label, style) = status_label(class);
            let location = format!("{file}:{}", class.line);
            println!(
                "{} {} {}",
                config.paint(&location, Style::new().blue()),
                config.paint(&class.class, Style::new().magenta()),
                config.paint(&label, style)
            );
        }
    }

    let summary = format!("{total} class(es) checked, {stale} need regeneration");
    println!("{}", config.paint(&summary, Style::new().dimmed()));
}

fn render_fix(reports: &[FileReport], config: &OutputConfig, root: &Path, dry_run: bool) {
    let mut rewritten = 0;

    for report in reports {
        let Some(source) = &report.rewritten else {
            continue;
        };
        rewritten += 1;

        let file = display_path(&report.file, root);
        let classes = report
            .classes
            .iter()
            .filter(|class| class.status == ClassStatus::NeedsRegeneration)
            .map(|class| class.class.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        if dry_run {
            println!("{}", config.paint(&format!("// {file}"), Style::new().dimmed()));
            println!("{source}");
        } else {
            println!(
                "{} {} ({classes})",
                config.paint("fixed", Style::new().green().bold()),
                config.paint(&file, Style::new().blue())
            );
        }
    }

    let skipped = reports
        .iter()
        .filter(|report| report.rewritten.is_none() && report.needs_regeneration())
        .count();
    if skipped > 0 {
        let warning = format!("{skipped} file(s) left unchanged because they do not parse cleanly");
        println!("{}", config.paint(&warning, Style::new().yellow()));
    }

    let verb = if dry_run { "would rewrite" } else { "rewrote" };
    let summary = format!("{verb} {rewritten} file(s)");
    println!("{}", config.paint(&summary, Style::new().dimmed()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Person.cs");
        fs::write(&path, "// old").unwrap();

        write_atomic(&path, "// new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "// new");
        assert!(!path.with_extension("cs.tmp").exists());
    }

    #[test]
    fn write_atomic_reports_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing/Person.cs");

        let error = write_atomic(&path, "// new").unwrap_err();
        assert!(matches!(error, NotifyGenError::Write { .. }));
    }

    #[test]
    fn collect_files_keeps_only_csharp() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Person.cs"), "class Person {}").unwrap();
        fs::write(dir.path().join("notes.md"), "# notes").unwrap();
        fs::create_dir(dir.path().join("obj")).unwrap();
        fs::write(dir.path().join("obj/Generated.cs"), "class Generated {}").unwrap();

        let files = collect_files(
            dir.path(),
            &["**/*".to_string()],
            &["obj/**".to_string()],
        )
        .unwrap();

        assert_eq!(files, vec![dir.path().join("Person.cs")]);
    }

    #[test]
    fn collect_files_errors_when_nothing_matches() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.md"), "# notes").unwrap();

        let error = collect_files(dir.path(), &["*.cs".to_string()], &[]).unwrap_err();
        assert!(matches!(error, CliError::NoSourceFiles { .. }));
    }

    #[test]
    fn display_path_is_relative_to_root() {
        let root = Path::new("/work");
        assert_eq!(display_path(Path::new("/work/src/A.cs"), root), "src/A.cs");
        assert_eq!(display_path(Path::new("/elsewhere/A.cs"), root), "/elsewhere/A.cs");
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["notify-gen", "fix", "*.cs", "--dry-run", "--plain", "-vv"])
            .unwrap();

        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.output_format(), OutputFormat::Plain));
        assert!(matches!(cli.command, Command::Fix(FixArgs { dry_run: true, .. })));
    }
}
