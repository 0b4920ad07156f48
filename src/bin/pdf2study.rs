//! CLI binary for edgequake-pdf2study.
//!
//! A thin shim over the library crate: maps CLI flags to `StudyConfig`,
//! drives a `StudySession` through extraction and generation, and prints
//! the non-empty results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2study::{
    inspect, DocumentHandle, ExtractionProgressCallback, FlowOutcome, GenerationMode,
    ProgressCallback, SessionState, StudyConfig, StudyError, StudySession,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner until the page count is known, then
/// a page bar.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_extraction_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
    }

    fn on_page_extracted(&self, page_num: usize, total_pages: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{text_len:>6} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, total_chars: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages extracted  {}",
            green("✔"),
            bold(&total_pages.to_string()),
            dim(&format!("({total_chars} chars)")),
        );
    }
}

/// Spinner shown while the generation request is in flight.
fn generation_spinner(mode: GenerationMode) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix("Generating");
    bar.set_message(format!("mode: {mode}"));
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summary, quiz and assignments for a lecture PDF
  pdf2study lecture.pdf

  # Quiz only, written to a file
  pdf2study --mode quiz lecture.pdf -o quiz.md

  # Just extract the text
  pdf2study --extract-only lecture.pdf > lecture.txt

  # Edit the extracted text, then generate from the edited version
  pdf2study --extract-only lecture.pdf > lecture.txt
  $EDITOR lecture.txt
  pdf2study --text-file lecture.txt

  # From a URL, against a remote service
  pdf2study --endpoint https://study.example.com/api/generate https://example.com/slides.pdf

  # Page count only
  pdf2study --inspect-only lecture.pdf

GENERATION MODES:
  all           summary + quiz + assignments (default)
  summary       summary only
  quiz          quiz only
  assignments   assignment ideas only

ENVIRONMENT VARIABLES:
  PDF2STUDY_ENDPOINT      Generation service URL
  PDF2STUDY_MODE          Default generation mode
  PDFIUM_LIB_PATH         Path to libpdfium (default: system library)
  RUST_LOG                Log filter (overrides -v / -q)

EXIT CODES:
  0  success
  1  extraction or generation failed
  2  nothing to do (no document selected, empty text)
"#;

/// Turn a PDF into a summary, quiz and assignment ideas.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2study",
    version,
    about = "Turn a PDF into a summary, quiz and assignment ideas",
    long_about = "Extract the text of a PDF locally (pdfium), then send it to a generation \
service that returns a summary, a quiz and assignment ideas.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: Option<String>,

    /// Use the text in this file instead of extracting a PDF ("-" for stdin).
    #[arg(long, conflicts_with = "input")]
    text_file: Option<PathBuf>,

    /// What to generate.
    #[arg(short, long, env = "PDF2STUDY_MODE", value_enum, default_value = "all")]
    mode: GenerationMode,

    /// Generation service URL.
    #[arg(long, env = "PDF2STUDY_ENDPOINT", default_value = edgequake_pdf2study::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Write the result to this file instead of stdout.
    #[arg(short, long, env = "PDF2STUDY_OUTPUT")]
    output: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2STUDY_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Generation request timeout in seconds (default: none).
    #[arg(long, env = "PDF2STUDY_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "PDF2STUDY_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the extracted text and stop.
    #[arg(long, conflicts_with = "text_file")]
    extract_only: bool,

    /// Print page count only, no extraction.
    #[arg(long, conflicts_with = "text_file")]
    inspect_only: bool,

    /// Output the final session state as JSON.
    #[arg(long, env = "PDF2STUDY_JSON")]
    json: bool,

    /// Disable progress display.
    #[arg(long, env = "PDF2STUDY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2STUDY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2STUDY_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress display replaces INFO logs; -v brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let cli_progress = (show_progress && !cli.inspect_only && cli.text_file.is_none())
        .then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn ExtractionProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let Some(input) = cli.input.as_deref() else {
            return precondition(StudyError::NoDocumentSelected);
        };
        let handle = DocumentHandle::parse(input)?;
        let info = inspect(&handle, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:   {}", info.name);
            println!("Pages:  {}", info.page_count);
            println!("Bytes:  {}", info.byte_len);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let session = StudySession::new(config).context("Failed to create session")?;

    // ── Text buffer: supplied or extracted ───────────────────────────────
    if let Some(ref path) = cli.text_file {
        session.set_text(read_text_file(path).await?);
    } else {
        if let Some(ref input) = cli.input {
            session.select_document(DocumentHandle::parse(input)?);
        }
        let outcome = session.extract().await;
        if !matches!(outcome, Ok(FlowOutcome::Completed)) {
            if let Some(ref cb) = cli_progress {
                cb.bar.finish_and_clear();
            }
        }
        match outcome {
            Ok(FlowOutcome::Completed) => {}
            Ok(_) => return finish(&cli, &session.state()),
            Err(e) => return precondition(e),
        }

        if cli.extract_only {
            let state = session.state();
            if cli.json {
                print_json(&state)?;
            } else {
                write_output(cli.output.as_deref(), &state.text).await?;
            }
            return Ok(ExitCode::SUCCESS);
        }
    }

    // ── Generation ───────────────────────────────────────────────────────
    let spinner = show_progress.then(|| generation_spinner(session.state().mode));
    let outcome = session.generate().await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    if let Err(e) = outcome {
        return precondition(e);
    }

    let state = session.state();
    if state.error.is_none() {
        if cli.json {
            print_json(&state)?;
        } else {
            render_results(&cli, &state).await?;
        }
    }
    finish(&cli, &state)
}

/// Map CLI args to `StudyConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StudyConfig> {
    let mut builder = StudyConfig::builder()
        .endpoint(cli.endpoint.clone())
        .mode(cli.mode)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_text_file(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read text from stdin")?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read text from {:?}", path))
    }
}

/// Print non-empty sections, or the empty-state hint when there are none.
async fn render_results(cli: &Cli, state: &SessionState) -> Result<()> {
    if state.results.is_empty() {
        if !cli.quiet {
            eprintln!(
                "{} The service returned no content for mode '{}'.",
                cyan("ℹ"),
                state.mode
            );
        }
        return Ok(());
    }
    write_output(cli.output.as_deref(), &state.results.to_markdown()).await?;
    if let (Some(path), false) = (cli.output.as_ref(), cli.quiet) {
        eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
    }
    Ok(())
}

fn print_json(state: &SessionState) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("Failed to serialise session state")?;
    println!("{json}");
    Ok(())
}

/// Write to `path` atomically (temp file + rename), or to stdout.
async fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    let Some(path) = path else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(contents.as_bytes())
            .context("Failed to write to stdout")?;
        if !contents.ends_with('\n') {
            handle
                .write_all(b"\n")
                .context("Failed to write to stdout")?;
        }
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let tmp_path = temp_path_for(path);
    tokio::fs::write(&tmp_path, contents)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp_path))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Sibling of `path` with `.tmp` appended to the whole file name, so it never
/// collides with `path` itself.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Exit code 2 with the user-facing prompt.
fn precondition(e: StudyError) -> Result<ExitCode> {
    if !e.is_precondition() {
        return Err(e.into());
    }
    eprintln!("{} {}", cyan("⚠"), e);
    Ok(ExitCode::from(2))
}

/// Report the session error, if any, and pick the exit code.
fn finish(cli: &Cli, state: &SessionState) -> Result<ExitCode> {
    match state.error {
        Some(ref msg) => {
            if cli.json {
                print_json(state)?;
            }
            eprintln!("{} {}", red("✘"), msg);
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}
