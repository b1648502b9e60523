//! CLI binary for okmd.
//!
//! A thin shim over the library crate that maps CLI flags to `PasteConfig`,
//! wires the production collaborators together and reports the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use okmd::{
    load_or_create_installation_id, paste, Caret, CaptureRequest, DocumentSink,
    HelperClipboardSource, InsertionSink, PasteConfig, PasteContext, PasteOutcome,
    PasteProgressCallback, ProgressCallback, QiniuPublisher, Stage, StateStore, StdoutSink,
    UploadConfig,
};
use std::io;
use std::path::PathBuf;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the current pipeline stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PasteProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        if stage.is_terminal() {
            self.bar.finish_and_clear();
        } else {
            self.bar.set_message(format!("{stage}…"));
        }
    }

    fn on_failed(&self, _stage: Stage, _error: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Paste the clipboard image into note.md at line 12, column 1
  okmd docs/note.md --caret 12:1

  # Name the image after the selected text
  okmd docs/note.md --selection diagram-1 --caret 12:1

  # Let the editor insert the link itself
  okmd docs/note.md --print

CLIPBOARD HELPERS:
  Windows  powershell  (built in)
  macOS    osascript   (built in)
  Linux    sh + xclip  (install xclip first)

ENVIRONMENT VARIABLES:
  OKMD_LOCAL_PATH         Image directory, absolute or relative to the document
  OKMD_ACCESS_KEY         Storage access key
  OKMD_SECRET_KEY         Storage secret key
  OKMD_BUCKET             Target bucket
  OKMD_DOMAIN             Public domain of the bucket
  OKMD_UPLOAD_URL         Upload endpoint
  OKMD_KEY_PREFIX         Prefix for uploaded object keys
  OKMD_STATE_FILE         Override the state file location
  OKMD_HELPER_CACHE_DIR   Override where helper scripts are cached
"#;

/// Paste the clipboard image into a Markdown document as an uploaded link.
#[derive(Parser, Debug)]
#[command(
    name = "okmd",
    version,
    about = "Paste the clipboard image into a Markdown document as an uploaded link",
    long_about = "Save the image on the system clipboard next to a Markdown document, upload it \
to object storage, and insert a ![name](url) link at the caret.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// The Markdown document being edited. Must exist on disk.
    document: PathBuf,

    /// Selected text; used as the image name (letters, digits, '_', '-', '.').
    #[arg(short, long)]
    selection: Option<String>,

    /// Caret position as LINE:COLUMN (1-based). Default: end of document.
    #[arg(long)]
    caret: Option<Caret>,

    /// Print the link on stdout instead of writing it into the document.
    #[arg(long)]
    print: bool,

    /// Image directory, absolute or relative to the document.
    #[arg(long, env = "OKMD_LOCAL_PATH", default_value = okmd::config::DEFAULT_LOCAL_PATH)]
    local_path: String,

    /// Use this clipboard helper script instead of the built-in one.
    #[arg(long, env = "OKMD_HELPER_SCRIPT")]
    helper_script: Option<PathBuf>,

    /// Seconds to wait for the clipboard helper (0 = wait indefinitely).
    #[arg(long, env = "OKMD_CAPTURE_TIMEOUT", default_value_t = 30)]
    capture_timeout: u64,

    /// Storage access key.
    #[arg(long, env = "OKMD_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Storage secret key.
    #[arg(long, env = "OKMD_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Target bucket.
    #[arg(long, env = "OKMD_BUCKET")]
    bucket: Option<String>,

    /// Public domain serving the bucket.
    #[arg(long, env = "OKMD_DOMAIN")]
    domain: Option<String>,

    /// Upload endpoint.
    #[arg(long, env = "OKMD_UPLOAD_URL", default_value = okmd::config::DEFAULT_UPLOAD_URL)]
    upload_url: String,

    /// Prefix for uploaded object keys.
    #[arg(long, env = "OKMD_KEY_PREFIX")]
    key_prefix: Option<String>,

    /// HTTP upload timeout in seconds.
    #[arg(long, env = "OKMD_UPLOAD_TIMEOUT", default_value_t = 60)]
    upload_timeout: u64,

    /// State file holding the installation id.
    #[arg(long, env = "OKMD_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "OKMD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OKMD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OKMD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep library logs at
    // warn while it is active.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PasteProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Installation id ──────────────────────────────────────────────────
    let store = StateStore::new(
        cli.state_file
            .clone()
            .unwrap_or_else(StateStore::default_path),
    );
    let installation_id = load_or_create_installation_id(&store)
        .await
        .context("Failed to load installation id")?;

    // ── Collaborators ────────────────────────────────────────────────────
    let document = std::path::absolute(&cli.document)
        .with_context(|| format!("Invalid document path {:?}", cli.document))?;

    let source = HelperClipboardSource::from_config(&config)
        .context("Failed to prepare the clipboard helper")?;
    let publisher =
        QiniuPublisher::new(config.upload.clone()).context("Upload is not configured")?;
    let sink: Arc<dyn InsertionSink> = if cli.print {
        Arc::new(StdoutSink)
    } else {
        Arc::new(DocumentSink::new(&document, cli.caret))
    };

    let ctx = PasteContext::new(Arc::new(source), Arc::new(publisher), sink, installation_id);

    // ── Run pipeline ─────────────────────────────────────────────────────
    let request = CaptureRequest::new(Some(document), cli.selection.clone(), &config);
    let outcome = match paste(&ctx, &request, &config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(1);
        }
    };

    if cli.quiet {
        return Ok(());
    }

    match outcome {
        PasteOutcome::Empty => {
            eprintln!("{} There is no image in the clipboard.", cyan("ℹ"));
        }
        PasteOutcome::Published {
            upload,
            delete_warning,
            ..
        } => {
            eprintln!("{} Upload success  {}", green("✔"), dim(&upload.url));
            if let Some(warning) = delete_warning {
                eprintln!("{} {}", cyan("⚠"), warning);
            }
        }
    }

    Ok(())
}

/// Map CLI args to `PasteConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PasteConfig> {
    let upload = UploadConfig {
        access_key: cli.access_key.clone().unwrap_or_default(),
        secret_key: cli.secret_key.clone().unwrap_or_default(),
        bucket: cli.bucket.clone().unwrap_or_default(),
        domain: cli.domain.clone().unwrap_or_default(),
        upload_url: cli.upload_url.clone(),
        key_prefix: cli.key_prefix.clone(),
        timeout_secs: cli.upload_timeout,
    };

    let capture_timeout = (cli.capture_timeout > 0).then_some(cli.capture_timeout);

    let mut builder = PasteConfig::builder()
        .local_path(cli.local_path.clone())
        .capture_timeout_secs(capture_timeout)
        .upload(upload);

    if let Some(ref script) = cli.helper_script {
        builder = builder.helper_script(script.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
