//! CLI binary for edgequake-pdf-translate.
//!
//! Submits one document to an in-process `TranslationService`, follows the
//! job with a progress bar, and writes the translated PDF. Ctrl-C cancels
//! the job.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_pdf_translate::{
    Job, JobRequest, JobStage, JobStatus, OllamaChatBackend, OllamaConfig, PdfiumExtractor,
    ProviderBackend, ServiceConfig, TranslationBackend, TranslationService,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
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

// ── Job progress display ─────────────────────────────────────────────────────

/// Progress bar driven by job snapshots. The bar starts as a spinner and
/// switches to a page counter once the job knows how many pages it has.
struct JobProgress {
    bar: Option<ProgressBar>,
    sized: bool,
}

impl JobProgress {
    fn new(enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let bar = ProgressBar::new(0);
            let spinner_style =
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
            bar.set_style(spinner_style);
            bar.set_prefix("Queued");
            bar.set_message("waiting for a job slot…");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Self { bar, sized: false }
    }

    fn update(&mut self, job: &Job) {
        let Some(bar) = &self.bar else { return };

        if !self.sized && job.total_elements > 0 {
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
            bar.set_length(job.total_elements as u64);
            bar.set_style(style);
            self.sized = true;
        }

        bar.set_position(job.translated_elements as u64);
        let (prefix, msg) = match job.stage {
            JobStage::Queued => ("Queued", "waiting for a job slot…"),
            JobStage::ExtractText => ("Extracting", "reading page text…"),
            JobStage::Translate => ("Translating", ""),
            JobStage::RenderPdf => ("Rendering", "building translated PDF…"),
            JobStage::Completed | JobStage::Failed | JobStage::Cancelled => ("Done", ""),
        };
        bar.set_prefix(prefix);
        bar.set_message(msg);
    }

    fn println(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # English → Brazilian Portuguese (the defaults), first 10 pages
  pdf-translate paper.pdf

  # Pages 3-7 into French, explicit output
  pdf-translate --target fr --start-page 3 --end-page 7 paper.pdf -o paper.fr.pdf

  # Use a remote Ollama server and model
  pdf-translate --base-url http://gpu-box:11434 --model gemma3:12b paper.pdf

  # Use any edgequake-llm provider instead of /api/chat
  pdf-translate --backend provider --provider openai --model gpt-4.1-mini paper.pdf

  # Machine-readable job summary
  pdf-translate --json paper.pdf > job.json

LANGUAGES:
  en  pt-BR  es  fr  de  it  ja  zh-Hans   (other codes are passed to the model verbatim)

ENVIRONMENT VARIABLES:
  TRANSLATION_LLM_BASE_URL    /api/chat server (default http://localhost:11534)
  TRANSLATION_LLM_MODEL_NAME  /api/chat model (default translategemma)
  EDGEQUAKE_LLM_PROVIDER      Provider for --backend provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL             Model for --backend provider
  OPENAI_API_KEY              OpenAI API key (provider backend)
  PDFIUM_LIB_PATH             libpdfium file or directory
  RUST_LOG                    Overrides -q / -v log filtering
"#;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BackendArg {
    /// Ollama-style POST /api/chat.
    Ollama,
    /// Any edgequake-llm provider.
    Provider,
}

/// Translate a PDF page by page through a language model.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-translate",
    version,
    about = "Translate a PDF page by page through a language model",
    long_about = "Extract the text of each page, translate it with a language model, and \
write the translations into a new plain-text PDF. At most --max-pages pages are translated \
per run.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to translate.
    input: PathBuf,

    /// Write the translated PDF here. Default: `<input>.<target>.pdf` next to the input.
    #[arg(short, long, env = "PDF_TRANSLATE_OUTPUT")]
    output: Option<PathBuf>,

    /// Source language code.
    #[arg(long, env = "PDF_TRANSLATE_SOURCE", default_value = "en")]
    source: String,

    /// Target language code.
    #[arg(long, env = "PDF_TRANSLATE_TARGET", default_value = "pt-BR")]
    target: String,

    /// First page to translate (1-indexed).
    #[arg(long, allow_negative_numbers = true)]
    start_page: Option<i64>,

    /// Last page to translate (1-indexed, inclusive).
    #[arg(long, allow_negative_numbers = true)]
    end_page: Option<i64>,

    /// Translation backend.
    #[arg(long, value_enum, env = "PDF_TRANSLATE_BACKEND", default_value = "ollama")]
    backend: BackendArg,

    /// /api/chat server URL (ollama backend).
    #[arg(long, env = "TRANSLATION_LLM_BASE_URL")]
    base_url: Option<String>,

    /// Model name for either backend.
    #[arg(long)]
    model: Option<String>,

    /// edgequake-llm provider name (provider backend).
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Directory for the original/ and output/ job areas.
    #[arg(long, env = "PDF_TRANSLATE_STORAGE_DIR", default_value = "storage")]
    storage_dir: PathBuf,

    /// Most pages translated in one job.
    #[arg(long, env = "PDF_TRANSLATE_MAX_PAGES", default_value_t = 10)]
    max_pages: usize,

    /// Concurrent model calls.
    #[arg(short, long, env = "PDF_TRANSLATE_CONCURRENCY", default_value_t = 2)]
    concurrency: usize,

    /// libpdfium file or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Print the final job record as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_TRANSLATE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level lifecycle logs unless -v is given.
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

    // ── Build service ────────────────────────────────────────────────────
    let config = ServiceConfig::builder()
        .storage_dir(&cli.storage_dir)
        .max_window_pages(cli.max_pages)
        .translation_concurrency(cli.concurrency)
        .max_concurrent_jobs(1)
        .build()
        .context("Invalid configuration")?;

    let backend = build_backend(&cli)?;
    let extractor = match &cli.pdfium_lib_path {
        Some(path) => PdfiumExtractor::with_library_path(path),
        None => PdfiumExtractor::new(),
    };
    let service = TranslationService::new(config, Arc::new(extractor), backend);

    // ── Submit ───────────────────────────────────────────────────────────
    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let request = JobRequest::new(&cli.source, &cli.target).pages(cli.start_page, cli.end_page);
    let started = Instant::now();
    let job = service
        .create_job(&bytes, request)
        .await
        .context("Failed to submit job")?;
    let id = job.id;

    let mut progress = JobProgress::new(show_progress);
    if !cli.quiet && !cli.json {
        progress.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Translating {} ({} → {})…",
                cli.input.display(),
                cli.source,
                cli.target
            ))
        ));
    }

    // ── Follow the job until it is terminal ──────────────────────────────
    let mut rx = service.subscribe(&id)?;
    let mut interrupted = false;
    let job = loop {
        let snapshot = rx.borrow_and_update().clone();
        progress.update(&snapshot);
        if snapshot.is_finished() {
            break snapshot;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break service.get_job(&id)?;
                }
            }
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                progress.println(format!("{} {}", cyan("⚠"), "Interrupted, cancelling job…"));
                service.cancel_job(&id)?;
            }
        }
    };
    progress.finish();

    // ── Report ───────────────────────────────────────────────────────────
    let output_path = match job.status {
        JobStatus::Completed => {
            let path = cli
                .output
                .clone()
                .unwrap_or_else(|| default_output_path(&cli.input, &cli.target));
            let translated = service
                .download_result(&id)
                .await
                .context("Failed to read translated PDF")?;
            tokio::fs::write(&path, &translated)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Some(path)
        }
        _ => None,
    };

    if cli.json {
        let summary = serde_json::json!({ "job": job, "output": output_path });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise job")?
        );
    }

    match job.status {
        JobStatus::Completed => {
            if !cli.quiet && !cli.json {
                let path = output_path.as_deref().unwrap_or(Path::new(""));
                eprintln!(
                    "{}  {}/{} pages  {:.1}s  →  {}",
                    if job.skipped_pages == 0 {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    job.translated_elements,
                    job.total_elements,
                    started.elapsed().as_secs_f64(),
                    bold(&path.display().to_string()),
                );
                if job.skipped_pages > 0 {
                    eprintln!(
                        "   {}",
                        dim(&format!(
                            "{} page(s) could not be laid out and were left blank",
                            job.skipped_pages
                        ))
                    );
                }
            }
            Ok(())
        }
        JobStatus::Cancelled => bail!("Job {} was cancelled", id),
        JobStatus::Failed => {
            let detail = job
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            if !cli.quiet && !cli.json {
                eprintln!("{} {}", red("✘"), red(&detail));
            }
            bail!("Job {} failed: {}", id, detail)
        }
        JobStatus::Pending | JobStatus::Running => {
            bail!("Job {} stopped reporting before it finished", id)
        }
    }
}

/// Build the translation backend selected on the command line.
fn build_backend(cli: &Cli) -> Result<Arc<dyn TranslationBackend>> {
    match cli.backend {
        BackendArg::Ollama => {
            let mut config = OllamaConfig::from_env();
            if let Some(url) = &cli.base_url {
                config.base_url = url.clone();
            }
            if let Some(model) = &cli.model {
                config.model = model.clone();
            }
            let backend = OllamaChatBackend::new(config).context("Failed to build HTTP client")?;
            Ok(Arc::new(backend))
        }
        BackendArg::Provider => {
            let backend = ProviderBackend::resolve(cli.provider.as_deref(), cli.model.as_deref())
                .context("Failed to initialise LLM provider")?;
            Ok(Arc::new(backend))
        }
    }
}

/// `dir/report.pdf` + `fr` → `dir/report.fr.pdf`.
fn default_output_path(input: &Path, target: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "translated".to_string());
    input.with_file_name(format!("{stem}.{target}.pdf"))
}
