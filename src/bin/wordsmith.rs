//! Wordsmith CLI
//!
//! Command-line interface for selection lookup, page segmentation, context
//! windows and rewrites against a plain-text document file.
//! Prints JSON on stdout; logs go to stderr.

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wordsmith_lib::{
    // Context
    build_context, locate, locate_cursor, segment, ContextMode, DocumentSnapshot,
    // Config
    AppConfig,
    // Host + controller
    HostDocument, MemoryDocument, RewriteController, RewriteInput, RewriteOutcome,
    // Service
    normalize_provider, RewriteClient, RewriteTransport,
};

#[derive(Parser)]
#[command(name = "wordsmith")]
#[command(about = "Wordsmith CLI - context-aware rewrites for documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find where the selection starts in the document
    Locate {
        /// Plain-text document
        #[arg(short, long)]
        file: PathBuf,
        /// Selected text (empty for a cursor)
        #[arg(short, long, default_value = "")]
        selection: String,
        /// Text of a paragraph touched by the selection (repeatable)
        #[arg(long = "hint")]
        hints: Vec<String>,
    },
    /// Split the document into pages
    Pages {
        #[arg(short, long)]
        file: PathBuf,
        /// Page length used when the document has no page breaks
        #[arg(long)]
        page_chars: Option<usize>,
    },
    /// Build the context window sent alongside a rewrite
    Context {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long, default_value = "")]
        selection: String,
        #[arg(long = "hint")]
        hints: Vec<String>,
        /// none, full, chars or pages
        #[arg(short, long)]
        mode: ContextMode,
        /// Window size; invalid values fall back to the mode default
        #[arg(long)]
        size: Option<String>,
    },
    /// Rewrite the selection through the rewrite service
    Rewrite {
        #[arg(short, long)]
        file: PathBuf,
        /// Text to select in the document before rewriting
        #[arg(short, long)]
        selection: Option<String>,
        /// Text to rewrite when nothing is selected
        #[arg(short, long)]
        text: Option<String>,
        #[arg(short, long)]
        instruction: String,
        #[arg(short, long)]
        mode: Option<ContextMode>,
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Let the service search the web (longer timeout)
        #[arg(long)]
        web_search: bool,
        /// Save the document back to the file after replacing the selection
        #[arg(long)]
        write: bool,
    },
    /// List models offered by the rewrite service
    Models {
        #[arg(long)]
        provider: Option<String>,
    },
}

// ============ Output Types ============

#[derive(Serialize)]
struct LocateOutput {
    offset: Option<usize>,
    found: bool,
}

#[derive(Serialize)]
struct PagesOutput {
    count: usize,
    approximate: bool,
    starts: Vec<usize>,
    pages: Vec<String>,
}

#[derive(Serialize)]
struct ContextOutput {
    mode: String,
    size: usize,
    context_text: String,
    note: String,
}

#[derive(Serialize)]
struct RewriteOutput {
    outcome: String,
    status: String,
    request_id: Option<u64>,
    rewritten_text: Option<String>,
    model_note: Option<String>,
    context_note: Option<String>,
    replaced: bool,
    replace_error: Option<String>,
    written: bool,
}

#[derive(Serialize)]
struct ModelsOutput {
    provider: String,
    models: Vec<String>,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

// ============ Main ============

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wordsmith=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Locate { file, selection, hints } => handle_locate(&file, &selection, &hints),
        Commands::Pages { file, page_chars } => handle_pages(&file, page_chars),
        Commands::Context { file, selection, hints, mode, size } => {
            handle_context(&file, &selection, &hints, mode, size.as_deref())
        }
        Commands::Rewrite {
            file,
            selection,
            text,
            instruction,
            mode,
            size,
            provider,
            model,
            web_search,
            write,
        } => {
            let mut config = match AppConfig::load() {
                Ok(config) => config,
                Err(e) => fail(e.into()),
            };
            if let Some(provider) = provider {
                config.provider = normalize_provider(&provider);
            }
            if model.is_some() {
                config.model = model;
            }
            if let Some(mode) = mode {
                config.context_mode = mode;
            }
            if size.is_some() {
                config.context_size = size;
            }
            config.use_web_search |= web_search;

            let request = RewriteArgs {
                file,
                selection,
                text: text.unwrap_or_default(),
                instruction,
                write,
            };
            handle_rewrite(config, request).await
        }
        Commands::Models { provider } => handle_models(provider).await,
    };

    match result {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}

fn fail(e: anyhow::Error) -> ! {
    let error = ErrorOutput { error: format!("{:#}", e) };
    match serde_json::to_string(&error) {
        Ok(json) => println!("{}", json),
        Err(_) => println!(r#"{{"error": "unprintable error"}}"#),
    }
    std::process::exit(1);
}

fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

// ============ Handlers ============

fn handle_locate(file: &Path, selection: &str, hints: &[String]) -> Result<String> {
    let document = read_document(file)?;
    let offset = if selection.is_empty() {
        Some(locate_cursor(&document, hints))
    } else {
        locate(&document, selection, hints)
    };

    let output = LocateOutput {
        offset,
        found: offset.is_some(),
    };
    Ok(serde_json::to_string(&output)?)
}

fn handle_pages(file: &Path, page_chars: Option<usize>) -> Result<String> {
    let document = read_document(file)?;
    let page_chars = page_chars.unwrap_or_else(|| AppConfig::default().approx_page_chars);
    if page_chars == 0 {
        bail!("--page-chars must be positive");
    }

    let segments = segment(&document, page_chars);
    let output = PagesOutput {
        count: segments.pages.len(),
        approximate: segments.approximate,
        starts: segments.starts(),
        pages: segments.pages,
    };
    Ok(serde_json::to_string(&output)?)
}

fn handle_context(
    file: &Path,
    selection: &str,
    hints: &[String],
    mode: ContextMode,
    size: Option<&str>,
) -> Result<String> {
    let config = AppConfig::load()?;
    let snapshot = DocumentSnapshot {
        selection_text: selection.to_string(),
        document_text: read_document(file)?,
        paragraph_hints: hints.to_vec(),
    };
    let size = mode.window_size(size);
    let context = build_context(&snapshot, mode, size, &config.window_limits());

    let output = ContextOutput {
        mode: mode.to_string(),
        size,
        context_text: context.context_text,
        note: context.note,
    };
    Ok(serde_json::to_string(&output)?)
}

struct RewriteArgs {
    file: PathBuf,
    selection: Option<String>,
    text: String,
    instruction: String,
    write: bool,
}

async fn handle_rewrite(config: AppConfig, args: RewriteArgs) -> Result<String> {
    let host = Arc::new(MemoryDocument::new(read_document(&args.file)?));
    if let Some(selection) = args.selection.as_deref().filter(|s| !s.is_empty()) {
        if !host.select_text(selection) {
            bail!("selection not found in {}", args.file.display());
        }
    }

    let transport = Arc::new(RewriteClient::new(&config.service_url));
    let mut input = RewriteInput::from_config(&config, args.instruction);
    input.manual_text = args.text;

    let controller = RewriteController::new(transport, host.clone(), config);
    let run = controller.rewrite(input);
    tokio::pin!(run);
    let outcome = tokio::select! {
        outcome = &mut run => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, canceling rewrite");
            controller.cancel();
            run.await
        }
    };

    let display = controller.display();
    let mut output = RewriteOutput {
        outcome: outcome.label().to_string(),
        status: display.status,
        request_id: None,
        rewritten_text: None,
        model_note: None,
        context_note: None,
        replaced: false,
        replace_error: None,
        written: false,
    };

    match outcome {
        RewriteOutcome::Completed(result) => {
            if args.write && result.replaced {
                fs::write(&args.file, host.document_text().await?)
                    .with_context(|| format!("writing {}", args.file.display()))?;
                info!(path = %args.file.display(), "Document saved");
                output.written = true;
            }
            output.request_id = Some(result.request_id);
            output.rewritten_text = Some(result.rewritten_text);
            output.model_note = result.model_note;
            output.context_note = result.context_note;
            output.replaced = result.replaced;
            output.replace_error = result.replace_error;
            Ok(serde_json::to_string(&output)?)
        }
        RewriteOutcome::Canceled | RewriteOutcome::Superseded => Ok(serde_json::to_string(&output)?),
        other => match other.error() {
            Some(e) => Err(e.into()),
            None => Ok(serde_json::to_string(&output)?),
        },
    }
}

async fn handle_models(provider: Option<String>) -> Result<String> {
    let config = AppConfig::load()?;
    let provider = normalize_provider(provider.as_deref().unwrap_or(&config.provider));
    let client = RewriteClient::new(&config.service_url);
    let models = client.list_models(&provider).await?;

    let output = ModelsOutput { provider, models };
    Ok(serde_json::to_string(&output)?)
}
