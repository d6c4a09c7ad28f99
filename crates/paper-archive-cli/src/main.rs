//! Paper Archive CLI - upload, list, fetch and delete archived papers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use paper_archive_core::{
    naming, AppConfig, DocumentId, OwnerId, PaperArchive, UploadOptions,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "paper-archive")]
#[command(author, version, about = "Archive academic papers with OCR and translation", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// GitHub repository owner for the archive store
    #[arg(long, global = true, env = "ARCHIVE_REPO_OWNER")]
    repo_owner: Option<String>,

    /// GitHub repository name for the archive store
    #[arg(long, global = true, env = "ARCHIVE_REPO_NAME")]
    repo_name: Option<String>,

    /// GitHub personal access token
    #[arg(long, global = true, env = "GITHUB_TOKEN")]
    github_token: Option<String>,

    /// Mistral API key for OCR extraction
    #[arg(long, global = true, env = "MISTRAL_API_KEY")]
    mistral_api_key: Option<String>,

    /// DeepSeek API key for translation
    #[arg(long, global = true, env = "DEEPSEEK_API_KEY")]
    deepseek_api_key: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a PDF and run it through extraction, translation and archival
    Upload {
        /// Input PDF file
        input: PathBuf,

        /// Owner the document is archived under
        #[arg(short, long)]
        owner: String,

        /// Document title (default: input filename without extension)
        #[arg(short, long)]
        title: Option<String>,

        /// Translate the extracted text
        #[arg(long)]
        translate: bool,

        /// Produce the interleaved bilingual artifact (implies --translate)
        #[arg(long)]
        dual: bool,
    },

    /// List an owner's archived documents, most recent first
    List {
        /// Owner whose documents to list
        owner: String,

        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete every artifact of a document
    Delete {
        /// Owner the document belongs to
        owner: String,

        /// Document title (as archived)
        title: String,

        /// Creation timestamp in epoch milliseconds (shown by `list`)
        created_at: u64,
    },

    /// Fetch one artifact by its key and write it to a file
    Fetch {
        /// Artifact key, e.g. `u1/My_Paper_1700000000000.md`
        key: String,

        /// Output file (default: the key's filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    fn build_config(&self) -> Result<AppConfig> {
        let mut config = if let Some(config_path) = &self.config {
            AppConfig::from_file(config_path).context("Failed to load config file")?
        } else {
            AppConfig::load()
        };

        if let Some(repo_owner) = &self.repo_owner {
            config.store.repo_owner.clone_from(repo_owner);
        }
        if let Some(repo_name) = &self.repo_name {
            config.store.repo_name.clone_from(repo_name);
        }
        if self.github_token.is_some() {
            config.store.token.clone_from(&self.github_token);
        }
        if self.mistral_api_key.is_some() {
            config.ocr.api_key.clone_from(&self.mistral_api_key);
        }
        if self.deepseek_api_key.is_some() {
            config.translator.api_key.clone_from(&self.deepseek_api_key);
        }

        config.validate().context(
            "Archive repository not configured: set --repo-owner/--repo-name \
             or [store] in the config file",
        )?;

        Ok(config)
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

// CLI output is intentional
#[allow(clippy::print_stdout)]
async fn run(args: Args) -> Result<()> {
    let config = args.build_config()?;
    let archive = PaperArchive::new(config).context("Failed to initialize archive")?;

    match args.command {
        Command::Upload {
            input,
            owner,
            title,
            translate,
            dual,
        } => {
            let owner = OwnerId::new(owner)?;
            let title = title.unwrap_or_else(|| {
                input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("untitled")
                    .to_string()
            });
            let pdf_bytes = std::fs::read(&input)
                .context(format!("Failed to read {}", input.display()))?;

            let options = UploadOptions {
                translate: translate || dual,
                dual_merge: dual,
            };

            let pb = spinner(&format!("Processing '{title}'"));
            let report = archive
                .upload_and_process(owner, &title, pdf_bytes.into(), options)
                .await?;
            pb.finish_with_message(format!(
                "Archived {} page(s) in {}ms",
                report.page_count, report.elapsed_ms
            ));

            if report.translation_failed {
                println!("Translation failed; archived source only.");
            }
            if report.alignment_degraded {
                println!("Paragraph alignment was degraded in the dual merge.");
            }
            for key in &report.keys_written {
                println!("  {key}");
            }
        }

        Command::List { owner, limit } => {
            let owner = OwnerId::new(owner)?;
            let mut entries = archive.history(&owner).await?;
            if let Some(limit) = limit {
                entries.truncate(limit);
            }

            if entries.is_empty() {
                println!("No documents archived for {owner}");
                return Ok(());
            }

            for entry in entries {
                let variants: Vec<String> =
                    entry.variants().map(|v| v.to_string()).collect();
                let when = entry
                    .created_at()
                    .map_or_else(|| entry.id.created_at_ms.to_string(), |t| t.to_rfc3339());
                println!(
                    "{}  {}  [{}]  (created_at: {})",
                    when,
                    entry.id.title,
                    variants.join(", "),
                    entry.id.created_at_ms
                );
            }
        }

        Command::Delete {
            owner,
            title,
            created_at,
        } => {
            let owner = OwnerId::new(owner)?;
            let id = DocumentId::new(owner, &title, created_at);
            let report = archive.delete_document(id).await;

            for key in &report.deleted {
                println!("deleted  {key}");
            }
            for failure in &report.failed {
                println!("FAILED   {}  ({})", failure.key, failure.reason);
            }
            if !report.complete() {
                anyhow::bail!("{} key(s) could not be deleted", report.failed.len());
            }
        }

        Command::Fetch { key, output } => {
            let (id, variant) = naming::decode(&key)
                .with_context(|| format!("Malformed artifact key: {key}"))?;

            let bytes = archive.fetch_artifact(&id, variant).await?;

            let output_path = output.unwrap_or_else(|| {
                let filename = key.rsplit('/').next().unwrap_or(&key);
                PathBuf::from(filename)
            });
            std::fs::write(&output_path, &bytes)
                .context(format!("Failed to write {}", output_path.display()))?;

            println!(
                "Fetched {} ({} bytes, {}) to {}",
                key,
                bytes.len(),
                variant.content_type(),
                output_path.display()
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    run(args).await
}
