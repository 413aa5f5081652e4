mod display;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mizan_ai::inference::DEFAULT_BASE_URL;
use mizan_ai::{ModelSettings, OpenAiClient};
use mizan_core::RegulationDocument;
use mizan_engine::{Advisor, EngineConfig, Retriever};
use mizan_store::PineconeIndex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mizan", version, about = "Shariah compliance advisor for regulation documents")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Settings {
    /// Inference service API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible inference base URL
    #[arg(long, env = "MIZAN_INFERENCE_URL", default_value = DEFAULT_BASE_URL)]
    inference_url: String,

    /// Model for the diagnostic and query agents
    #[arg(long, env = "MIZAN_MODEL")]
    model: Option<String>,

    #[arg(long, env = "MIZAN_COMPLIANCE_MODEL")]
    compliance_model: Option<String>,

    #[arg(long, env = "MIZAN_DRAFTING_MODEL")]
    drafting_model: Option<String>,

    /// Vector index API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    index_api_key: Option<String>,

    /// Vector index host URL
    #[arg(long, env = "MIZAN_INDEX_URL")]
    index_url: Option<String>,

    /// Diagnostic calls allowed in flight at once
    #[arg(long, env = "MIZAN_MAX_CONCURRENCY", default_value_t = 4)]
    max_concurrency: usize,

    #[arg(long, env = "MIZAN_CALL_TIMEOUT_SECS", default_value_t = 60)]
    call_timeout_secs: u64,

    /// Reference excerpts retrieved per drafted section
    #[arg(long, env = "MIZAN_RETRIEVAL_TOP_K", default_value_t = 5)]
    retrieval_top_k: usize,

    /// Hand retrieved excerpts to the drafter without summarizing them
    #[arg(long, env = "MIZAN_RAW_EXCERPTS")]
    raw_excerpts: bool,

    /// Regulation document answering queries that carry none
    #[arg(long, env = "MIZAN_REFERENCE_DOCUMENT")]
    reference_document: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "API_PORT", default_value_t = 8000)]
        port: u16,
    },
    /// Scan a regulation document and run the diagnostic agents on flagged sections
    Review {
        file: PathBuf,
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
    /// Classify every section and draft revisions for non-compliant ones
    Draft {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Answer a free-text question about the regulations
    Ask {
        query: String,
        /// Regulation document to answer against
        #[arg(long)]
        regulations: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// List the fields a document decomposes into
    Fields { file: PathBuf },
    /// Check the inference and retrieval services
    Health,
}

impl Settings {
    fn engine_config(&self) -> EngineConfig {
        let defaults = ModelSettings::default();
        let models = ModelSettings {
            default_model: self.model.clone().unwrap_or(defaults.default_model),
            compliance_model: self
                .compliance_model
                .clone()
                .unwrap_or(defaults.compliance_model),
            drafting_model: self.drafting_model.clone().unwrap_or(defaults.drafting_model),
            temperature: defaults.temperature,
        };
        EngineConfig::default()
            .with_models(models)
            .with_max_concurrency(self.max_concurrency)
            .with_call_timeout(self.call_timeout_secs)
            .with_retrieval_top_k(self.retrieval_top_k)
            .with_summarized_excerpts(!self.raw_excerpts)
    }

    fn advisor(&self) -> anyhow::Result<Advisor> {
        let config = self.engine_config();
        let api_key = self
            .api_key
            .as_deref()
            .context("OPENAI_API_KEY is not set")?;
        let client = Arc::new(
            OpenAiClient::new(&self.inference_url, api_key)
                .with_timeout(config.call_timeout())
                .with_retries(config.inference_retries, config.retry_backoff()),
        );
        let top_k = config.retrieval_top_k;
        let timeout = config.call_timeout();
        let mut advisor = Advisor::new(config, client.clone());

        match (&self.index_url, &self.index_api_key) {
            (Some(url), Some(key)) => {
                let index = PineconeIndex::new(url, key).with_timeout(timeout);
                advisor = advisor.with_retriever(Retriever::new(client, Arc::new(index), top_k));
            }
            _ => tracing::warn!("retrieval not configured, drafting without reference excerpts"),
        }

        if let Some(path) = &self.reference_document {
            advisor = advisor.with_reference_document(read_document(path)?);
        }
        Ok(advisor)
    }
}

fn read_document(path: &Path) -> anyhow::Result<RegulationDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    RegulationDocument::from_json_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!("mizan v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Fields { file } => {
            let document = read_document(&file)?;
            display::print_fields(&document.decompose());
        }
        Command::Serve { host, port } => {
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid listen address {host}:{port}"))?;
            let advisor = Arc::new(cli.settings.advisor()?);
            mizan_server::serve(advisor, addr, shutdown_signal())
                .await
                .context("running HTTP server")?;
        }
        Command::Review { file, json } => {
            let document = read_document(&file)?;
            let advisor = cli.settings.advisor()?;
            let outcome = advisor.review(&document).await;
            if json {
                print_json(&outcome)?;
            } else {
                display::print_review(&outcome);
            }
            advisor.shutdown();
        }
        Command::Draft { file, json } => {
            let document = read_document(&file)?;
            let advisor = cli.settings.advisor()?;
            let outcome = advisor.draft(&document).await;
            if json {
                print_json(&outcome)?;
            } else {
                display::print_drafting(&outcome);
            }
            advisor.shutdown();
        }
        Command::Ask {
            query,
            regulations,
            json,
        } => {
            let document = regulations.as_deref().map(read_document).transpose()?;
            let advisor = cli.settings.advisor()?;
            let answer = advisor
                .answer(&query, document.as_ref())
                .await
                .with_context(|| format!("answering {query:?}"))?;
            if json {
                print_json(&answer)?;
            } else {
                display::print_answer(&answer);
            }
            advisor.shutdown();
        }
        Command::Health => {
            let advisor = cli.settings.advisor()?;
            display::print_health(&advisor.health().await)?;
        }
    }
    Ok(())
}
