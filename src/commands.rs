use anyhow::{Context, Result};
use console::style;
use std::io;
use std::path::Path;
use tracing::info;

use crate::QaError;
use crate::answer::OpenAiChat;
use crate::config::Config;
use crate::embeddings::OpenAiEmbeddings;
use crate::index::IndexStore;
use crate::pipeline::QueryPipeline;
use crate::retriever::{Resolution, Retriever};
use crate::source::SharePointSource;

type SharePointRetriever = Retriever<SharePointSource, OpenAiEmbeddings>;

/// Load the configuration and insist on every credential the network collaborators need
fn load_config(config_dir: &Path) -> Result<Config> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    config.require_credentials().context(
        "Missing credentials. Run 'sharepoint-qa config' or set the environment variables",
    )?;
    Ok(config)
}

fn build_retriever(config: &Config) -> Result<SharePointRetriever> {
    let source = SharePointSource::new(config).context("Failed to set up SharePoint source")?;
    let embedder = OpenAiEmbeddings::new(config).context("Failed to set up embeddings client")?;
    let store = IndexStore::new(config.index_dir_path());

    Ok(Retriever::new(source, embedder, store).with_progress(true))
}

/// Resolve the index and answer questions from stdin until `exit` or end of input
#[inline]
pub fn ask(config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir)?;
    let engine = OpenAiChat::new(&config).context("Failed to set up chat client")?;
    let mut pipeline = QueryPipeline::new(build_retriever(&config)?, engine)
        .with_top_k(config.retrieval.top_k as usize);

    let resolution = pipeline
        .resolve()
        .context("Cannot answer questions without an index")?;
    let documents = pipeline.retriever().index().map_or(0, |index| index.len());

    match resolution {
        Resolution::Loaded | Resolution::AlreadyReady => eprintln!(
            "{} {} documents from {}",
            style("✓ Loaded index:").green(),
            documents,
            style(pipeline.retriever().store().path().display()).cyan()
        ),
        Resolution::Built => eprintln!(
            "{} {} documents",
            style("✓ Built new index:").green(),
            documents
        ),
    }
    eprintln!();

    let answered = pipeline
        .run_interactive(io::stdin().lock(), io::stdout().lock())
        .context("Failed to read from the terminal")?;
    info!("Session ended after {} answered questions", answered);

    Ok(())
}

/// Rebuild the index from SharePoint, replacing whatever is on disk
#[inline]
pub fn rebuild_index(config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir)?;
    let mut retriever = build_retriever(&config)?;

    let documents = retriever.rebuild().context("Index rebuild failed")?;

    eprintln!(
        "{} {} documents",
        style("✓ Indexed").green(),
        style(documents).bold()
    );
    eprintln!(
        "  Stored at: {}",
        style(retriever.store().path().display()).cyan()
    );

    Ok(())
}

/// Report what is on disk without touching the network
#[inline]
pub fn show_status(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let store = IndexStore::new(config.index_dir_path());

    eprintln!("{}", style("📊 SharePoint QA Status").bold().cyan());
    eprintln!("{}", "=".repeat(50));
    eprintln!();

    match store.summary() {
        Ok(summary) => {
            eprintln!("🔍 Index: {}", style(summary.path.display()).cyan());
            eprintln!("   📄 Documents: {}", summary.documents);
            eprintln!("   🔢 Dimension: {}", summary.dimension);
            eprintln!("   🕒 Built: {}", summary.built_at);
        }
        Err(QaError::IndexNotFound(path)) => {
            eprintln!("🔍 Index: {}", style("not built yet").yellow());
            eprintln!("   Expected at: {}", path.display());
        }
        Err(QaError::CorruptIndex { path, reason }) => {
            eprintln!("🔍 Index: {}", style("unusable").red());
            eprintln!("   {}: {}", path.display(), reason);
            eprintln!("   It will be rebuilt on the next 'ask' or 'index'.");
        }
        Err(e) => return Err(e).context("Failed to inspect index"),
    }

    eprintln!();
    eprintln!("🤖 Models:");
    eprintln!(
        "   Embeddings: {} ({} dimensions)",
        config.openai.embedding_model, config.openai.embedding_dimension
    );
    eprintln!("   Chat: {}", config.openai.chat_model);
    eprintln!("   Passages per question: {}", config.retrieval.top_k);

    let missing = config.require_credentials().err();
    eprintln!();
    match missing {
        Some(e) => eprintln!("🔑 Credentials: {}", style(e).yellow()),
        None => eprintln!("🔑 Credentials: {}", style("complete").green()),
    }

    eprintln!();
    eprintln!("💡 Next Steps:");
    eprintln!("   • Use 'sharepoint-qa config' to set credentials");
    eprintln!("   • Use 'sharepoint-qa index' to rebuild the index");
    eprintln!("   • Use 'sharepoint-qa ask' to start asking questions");

    Ok(())
}
