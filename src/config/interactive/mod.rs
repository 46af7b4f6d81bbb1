
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password};

use super::settings::mask_secret;
use super::{Config, GraphConfig, OpenAiConfig, RetrievalConfig};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 SharePoint QA Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Microsoft Graph").bold().yellow());
    eprintln!("App registration used to read the SharePoint site (client credentials flow).");
    eprintln!();
    configure_graph(&mut config.graph)?;

    eprintln!();
    eprintln!("{}", style("OpenAI").bold().yellow());
    eprintln!("Models used for embeddings and answer generation.");
    eprintln!();
    configure_openai(&mut config.openai)?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    for line in describe_config(&config) {
        eprintln!("{}", line);
    }

    Ok(())
}

/// Render the effective configuration with secrets masked
fn describe_config(config: &Config) -> Vec<String> {
    let mut lines = vec![
        style("📋 Current Configuration").bold().cyan().to_string(),
        String::new(),
        style("Microsoft Graph:").bold().yellow().to_string(),
    ];

    lines.push(format!("  Authority: {}", style(&config.graph.authority_url).cyan()));
    lines.push(format!("  Graph API: {}", style(&config.graph.graph_url).cyan()));
    lines.push(format!("  Tenant ID: {}", style(&config.graph.tenant_id).cyan()));
    lines.push(format!("  Client ID: {}", style(&config.graph.client_id).cyan()));
    lines.push(format!(
        "  Client Secret: {}",
        style(mask_secret(&config.graph.client_secret)).dim()
    ));
    lines.push(format!("  Site ID: {}", style(&config.graph.site_id).cyan()));
    lines.push(format!(
        "  Timeout: {}s",
        style(config.graph.timeout_seconds).cyan()
    ));

    lines.push(String::new());
    lines.push(style("OpenAI:").bold().yellow().to_string());
    lines.push(format!("  Base URL: {}", style(&config.openai.base_url).cyan()));
    lines.push(format!(
        "  API Key: {}",
        style(mask_secret(&config.openai.api_key)).dim()
    ));
    lines.push(format!(
        "  Embedding Model: {} ({} dimensions)",
        style(&config.openai.embedding_model).cyan(),
        config.openai.embedding_dimension
    ));
    lines.push(format!("  Chat Model: {}", style(&config.openai.chat_model).cyan()));
    lines.push(format!("  Batch Size: {}", style(config.openai.batch_size).cyan()));

    lines.push(String::new());
    lines.push(style("Retrieval:").bold().yellow().to_string());
    lines.push(format!("  Top K: {}", style(config.retrieval.top_k).cyan()));
    lines.push(format!(
        "  Index: {}",
        style(config.index_dir_path().join(crate::index::INDEX_FILE_NAME).display()).cyan()
    ));

    lines.push(String::new());
    lines.push(format!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    ));

    lines
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_graph(graph: &mut GraphConfig) -> Result<()> {
    graph.tenant_id = prompt_required("Tenant ID", &graph.tenant_id)?;
    graph.client_id = prompt_required("Client ID", &graph.client_id)?;

    let secret = Password::new()
        .with_prompt("Client secret (leave empty to keep current)")
        .allow_empty_password(true)
        .interact()?;
    if !secret.is_empty() {
        graph.client_secret = secret;
    }

    graph.site_id = prompt_required("SharePoint site ID", &graph.site_id)?;

    Ok(())
}

fn configure_openai(openai: &mut OpenAiConfig) -> Result<()> {
    let api_key = Password::new()
        .with_prompt("OpenAI API key (leave empty to keep current)")
        .allow_empty_password(true)
        .interact()?;
    if !api_key.is_empty() {
        openai.api_key = api_key;
    }

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(openai.embedding_model.clone())
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(openai.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (1..=8192).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 1 and 8192")
            }
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(openai.chat_model.clone())
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding requests")
        .default(openai.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    openai.set_embedding_model(embedding_model)?;
    openai.set_embedding_dimension(embedding_dimension)?;
    openai.set_chat_model(chat_model)?;
    openai.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_retrieval(retrieval: &mut RetrievalConfig) -> Result<()> {
    let top_k: u32 = Input::new()
        .with_prompt("Documents retrieved per question")
        .default(retrieval.top_k)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 100")
            }
        })
        .interact_text()?;

    retrieval.set_top_k(top_k)?;
    Ok(())
}

fn prompt_required(prompt: &str, current: &str) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if !current.is_empty() {
        input = input.default(current.to_string());
    }

    let value = input
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Value cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(value.trim().to_string())
}
