// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use openrouter_cached_cli::{ChatArgs, load_config, parse_items, render_model_options};
use openrouter_cached_core::{
    config::{API_KEY_ENV, Config},
    llm::OpenRouterClient,
    node::{ExecuteOptions, OpenRouterCachedNode},
};
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "openrouter-cached",
    about = "Chat completions through OpenRouter with prompt caching",
    version = env!("CARGO_PKG_VERSION"),
    author = "ByteDance"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single chat item built from flags
    Chat(ChatArgs),

    /// Execute a batch of items from a JSON file
    Run {
        /// JSON array (or single object) of chat items
        #[arg(long)]
        items: PathBuf,

        /// Record failing items as errors instead of stopping
        #[arg(long)]
        continue_on_fail: bool,
    },

    /// List the models available on OpenRouter
    Models {
        /// Print the options as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat(args) => handle_chat(&config, args).await,
        Commands::Run {
            items,
            continue_on_fail,
        } => handle_run(&config, items, continue_on_fail).await,
        Commands::Models { json } => handle_models(&config, json).await,
    }
}

fn create_node(config: &Config) -> OpenRouterCachedNode<OpenRouterClient> {
    let credentials = config.resolve_credentials();
    if !credentials.is_valid() {
        eprintln!("❌ API key not found. Set it in the config file or the environment:");
        eprintln!("   export {}=your_key_here", API_KEY_ENV);
        std::process::exit(1);
    }

    match OpenRouterCachedNode::from_credentials(&credentials, &config.client) {
        Ok(node) => node,
        Err(e) => {
            eprintln!("❌ Failed to create client: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_chat(config: &Config, args: ChatArgs) -> Result<()> {
    let params = args.into_parameters(&config.defaults)?;
    log::info!(
        "🎯 Model: {}{}",
        params.model.bright_yellow(),
        if params.stream { " (streaming)" } else { "" }
    );

    let node = create_node(config);
    let outputs = node
        .execute(std::slice::from_ref(&params), ExecuteOptions::default())
        .await
        .context("Chat request failed")?;

    println!("{}", serde_json::to_string_pretty(&outputs)?);
    Ok(())
}

async fn handle_run(config: &Config, items: PathBuf, continue_on_fail: bool) -> Result<()> {
    let source = std::fs::read_to_string(&items)
        .with_context(|| format!("Failed to read {}", items.display()))?;
    let items = parse_items(&source)?;
    log::info!("🚀 Executing {} items", items.len().bright_green());

    let node = create_node(config);
    let outputs = node
        .execute(&items, ExecuteOptions { continue_on_fail })
        .await
        .context("Execution failed")?;

    println!("{}", serde_json::to_string_pretty(&outputs)?);
    Ok(())
}

async fn handle_models(config: &Config, json: bool) -> Result<()> {
    let node = create_node(config);
    let options = node.get_models().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&options)?);
    } else {
        print!("{}", render_model_options(&options));
        println!("{} models", options.len().bright_green());
    }
    Ok(())
}
