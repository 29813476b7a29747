use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::{error, info};
use std::io::{self, Write};
use std::path::PathBuf;

use rag_chat::config::{OpenAiConfig, PipelineConfig};
use rag_chat::document::Document;
use rag_chat::openai::OpenAiClient;
use rag_chat::rag::RagEngine;

/// A RAG (Retrieval-Augmented Generation) chat bot that answers questions
/// about a single PDF document
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the document to answer questions about (supports text and
    /// PDF; falls back to the PDF_PATH environment variable)
    #[arg(index = 1)]
    file_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Load configuration from environment; missing credentials or paths
    // stop the process before any session state exists
    let openai_config = OpenAiConfig::from_env().context("Invalid OpenAI configuration")?;
    let config = PipelineConfig::from_env(args.file_path).context("Invalid configuration")?;

    if !config.document_path.exists() {
        error!("File not found: {}", config.document_path.display());
        return Err(anyhow::anyhow!("File not found"));
    }

    info!("Processing file: {}", config.document_path.display());

    // Load the document and build the session index from scratch
    let document =
        Document::from_file(&config.document_path).context("Failed to process document")?;
    info!("Loaded {} pages", document.pages.len());

    let client = OpenAiClient::new(openai_config);
    let mut engine = RagEngine::new(client, config);
    engine
        .index_document(&document)
        .await
        .context("Failed to index document")?;

    // Enter interactive Q&A loop
    run_query_loop(&mut engine).await
}

/// Read questions from stdin and stream answers to stdout until `exit`
async fn run_query_loop(engine: &mut RagEngine<OpenAiClient>) -> Result<()> {
    info!("Ready to answer questions. Type 'exit' to quit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut buffer = String::new();

    loop {
        print!("\nYour question: ");
        stdout.flush()?;

        buffer.clear();
        if stdin.read_line(&mut buffer)? == 0 {
            break;
        }

        let question = buffer.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            info!("Goodbye!");
            break;
        }

        // Per-turn failures are surfaced and the loop continues; the index
        // and conversation history stay intact
        match engine
            .answer(question, |fragment| {
                print!("{}", fragment);
                io::stdout().flush().ok();
            })
            .await
        {
            Ok(_) => println!(),
            Err(e) => eprintln!("\nCould not answer this question: {}", e),
        }
    }

    Ok(())
}
