use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ragpipe::chunker;
use ragpipe::config::Config;
use ragpipe::parser;
use ragpipe::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "ragpipe", version, about = "Ask questions about local documents")]
struct Cli {
    /// Path to the configuration file (defaults to ./config.json)
    #[arg(long, default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest documents and answer a question about them
    Ask {
        /// Document to ingest; repeatable (pdf, pptx, docx, csv, txt)
        #[arg(long = "doc", value_name = "FILE", required = true)]
        docs: Vec<PathBuf>,

        /// The question to answer
        query: String,
    },
    /// Show how a document splits into chunks
    Chunks {
        file: PathBuf,

        /// Words per chunk (defaults to the configured chunk_size)
        #[arg(long)]
        size: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Ask { docs, query } => {
            let pipeline = Pipeline::from_config(&config)?;
            for doc in &docs {
                pipeline.ingest(doc)?;
            }
            eprintln!(
                "Indexed {} chunks from {} document(s)",
                pipeline.chunk_count(),
                docs.len()
            );

            let answer = pipeline.answer(&query)?;
            println!("{answer}");
        }
        Command::Chunks { file, size } => {
            let text = extract_text(&file)?;
            let chunks = chunker::chunk_text(&text, size.unwrap_or(config.chunk_size));
            for (i, chunk) in chunks.iter().enumerate() {
                println!("[{i}] {chunk}");
            }
            eprintln!("{} chunk(s)", chunks.len());
        }
    }

    Ok(())
}

fn extract_text(path: &Path) -> Result<String> {
    let kind = parser::kind_for_path(path)
        .with_context(|| format!("cannot infer format of {}", path.display()))?;
    let parsers = parser::default_parsers();
    let parse = parsers
        .get(&kind)
        .ok_or_else(|| parser::UnsupportedFormat(kind.clone()))?;
    parse(path)
}
