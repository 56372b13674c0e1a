use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::bail;
use clap::{Parser, Subcommand};
use raglet_core::AppBuilder;
use raglet_core::bootstrap::resolve_config_path;

/// Index source files into a vector store and ask questions about them.
#[derive(Debug, Parser)]
#[command(name = "raglet", version, about)]
struct Cli {
    /// Config file (defaults to $RAGLET_CONFIG, then config/default.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Chunk a source file, embed the chunks and store them
    Index {
        /// File to index (defaults to `index.default_target` from config)
        file_path: Option<PathBuf>,
    },
    /// Answer a question from the indexed code
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Number of chunks to retrieve (defaults to `retrieval.top_k`)
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_subscriber();

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::debug!("command failed: {e:?}");
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!("failed to listen for ctrl-c: {e:#}");
            }
            tracing::info!("received shutdown signal");
            eprintln!("Interrupted");
            ExitCode::from(130)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref());
    let app = AppBuilder::load(config_path).await?;

    match cli.command {
        Command::Index { file_path } => {
            let path =
                file_path.unwrap_or_else(|| PathBuf::from(&app.config().index.default_target));
            let report = app.build_indexer()?.index_file(&path).await?;
            println!(
                "Indexed {} chunks from {}",
                report.chunks_indexed,
                path.display()
            );
        }
        Command::Ask { question, top_k } => {
            let k = top_k.unwrap_or(app.config().retrieval.top_k);
            if k == 0 {
                bail!("--top-k must be at least 1");
            }
            let answer = app
                .build_pipeline()?
                .answer_question(&question.join(" "), k)
                .await?;
            println!("Answer:\n{answer}");
        }
    }
    Ok(())
}

/// Logs go to stderr so stdout carries only command output.
fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
