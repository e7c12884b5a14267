use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use lumi_core::config::{Config, Settings};
use lumi_hybrid::{CollectionRegistry, HybridOptions, HybridRetriever};
use lumi_qa::{ChatCompletionsClient, QaOrchestrator};

mod progress;
mod session;
mod sources;

use session::{Command, Flow, Session, HELP};
use sources::{load_sources, VideoSource};

#[derive(Parser, Debug)]
#[command(name = "lumi", version, about = "Study assistant over your PDFs and video transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a collection and chat with it
    Chat {
        /// Name of the first collection
        collection: String,
        /// PDF files or directories containing PDFs
        files: Vec<PathBuf>,
        #[command(flatten)]
        video: VideoArgs,
    },
    /// Ingest sources once and print the retrieved chunks for a query
    Search {
        files: Vec<PathBuf>,
        #[arg(short, long)]
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
        #[arg(long)]
        no_rerank: bool,
        #[command(flatten)]
        video: VideoArgs,
    },
}

#[derive(Args, Debug)]
struct VideoArgs {
    /// YouTube URL of a video whose captions are given with --captions
    #[arg(long, requires = "captions")]
    youtube: Option<String>,
    /// WebVTT captions file for --youtube
    #[arg(long, requires = "youtube")]
    captions: Option<PathBuf>,
    #[arg(long)]
    title: Option<String>,
}

impl VideoArgs {
    fn source(&self) -> Option<VideoSource> {
        match (&self.youtube, &self.captions) {
            (Some(url), Some(captions)) => Some(VideoSource { url: url.clone(), captions: captions.clone(), title: self.title.clone() }),
            _ => None,
        }
    }
}

/// Used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;

    match cli.command {
        Commands::Chat { collection, files, video } => chat(&settings, &collection, &files, video.source()).await,
        Commands::Search { files, query, k, no_rerank, video } => {
            let k = k.unwrap_or(settings.retrieval.top_k);
            search(&settings, &files, video.source(), &query, k, !no_rerank && settings.retrieval.use_rerank).await
        }
    }
}

async fn search(settings: &Settings, files: &[PathBuf], video: Option<VideoSource>, query: &str, k: usize, use_rerank: bool) -> Result<()> {
    let report = load_sources(files, video.as_ref()).await?;
    let retriever = HybridRetriever::from_settings(settings)?;
    let mut registry = CollectionRegistry::new();
    let pb = progress::spinner("Indexing...");
    let created = registry.create_from_documents("search", retriever, &report.documents).await;
    pb.finish_and_clear();
    let (collection, stats) = created?;
    println!("Indexed {} document(s) into {} chunk(s)", stats.documents, stats.chunks);

    let chunks = collection.read().await.retrieve(query, k, use_rerank).await?;
    println!("\n🔍 {} result(s) for \"{}\"", chunks.len(), query);
    for (i, chunk) in chunks.iter().enumerate() {
        println!("\n  {}. {} {}", i + 1, session::source_icon(chunk), chunk.metadata.title());
        println!("     {}", chunk.preview(300).replace('\n', " "));
    }
    Ok(())
}

async fn chat(settings: &Settings, name: &str, files: &[PathBuf], video: Option<VideoSource>) -> Result<()> {
    let embedder = lumi_embed::get_default_embedder(&settings.embedding)?;
    let scorer = lumi_embed::build_scorer(&settings.reranker, Arc::clone(&embedder))?;
    let client = ChatCompletionsClient::from_settings(&settings.llm)?;
    if !client.has_api_key() {
        eprintln!("⚠️  {} is not set; questions will fail until it is.", settings.llm.api_key_env);
    }
    let qa = QaOrchestrator::new(Arc::new(client));
    let mut session = Session::new(HybridOptions::from_settings(settings), embedder, scorer, qa, settings.retrieval.top_k);
    session.create_collection(name, files, video.as_ref()).await?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(session.prompt().as_bytes()).await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else { break };
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match session.handle(command).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => eprintln!("Error: {e:#}"),
        }
    }
    Ok(())
}
