use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};

use lumi_core::traits::{Embedder, RelevanceScorer, Retriever};
use lumi_core::types::Chunk;
use lumi_hybrid::{CollectionRegistry, HybridOptions, HybridRetriever};
use lumi_qa::{ChatTurn, QaOrchestrator, QaOutcome};

use crate::sources::{load_sources, VideoSource};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Use(String),
    New { name: String, files: Vec<PathBuf> },
    Delete(Option<String>),
    Chunks,
    Select(Vec<usize>),
    Unselect,
    TopK(usize),
    Rerank(bool),
    Reset,
    Help,
    Quit,
    Ask(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Ask(line.to_string()));
        };
        let mut parts = rest.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        let command = match cmd {
            "list" => Command::List,
            "use" => Command::Use(single(&args, "/use NAME")?),
            "new" => {
                let (name, files) = args.split_first().ok_or_else(|| anyhow!("usage: /new NAME FILES..."))?;
                if files.is_empty() {
                    bail!("usage: /new NAME FILES...");
                }
                Command::New { name: name.to_string(), files: files.iter().map(PathBuf::from).collect() }
            }
            "delete" => Command::Delete(args.first().map(|s| s.to_string())),
            "chunks" => Command::Chunks,
            "select" => Command::Select(parse_selection(&args.join(""))?),
            "unselect" => Command::Unselect,
            "topk" => {
                let k: usize = single(&args, "/topk N")?.parse().map_err(|_| anyhow!("top-k must be a number"))?;
                if !(1..=20).contains(&k) {
                    bail!("top-k must be within 1..=20");
                }
                Command::TopK(k)
            }
            "rerank" => match single(&args, "/rerank on|off")?.as_str() {
                "on" => Command::Rerank(true),
                "off" => Command::Rerank(false),
                other => bail!("expected on or off, got {other}"),
            },
            "reset" => Command::Reset,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command /{other} (try /help)"),
        };
        Ok(command)
    }
}

fn single(args: &[&str], usage: &str) -> Result<String> {
    match args {
        [one] => Ok(one.to_string()),
        _ => bail!("usage: {usage}"),
    }
}

/// `1,3,5` as zero-based chunk indexes.
fn parse_selection(text: &str) -> Result<Vec<usize>> {
    let picked = text
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n - 1),
            _ => Err(anyhow!("chunk numbers start at 1, got {s}")),
        })
        .collect::<Result<Vec<_>>>()?;
    if picked.is_empty() {
        bail!("usage: /select 1,3");
    }
    Ok(picked)
}

pub const HELP: &str = "/list  /use NAME  /new NAME FILES...  /delete [NAME]  /chunks  /select 1,3  /unselect  /topk N  /rerank on|off  /reset  /quit";

/// Retrieval with the session's rerank switch.
struct Tuned<'a> {
    retriever: &'a HybridRetriever,
    use_rerank: bool,
}

impl Retriever for Tuned<'_> {
    async fn query(&self, text: &str, k: usize) -> lumi_core::Result<Vec<Chunk>> {
        self.retriever.retrieve(text, k, self.use_rerank).await
    }
}

pub struct Session {
    registry: CollectionRegistry,
    options: HybridOptions,
    embedder: Arc<dyn Embedder>,
    scorer: Arc<dyn RelevanceScorer>,
    qa: QaOrchestrator,
    top_k: usize,
    use_rerank: bool,
    selected: Option<Vec<usize>>,
    history: Vec<ChatTurn>,
}

/// What the loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl Session {
    pub fn new(
        options: HybridOptions,
        embedder: Arc<dyn Embedder>,
        scorer: Arc<dyn RelevanceScorer>,
        qa: QaOrchestrator,
        top_k: usize,
    ) -> Self {
        let use_rerank = options.use_rerank;
        Self { registry: CollectionRegistry::new(), options, embedder, scorer, qa, top_k, use_rerank, selected: None, history: Vec::new() }
    }

    pub fn prompt(&self) -> String {
        format!("{}> ", self.registry.active_name().unwrap_or("lumi"))
    }

    /// Load sources and register them as a new active collection.
    pub async fn create_collection(&mut self, name: &str, files: &[PathBuf], video: Option<&VideoSource>) -> Result<()> {
        if self.registry.contains(name) {
            bail!("collection {name} already exists");
        }
        let report = load_sources(files, video).await?;
        let retriever = HybridRetriever::new(self.options.clone(), Arc::clone(&self.embedder), Arc::clone(&self.scorer))?;
        let pb = crate::progress::spinner(format!("Indexing {} document(s)...", report.documents.len()));
        let created = self.registry.create_from_documents(name, retriever, &report.documents).await;
        pb.finish_and_clear();
        let (_, stats) = created?;
        self.selected = None;
        println!("✅ {name}: {} document(s), {} chunk(s)", stats.documents, stats.chunks);
        Ok(())
    }

    pub async fn handle(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::List => {
                if self.registry.is_empty() {
                    println!("No collections yet.");
                }
                for name in self.registry.list_all() {
                    let marker = if Some(name) == self.registry.active_name() { "*" } else { " " };
                    println!("{marker} {name}");
                }
            }
            Command::Use(name) => {
                self.registry.activate(&name)?;
                self.selected = None;
                println!("Using {name}");
            }
            Command::New { name, files } => self.create_collection(&name, &files, None).await?,
            Command::Delete(name) => {
                let name = name.or_else(|| self.registry.active_name().map(str::to_string)).ok_or_else(|| anyhow!("no active collection"))?;
                self.registry.delete(&name)?;
                self.selected = None;
                println!("Deleted {name}; active: {}", self.registry.active_name().unwrap_or("none"));
            }
            Command::Chunks => {
                let collection = self.registry.active().ok_or_else(|| anyhow!("no active collection"))?;
                let retriever = collection.read().await;
                for (i, chunk) in retriever.all_chunks()?.iter().enumerate() {
                    println!("{:>4}. [{}] {}", i + 1, chunk.metadata.title(), chunk.preview(100).replace('\n', " "));
                }
            }
            Command::Select(picked) => {
                println!("Answering from chunk(s) {}", picked.iter().map(|i| (i + 1).to_string()).collect::<Vec<_>>().join(", "));
                self.selected = Some(picked);
            }
            Command::Unselect => self.selected = None,
            Command::TopK(k) => self.top_k = k,
            Command::Rerank(on) => self.use_rerank = on,
            Command::Reset => {
                self.registry.reset();
                self.selected = None;
                self.history.clear();
                println!("Started a new session.");
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(Flow::Quit),
            Command::Ask(question) if question.is_empty() => {}
            Command::Ask(question) => self.ask(&question).await?,
        }
        Ok(Flow::Continue)
    }

    async fn ask(&mut self, question: &str) -> Result<()> {
        let collection = self.registry.active().ok_or_else(|| anyhow!("no active collection; use /new"))?;
        let retriever = collection.read().await;
        let outcome = match &self.selected {
            Some(picked) => {
                let all = retriever.all_chunks()?;
                let chunks = picked
                    .iter()
                    .map(|&i| all.get(i).cloned().ok_or_else(|| anyhow!("no chunk {} (collection has {})", i + 1, all.len())))
                    .collect::<Result<Vec<_>>>()?;
                self.qa.answer_from_chunks(question, &self.history, chunks).await?
            }
            None => {
                let tuned = Tuned { retriever: &*retriever, use_rerank: self.use_rerank };
                self.qa.answer(question, &self.history, &tuned, self.top_k).await?
            }
        };
        let reply = render_outcome(&outcome);
        println!("{reply}");
        lumi_qa::remember(&mut self.history, question, reply);
        Ok(())
    }
}

pub fn render_outcome(outcome: &QaOutcome) -> String {
    match outcome {
        QaOutcome::Identity { answer } => answer.clone(),
        QaOutcome::Answered(answer) => {
            let mut out = format!("From your materials:\n{}\n\nLumi's analysis:\n{}", answer.context_answer, answer.analysis_answer);
            if !answer.source_documents.is_empty() {
                out.push_str("\n\nSources:");
                for (i, doc) in answer.source_documents.iter().enumerate() {
                    out.push_str(&format!("\n  {}. {} {}", i + 1, source_icon(doc), doc.metadata.title()));
                }
            }
            out
        }
    }
}

pub fn source_icon(chunk: &Chunk) -> &'static str {
    match chunk.metadata.kind {
        lumi_core::SourceType::Pdf => "📄",
        lumi_core::SourceType::Youtube => "🎬",
    }
}
