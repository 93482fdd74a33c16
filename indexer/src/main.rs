use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ftsearch::{DocId, IndexStore, RecordDocument, SearchConfig, SearchError, SearchIndex, SledStore};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ftsearch-indexer")]
#[command(about = "Maintain and query a full-text search store", long_about = None)]
struct Cli {
    /// Store directory (created if missing)
    #[arg(long, global = true, default_value = "./index")]
    store: String,
    /// Namespace (document collection) to operate on
    #[arg(long, global = true, default_value = "default")]
    namespace: String,
    /// JSON search configuration file
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index documents from a JSON/JSONL file or a directory of them
    Index {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
    },
    /// Remove a document from the index
    Remove {
        #[arg(long)]
        id: DocId,
    },
    /// Report whether a document is indexed
    Status {
        #[arg(long)]
        id: DocId,
    },
    /// Search the namespace
    Search {
        #[arg(long)]
        query: String,
        /// Maximum number of hits to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Parse the query as JSON (a string or an array of terms)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SearchConfig::from_path(path)?,
        None => SearchConfig::default(),
    };
    let store = SledStore::open(&cli.store).with_context(|| format!("opening store {}", cli.store))?;
    let index = SearchIndex::new(store, cli.namespace.clone(), config)?;

    match cli.command {
        Commands::Index { input } => index_path(&index, Path::new(&input)),
        Commands::Remove { id } => {
            let removed = index.remove(id)?;
            index.store().flush()?;
            println!("removed {removed} postings for document {id}");
            Ok(())
        }
        Commands::Status { id } => {
            let state = if index.contains(id)? { "indexed" } else { "not indexed" };
            println!("document {id}: {state}");
            Ok(())
        }
        Commands::Search { query, limit, json } => {
            let hits = if json {
                let value: serde_json::Value =
                    serde_json::from_str(&query).context("--query is not valid JSON")?;
                index.search_value(value)?
            } else {
                index.search(query.as_str())?
            };
            for hit in hits.iter().take(limit) {
                println!("{:.4}\t{}", hit.score, hit.document_id);
            }
            tracing::info!(namespace = index.namespace(), total_hits = hits.len(), "search complete");
            Ok(())
        }
    }
}

#[derive(Default)]
struct Tally {
    indexed: usize,
    skipped: usize,
    postings: usize,
}

fn index_path(index: &SearchIndex<SledStore>, input: &Path) -> Result<()> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("input {} does not exist", input.display());
    }
    files.sort();

    let mut tally = Tally::default();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(index, &file, &mut tally)?;
        } else {
            index_json(index, &file, &mut tally)?;
        }
    }
    index.store().flush()?;

    tracing::info!(
        namespace = index.namespace(),
        indexed = tally.indexed,
        skipped = tally.skipped,
        postings = tally.postings,
        "index build complete"
    );
    Ok(())
}

fn index_jsonl(index: &SearchIndex<SledStore>, file: &Path, tally: &mut Tally) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: RecordDocument = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), n + 1))?;
        ingest_doc(index, &doc, tally)?;
    }
    Ok(())
}

fn index_json(index: &SearchIndex<SledStore>, file: &Path, tally: &mut Tally) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)
        .with_context(|| format!("parsing {}", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: RecordDocument = serde_json::from_value(v)?;
                ingest_doc(index, &doc, tally)?;
            }
        }
        serde_json::Value::Object(_) => {
            let doc: RecordDocument = serde_json::from_value(json)?;
            ingest_doc(index, &doc, tally)?;
        }
        _ => tracing::warn!(file = %file.display(), "expected an object or an array, skipping"),
    }
    Ok(())
}

fn ingest_doc(index: &SearchIndex<SledStore>, doc: &RecordDocument, tally: &mut Tally) -> Result<()> {
    match index.index(doc) {
        Ok(postings) => {
            tally.indexed += 1;
            tally.postings += postings;
            Ok(())
        }
        Err(SearchError::UnsupportedDocument { document_id }) => {
            tracing::warn!(document_id, "document has no title or body, skipping");
            tally.skipped += 1;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
