use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use ragdb_core::chunker::Chunker;
use ragdb_core::config::{expand_path, Config};
use ragdb_embed::default_embedder;
use ragdb_index::snapshot::{load_snapshot, save_snapshot};
use ragdb_index::MemoryVectorIndex;
use ragdb_pipeline::{IngestionPipeline, PipelineConfig, RetrievalService, DEFAULT_TOP_K};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|query|delete> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let snapshot_path: PathBuf = expand_path(config.index().snapshot_path);

    let embedder = default_embedder(config.embedding().dim);
    let index = Arc::new(load_snapshot(&snapshot_path)?);
    let chunker = Chunker::new(config.chunking().into());
    let pipeline = IngestionPipeline::new(
        chunker,
        Arc::clone(&embedder),
        Arc::clone(&index),
        PipelineConfig::from(config.ingest()),
    );

    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let target = args.first().map(PathBuf::from).unwrap_or_else(|| {
                eprintln!("Usage: ragdb ingest <file-or-directory>");
                std::process::exit(1);
            });
            if target.is_dir() {
                ingest_directory(&pipeline, &target)?;
            } else {
                let result = pipeline.ingest_file(&target);
                if !result.success {
                    eprintln!("Ingest failed: {}", result.message);
                    std::process::exit(1);
                }
                println!("Ingested {} ({} chunks)", target.display(), result.chunks_processed);
            }
            save_snapshot(&index, &snapshot_path)?;
        }
        "query" => {
            let query_text = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: ragdb query \"<question>\" [k]");
                std::process::exit(1)
            });
            let k = args
                .get(1)
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(DEFAULT_TOP_K);
            let retrieval = RetrievalService::new(embedder, Arc::clone(&index));
            let results = retrieval.retrieve(&query_text, k)?;
            if results.is_empty() {
                println!("No matches in {} indexed chunks.", index_len(&index));
                return Ok(());
            }
            for (rank, r) in results.iter().enumerate() {
                let headers = r.metadata.get("headers").map(String::as_str).unwrap_or("");
                let source = r.metadata.get("source_file").map(String::as_str).unwrap_or("?");
                println!("{}. [{:.4}] {} ({})", rank + 1, r.score, headers, source);
                println!("   {}", snippet(&r.content, 160));
            }
        }
        "delete" => {
            let id = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: ragdb delete <document-or-chunk-id>");
                std::process::exit(1)
            });
            if pipeline.delete(&id) {
                save_snapshot(&index, &snapshot_path)?;
                println!("Deleted '{}'", id);
            } else {
                eprintln!("Delete failed for '{}'", id);
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn ingest_directory(
    pipeline: &IngestionPipeline<MemoryVectorIndex>,
    dir: &Path,
) -> anyhow::Result<()> {
    let files = ragdb_pipeline::ingest::list_ingestable_files(dir)?;
    if files.is_empty() {
        println!("No ingestable files under {}", dir.display());
        return Ok(());
    }
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let mut ok = 0usize;
    let mut failed = 0usize;
    let mut chunks = 0usize;
    for file in &files {
        pb.set_message(file.display().to_string());
        let result = pipeline.ingest_file(file);
        if result.success {
            ok += 1;
            chunks += result.chunks_processed;
        } else {
            failed += 1;
            eprintln!("{}: {}", file.display(), result.message);
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");
    println!("Ingested {} files ({} chunks), {} failed", ok, chunks, failed);
    Ok(())
}

fn index_len(index: &MemoryVectorIndex) -> usize {
    use ragdb_core::traits::VectorIndex;
    index.len()
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}
