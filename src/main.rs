use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use regidx::builder::{self, BuildOptions};
use regidx::cache::SnapshotCache;
use regidx::cli::{Cli, Commands};
use regidx::error::Result;
use regidx::fetch::HttpFetcher;
use regidx::loader::{IndexLoader, SnapshotSource};
use regidx::worker::{WorkerResponse, spawn_worker};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    regidx::tracing::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { root, remote, out } => run_build(root, remote, &out).await,
        Commands::Load { url, cache_dir } => run_load(&url, cache_dir).await,
        Commands::Search {
            query,
            snapshot,
            limit,
            offset,
            sort,
            json,
        } => run_search(&snapshot, query, limit, offset, &sort, json).await,
        Commands::Get { id, snapshot } => run_get(&snapshot, id).await,
        Commands::Show { snapshot } => run_show(&snapshot).await,
    }
}

async fn run_build(root: Option<PathBuf>, remote: Option<String>, out: &Path) -> Result<()> {
    let options = BuildOptions { root, remote };
    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let outcome = builder::build(&options, generated_at).await?;
    builder::write_snapshot(&outcome.snapshot, out).await?;

    println!(
        "registry index built: {} entries: {} (skipped: {})",
        out.display(),
        outcome.accepted,
        outcome.skipped
    );
    Ok(())
}

async fn run_load(url: &str, cache_dir: Option<PathBuf>) -> Result<()> {
    let cache_dir = match cache_dir.or_else(SnapshotCache::default_dir) {
        Some(dir) => dir,
        None => anyhow::bail!("no cache directory available; pass --cache-dir"),
    };

    let loader = IndexLoader::new(SnapshotCache::new(cache_dir), HttpFetcher::new(), url);
    let loaded = loader.load().await?;

    let source = match loaded.source {
        SnapshotSource::Cache => "cache",
        SnapshotSource::Network => "network",
    };
    println!(
        "source: {}  version: {}  entries: {}",
        source,
        loaded.data.version(),
        loaded.data.entries.len()
    );
    Ok(())
}

async fn run_search(
    snapshot_path: &Path,
    query: Option<String>,
    limit: usize,
    offset: usize,
    sort: &str,
    json_output: bool,
) -> Result<()> {
    let data = read_snapshot_value(snapshot_path).await?;
    let mut worker = spawn_worker();

    worker
        .requests
        .send(json!({ "type": "load", "data": data }))
        .await
        .context("search worker stopped")?;
    worker.responses.recv().await.context("search worker stopped")?;

    worker
        .requests
        .send(json!({
            "type": "search",
            "query": query,
            "limit": limit,
            "offset": offset,
            "sort": sort,
        }))
        .await
        .context("search worker stopped")?;
    let response = worker.responses.recv().await.context("search worker stopped")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    match response {
        WorkerResponse::SearchResult {
            ok: true,
            total,
            hits,
            mode,
            ..
        } => {
            println!("{} match(es), mode {:?}", total, mode);
            for hit in hits {
                println!(
                    "  {:<40} {:<12} {:>4}  {}",
                    hit.id, hit.latest, hit.score, hit.description
                );
            }
            Ok(())
        }
        WorkerResponse::SearchResult {
            error: Some(error), ..
        }
        | WorkerResponse::Error { error } => anyhow::bail!("search failed: {}", error),
        other => anyhow::bail!("unexpected worker response: {:?}", other),
    }
}

async fn run_get(snapshot_path: &Path, id: String) -> Result<()> {
    let data = read_snapshot_value(snapshot_path).await?;
    let mut worker = spawn_worker();

    worker
        .requests
        .send(json!({ "type": "load", "data": data }))
        .await
        .context("search worker stopped")?;
    worker.responses.recv().await.context("search worker stopped")?;

    worker
        .requests
        .send(json!({ "type": "getPackage", "id": id }))
        .await
        .context("search worker stopped")?;
    let response = worker.responses.recv().await.context("search worker stopped")?;

    match response {
        WorkerResponse::PackageResult {
            ok: true,
            pkg: Some(pkg),
            ..
        } => {
            println!("{}", serde_json::to_string_pretty(&pkg)?);
            Ok(())
        }
        WorkerResponse::PackageResult {
            error: Some(error),
            id,
            ..
        } => anyhow::bail!("{}: {}", id, error),
        other => anyhow::bail!("unexpected worker response: {:?}", other),
    }
}

async fn run_show(snapshot_path: &Path) -> Result<()> {
    let data = read_snapshot_value(snapshot_path).await?;
    let snapshot = regidx::Snapshot::from_value(&data);
    let meta = &snapshot.meta;

    println!("registryId:  {}", meta.registry_id);
    println!("specVersion: {}", meta.spec_version);
    println!("generatedAt: {}", meta.generated_at);
    println!("sourceRepo:  {}", meta.source_repo);
    println!("indexFormat: {}", meta.index_format);
    println!("entryCount:  {}", meta.entry_count);
    Ok(())
}

async fn read_snapshot_value(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read snapshot file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("snapshot file {} is not valid JSON", path.display()))
}
