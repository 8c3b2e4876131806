//! TRUSTLOG Audit Core — Demo CLI
//!
//! Runs one or all of the three audit-core demo scenarios. Each scenario
//! uses real TRUSTLOG components (chain appender, integrity verifier,
//! query engine, export materializer, subscription fan-out) against the
//! in-memory reference store.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- chain
//!   cargo run -p demo -- query
//!   cargo run -p demo -- stream
//!   cargo run -p demo -- --config trustlog.toml run-all

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use trustlog_chain::{verify_chain, verify_range, ChainAppender, MemoryChainStore};
use trustlog_contracts::{
    error::{TrustlogError, TrustlogResult},
    query::LogQuery,
    request::AppendRequest,
    verify::VerificationOutcome,
};
use trustlog_core::config::LogConfig;
use trustlog_query::{export, ExportFormat, QueryEngine};
use trustlog_stream::LogBroadcaster;

// ── CLI definition ────────────────────────────────────────────────────────────

/// TRUSTLOG — tamper-evident audit logging core demo.
///
/// Each subcommand runs one or all of the three scenarios, demonstrating
/// hash chaining, tamper detection, deterministic queries, portable
/// exports, and commit-order subscriptions.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "TRUSTLOG audit core demo",
    long_about = "Runs TRUSTLOG demo scenarios showing append-only hash chaining,\n\
                  tamper detection, filtered pagination, CSV/JSON export, and\n\
                  commit-order subscription fan-out."
)]
struct Cli {
    /// Optional TOML configuration (partition, retry budget, backlog bound).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: append, verify, tamper, verify again.
    Chain,
    /// Scenario 2: filtered pagination and CSV/JSON export.
    Query,
    /// Scenario 3: live observers, ordering, and overrun disconnect.
    Stream,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    };

    print_banner(&config);

    let result = match cli.command {
        Command::RunAll => run_all(&config),
        Command::Chain => run_chain_scenario(&config),
        Command::Query => run_query_scenario(&config),
        Command::Stream => run_stream_scenario(&config),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> TrustlogResult<LogConfig> {
    match path {
        Some(path) => LogConfig::from_file(path),
        None => Ok(LogConfig::default()),
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_all(config: &LogConfig) -> TrustlogResult<()> {
    run_chain_scenario(config)?;
    run_query_scenario(config)?;
    run_stream_scenario(config)?;
    Ok(())
}

// ── Scenario 1: chain integrity ───────────────────────────────────────────────

fn run_chain_scenario(config: &LogConfig) -> TrustlogResult<()> {
    println!("── Scenario 1: hash chain and tamper detection ──");
    println!();

    let store = Arc::new(MemoryChainStore::new());
    let appender = ChainAppender::from_config(config, Arc::clone(&store));
    let chain_id = appender.chain_id().to_string();

    for request in sample_events() {
        let entry = appender.append(request)?;
        println!(
            "  committed #{} {:12} actor={} hash={}…",
            entry.sequence,
            entry.event_type,
            entry.actor_id,
            &entry.integrity_hash[..12]
        );
    }

    match verify_chain(&chain_id, store.as_ref())? {
        VerificationOutcome::Valid { entries_checked, terminal_hash } => {
            println!();
            println!("  verification: {entries_checked} entries clean");
            println!("  checkpoint:   {terminal_hash}");
        }
        VerificationOutcome::Tampered { fault } => {
            return Err(TrustlogError::IntegrityViolation {
                sequence: fault.sequence,
                reason: fault.detail,
            });
        }
    }

    // Flip a committed outcome directly in storage, as an attacker with
    // database access would.
    println!();
    println!("  tampering: flipping entry 2's outcome in storage…");
    store.simulate_tamper(2, |e| e.outcome = Some("failure".to_string()))?;

    match verify_range(&chain_id, store.as_ref(), 1, 4, None)? {
        VerificationOutcome::Tampered { fault } => {
            println!(
                "  detected:  sequence {} ({:?}) — {}",
                fault.sequence, fault.kind, fault.detail
            );
        }
        VerificationOutcome::Valid { .. } => {
            return Err(TrustlogError::IntegrityViolation {
                sequence: 2,
                reason: "tampering went undetected".to_string(),
            });
        }
    }

    println!();
    Ok(())
}

// ── Scenario 2: queries and export ────────────────────────────────────────────

fn run_query_scenario(config: &LogConfig) -> TrustlogResult<()> {
    println!("── Scenario 2: deterministic queries and export ──");
    println!();

    let store = Arc::new(MemoryChainStore::new());
    let appender = ChainAppender::from_config(config, Arc::clone(&store));

    for request in sample_events() {
        appender.append(request)?;
    }

    let engine = QueryEngine::new(Arc::clone(&store));

    // Page through user-1's logins, one per page, newest first.
    let query = LogQuery::new().event_type("login").actor("user-1").page(1, 0);
    let page1 = engine.query(&query)?;
    let page2 = engine.query(&LogQuery::new().event_type("login").actor("user-1").page(1, 1))?;

    println!("  login events for user-1: {} total", page1.total);
    for entry in page1.entries.iter().chain(page2.entries.iter()) {
        println!(
            "    #{} occurred_at={} outcome={}",
            entry.sequence,
            entry.occurred_at.to_rfc3339(),
            entry.outcome.as_deref().unwrap_or("-")
        );
    }

    // Export the full chain as CSV.
    let all = engine.query(&LogQuery::new().page(100, 0))?;
    let projection: Vec<String> = ["sequence", "event_type", "actor_id", "outcome", "integrity_hash"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let csv = export::materialize(&all.entries, &projection, ExportFormat::Csv)?;

    println!();
    println!("  CSV export ({} bytes):", csv.len());
    for line in String::from_utf8_lossy(&csv).lines() {
        println!("    {line}");
    }

    println!();
    Ok(())
}

// ── Scenario 3: subscription fan-out ──────────────────────────────────────────

fn run_stream_scenario(config: &LogConfig) -> TrustlogResult<()> {
    println!("── Scenario 3: commit-order subscriptions ──");
    println!();

    let store = Arc::new(MemoryChainStore::new());
    let appender = ChainAppender::from_config(config, Arc::clone(&store));

    // An observer registered before the appends sees every commit in order.
    let mut observer = appender.stream().subscribe();
    for request in sample_events() {
        appender.append(request)?;
    }

    print!("  live observer received:");
    while let Some(entry) = observer.try_recv()? {
        print!(" #{}", entry.sequence);
    }
    println!();

    // A deliberately tiny backlog forces an overrun disconnect.
    let tiny_store = Arc::new(MemoryChainStore::new());
    let tiny = ChainAppender::new(
        appender.chain_id(),
        Arc::clone(&tiny_store),
        LogBroadcaster::with_capacity(2),
    );
    let mut laggard = tiny.stream().subscribe();

    for i in 0..8 {
        tiny.append(AppendRequest::new("scan").actor(format!("batch-{i}")))?;
    }

    match laggard.recv() {
        Err(TrustlogError::ObserverOverrun { missed }) => {
            println!("  slow observer disconnected: {missed} entries missed");
        }
        other => {
            println!("  unexpected observer state: {other:?}");
        }
    }

    // The overrun observer resynchronizes through the query engine.
    let engine = QueryEngine::new(Arc::clone(&tiny_store));
    let backfill = engine.query(&LogQuery::new().page(100, 0))?;
    println!("  backfill via query engine: {} entries recovered", backfill.total);

    println!();
    Ok(())
}

// ── Sample data ───────────────────────────────────────────────────────────────

/// Two logins, a scan, and a rule edit — the canonical walkthrough set.
fn sample_events() -> Vec<AppendRequest> {
    let base = Utc::now() - Duration::minutes(30);
    vec![
        AppendRequest::new("login")
            .actor("user-1")
            .outcome("success")
            .occurred_at(base)
            .meta("method", json!("password")),
        AppendRequest::new("login")
            .actor("user-1")
            .outcome("success")
            .occurred_at(base + Duration::minutes(10))
            .meta("method", json!("sso")),
        AppendRequest::new("scan")
            .actor("user-1")
            .resource("scan", "scan-1042")
            .outcome("success")
            .occurred_at(base + Duration::minutes(20)),
        AppendRequest::new("rule_update")
            .actor("user-2")
            .resource("rule", "rule-77")
            .outcome("success")
            .occurred_at(base + Duration::minutes(25))
            .meta("field", json!("severity"))
            .meta("from", json!("low"))
            .meta("to", json!("high")),
    ]
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner(config: &LogConfig) {
    println!();
    println!("TRUSTLOG — Tamper-evident Audit Logging Core");
    println!("============================================");
    println!();
    println!("Chain partition: {}", config.chain.partition);
    println!();
    println!("Every committed entry is linked to its predecessor by the");
    println!("SHA-256 hash of a canonical encoding:");
    println!("  [1] Appender assigns sequence, recorded_at, prev_hash under one commit lock");
    println!("  [2] Canonical encoder frames every field with explicit lengths and markers");
    println!("  [3] Verifier replays any range and reports the first divergent sequence");
    println!("  [4] Queries are deterministic: fixed ordering, bounded pages");
    println!("  [5] Observers receive commits in order, or an explicit overrun signal");
    println!();
}
