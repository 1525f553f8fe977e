//! Continuum CLI — command-line interface to the memory engine (spec §6).
//!
//! Exit codes: 0 success, 1 runtime error, 2 usage/help (the last is handled
//! by `clap` itself for bad arguments).

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use continuum_core::{Config, MemoryEngine};
use tracing_subscriber::EnvFilter;

/// Continuum — per-tenant AI memory substrate.
#[derive(Parser)]
#[command(name = "continuum")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Continuum memory engine")]
struct Cli {
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable debug-level logging on stderr.
    #[arg(long, global = true)]
    verbose: bool,

    /// Override the SQLite database path (defaults to the platform data dir).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Tenant to operate on. Defaults to `Config::default_tenant_id`.
    #[arg(long, global = true)]
    tenant_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply schema migrations.
    Init,

    /// Record a conversational turn and extract concepts/decisions from it.
    Learn {
        /// The user's message.
        user_message: String,
        /// The assistant's response (decisions are extracted from this side).
        ai_response: String,
        /// Session identifier grouping this turn with others.
        #[arg(long, default_value = "cli-session")]
        session_id: String,
    },

    /// Recall entities relevant to a query via hybrid fusion.
    Search {
        /// The recall query.
        query: String,
        /// Maximum number of entities to return.
        #[arg(long, default_value_t = 10)]
        limit: i64,
        /// Attach verbatim FTS-matched messages to each hit.
        #[arg(long)]
        verbatim: bool,
    },

    /// Print tenant row counts and outstanding intentions.
    Status,

    /// Write a full tenant snapshot (concepts/sessions/edges/compounds) to a JSON file.
    Export {
        /// Output file path.
        output: PathBuf,
    },

    /// Replay a previously exported snapshot into the current tenant.
    Import {
        /// Input file path, as produced by `export`.
        input: PathBuf,
    },

    /// Run one decay/prune consolidation pass over the attention graph.
    Sync,

    /// Run pool/schema/FTS sanity checks and report problems.
    Doctor,

    /// Run the HTTP API server (delegates to `continuum-server`).
    Serve {
        /// Port to bind.
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::from_default_env().add_directive("info".parse().unwrap()) };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let mut config = Config::from_env();
    if let Some(db_path) = cli.db_path {
        config.db_path = Some(db_path);
    }
    if let Some(tenant_id) = cli.tenant_id {
        config.default_tenant_id = tenant_id;
    }

    let code = match run(config, cli.command) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            1
        }
    };
    std::process::exit(code);
}

fn run(config: Config, command: Commands) -> anyhow::Result<()> {
    let tenant_id = config.default_tenant_id.clone();

    match command {
        Commands::Init => run_init(config),
        Commands::Learn { user_message, ai_response, session_id } => run_learn(config, &tenant_id, &user_message, &ai_response, &session_id),
        Commands::Search { query, limit, verbatim } => run_search(config, &tenant_id, &query, limit, verbatim),
        Commands::Status => run_status(config, &tenant_id),
        Commands::Export { output } => run_export(config, &tenant_id, &output),
        Commands::Import { input } => run_import(config, &tenant_id, &input),
        Commands::Sync => run_sync(config, &tenant_id),
        Commands::Doctor => run_doctor(config),
        Commands::Serve { port } => run_serve(port),
    }
}

fn run_init(config: Config) -> anyhow::Result<()> {
    MemoryEngine::open(config)?;
    println!("{}", "database initialized".green());
    Ok(())
}

fn run_learn(config: Config, tenant_id: &str, user_message: &str, ai_response: &str, session_id: &str) -> anyhow::Result<()> {
    let engine = MemoryEngine::open(config)?;
    let outcome = engine.learn(tenant_id, user_message, ai_response, session_id)?;
    println!("{} message #{}", "learned".green().bold(), outcome.message.id);
    println!("  concepts: {}", outcome.concepts.join(", "));
    if !outcome.decisions.is_empty() {
        println!("  decisions: {}", outcome.decisions.len());
    }
    if let Some(compound) = &outcome.compound {
        println!("  compound concept: {compound}");
    }
    println!("  links created: {}", outcome.links_created);
    Ok(())
}

fn run_search(config: Config, tenant_id: &str, query: &str, limit: i64, verbatim: bool) -> anyhow::Result<()> {
    let engine = MemoryEngine::open(config)?;
    let hits = engine.recall(tenant_id, query, limit, verbatim)?;
    if hits.is_empty() {
        println!("{}", "no matches".dimmed());
        return Ok(());
    }
    for hit in hits {
        let legs = [
            hit.ranked.matched_lexically.then_some("lexical"),
            hit.ranked.matched_via_graph.then_some("graph"),
            hit.ranked.matched_via_vector.then_some("vector"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("+");
        println!(
            "{} {} [{}] ({})",
            format!("{:.3}", hit.ranked.score).cyan(),
            hit.ranked.entity.name.bold(),
            hit.ranked.entity.entity_type,
            legs
        );
        for message in &hit.verbatim {
            println!("    {} {}", "·".dimmed(), truncate(&message.user_message, 80).dimmed());
        }
    }
    Ok(())
}

fn run_status(config: Config, tenant_id: &str) -> anyhow::Result<()> {
    let engine = MemoryEngine::open(config)?;
    let stats = engine.stats(tenant_id)?;
    println!("{}", "=== Continuum Status ===".cyan().bold());
    println!("{}: {}", "Entities".bold(), stats.entities);
    println!("{}: {}", "Links".bold(), stats.links);
    println!("{}: {}", "Messages".bold(), stats.messages);

    let (pending, recent_decisions) = engine.resume_check(tenant_id)?;
    if !pending.is_empty() {
        println!();
        println!("{}", "Pending intentions:".yellow().bold());
        for intention in pending {
            println!("  [{}] {}", intention.priority, intention.intention);
        }
    }
    if !recent_decisions.is_empty() {
        println!();
        println!("{}", "Recent decisions:".yellow().bold());
        for decision in recent_decisions {
            println!("  {}", truncate(&decision.decision_text, 100));
        }
    }
    Ok(())
}

fn run_export(config: Config, tenant_id: &str, output: &PathBuf) -> anyhow::Result<()> {
    let engine = MemoryEngine::open(config)?;
    let bundle = engine.export(tenant_id)?;
    let json = serde_json::to_string_pretty(&bundle)?;
    std::fs::write(output, json)?;
    println!(
        "{} {} concepts, {} sessions, {} edges, {} compounds to {}",
        "exported".green().bold(),
        bundle.concepts.len(),
        bundle.sessions.len(),
        bundle.edges.len(),
        bundle.compounds.len(),
        output.display()
    );
    Ok(())
}

fn run_import(config: Config, tenant_id: &str, input: &PathBuf) -> anyhow::Result<()> {
    let engine = MemoryEngine::open(config)?;
    let raw = std::fs::read_to_string(input)?;
    let bundle: continuum_core::ExportBundle = serde_json::from_str(&raw)?;
    let summary = engine.import(tenant_id, &bundle)?;
    println!(
        "{} {} concepts ({} skipped), {} edges ({} skipped), {} sessions, {} compounds",
        "imported".green().bold(),
        summary.concepts_imported,
        summary.concepts_skipped,
        summary.edges_imported,
        summary.edges_skipped,
        summary.sessions_imported,
        summary.compounds_imported
    );
    Ok(())
}

fn run_sync(config: Config, tenant_id: &str) -> anyhow::Result<()> {
    let engine = MemoryEngine::open(config)?;
    let pruned = engine.consolidate(tenant_id)?;
    println!("{} {pruned} weak links pruned", "consolidated".green().bold());
    Ok(())
}

fn run_doctor(config: Config) -> anyhow::Result<()> {
    println!("{}", "=== Continuum Doctor ===".cyan().bold());
    match MemoryEngine::open(config) {
        Ok(engine) => {
            println!("{} storage pool opens and migrations apply cleanly", "ok".green());

            if engine.is_healthy() {
                let pool = engine.pool_stats();
                println!(
                    "{} {} pool healthy ({}/{} connections open)",
                    "ok".green(),
                    engine.backend_info(),
                    pool.current_open,
                    pool.pool_capacity
                );
            } else {
                println!("{} storage pool cannot currently hand out a connection", "fail".red());
            }

            let stats = engine.stats("default")?;
            println!("{} default tenant reachable ({} entities)", "ok".green(), stats.entities);
        }
        Err(err) => {
            println!("{} {err}", "fail".red());
            anyhow::bail!("doctor check failed");
        }
    }
    Ok(())
}

fn run_serve(port: u16) -> anyhow::Result<()> {
    println!("{}", "starting continuum-server is out of scope for the continuum binary".yellow());
    println!("run the `continuum-server` binary directly, e.g. `continuum-server --port {port}`");
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(max_chars).collect();
        truncated.push('\u{2026}');
        truncated
    }
}
