//! huginn-plan - routing dry runs
//!
//! Shows how the router would score and pick providers for a prompt, using
//! the configured catalog. No provider is called.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use huginn::cache::{KeywordExtractor, fingerprint};
use huginn::{
    Capability, Complexity, Completion, CompletionClient, CompletionRequest, Config, Huginn,
    HuginnError, Message, Priority, ProviderProfile,
};

/// Huginn routing planner
#[derive(Parser)]
#[command(name = "huginn-plan")]
#[command(version)]
#[command(about = "Dry-run provider selection for a prompt")]
struct Args {
    /// Config file (default: ~/.huginn/config.toml, then /etc/huginn/config.toml)
    #[arg(short, long, env = "HUGINN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct RequestArgs {
    /// Prompt text (or omit to read from stdin)
    prompt: Option<String>,
    /// Required capability (repeatable), e.g. domain_analysis
    #[arg(short = 'C', long = "capability")]
    capabilities: Vec<Capability>,
    /// simple | moderate | complex | expert
    #[arg(long, default_value = "moderate")]
    complexity: Complexity,
    /// low | medium | high | critical
    #[arg(long, default_value = "medium")]
    priority: Priority,
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Hard budget in cents
    #[arg(long)]
    budget_cents: Option<f64>,
    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long)]
    caller: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List configured providers
    Catalog,

    /// Score every eligible provider for a prompt
    Rank {
        #[command(flatten)]
        request: RequestArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the cache key and keyword signature of a prompt
    Fingerprint {
        #[command(flatten)]
        request: RequestArgs,
    },
}

/// Stand-in client: makes every provider executable without calling it.
struct DryRun;

#[async_trait]
impl CompletionClient for DryRun {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn complete(
        &self,
        _provider: &ProviderProfile,
        _messages: &[Message],
        _max_tokens: u32,
        _temperature: f32,
    ) -> huginn::Result<Completion> {
        Err(HuginnError::InvalidInput("dry run".into()))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Catalog => {
            for p in &config.providers {
                let strengths: Vec<&str> = p.strengths.iter().map(|c| c.as_str()).collect();
                println!(
                    "{:<16} ${:<10} +${:<6} {:>6}ms  rel {:.2}  [{}]",
                    p.name,
                    p.cost_per_token,
                    p.request_cost,
                    p.latency_ms,
                    p.reliability,
                    strengths.join(", ")
                );
            }
        }

        Command::Rank { request, json } => {
            let request = build_request(request)?;
            let mut builder = Huginn::builder().without_cache();
            for profile in &config.providers {
                builder = builder.provider(profile.clone(), Arc::new(DryRun));
            }
            let router = builder.build()?;
            let ranked = router.rank(&request);

            if json {
                let rows: Vec<serde_json::Value> = ranked
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "provider": r.profile.name,
                            "total": r.score.total(),
                            "score": r.score,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if ranked.is_empty() {
                println!("no eligible provider within budget");
            } else {
                println!(
                    "{:<16} {:>8} {:>8} {:>6} {:>6} {:>6} {:>6} {:>6}  est. cost",
                    "provider", "total", "cost", "rel", "lat", "caps", "aff", "room"
                );
                for r in &ranked {
                    let s = &r.score;
                    println!(
                        "{:<16} {:>8.2} {:>8.2} {:>6.2} {:>6.3} {:>6.2} {:>6.1} {:>6.1}  ${:.5}",
                        r.profile.name,
                        s.total(),
                        s.cost,
                        s.reliability,
                        s.latency,
                        s.capability,
                        s.affinity,
                        s.headroom,
                        s.estimated_cost
                    );
                }
            }
        }

        Command::Fingerprint { request } => {
            let request = build_request(request)?;
            let extractor = KeywordExtractor::new(&config.cache.keywords)?;
            let signature: Vec<String> = extractor
                .signature(&request.user_text())
                .into_iter()
                .collect();
            println!("key: {}", fingerprint(&request));
            println!("signature: [{}]", signature.join(", "));
            println!(
                "semantic lookup: {}",
                huginn::cache::response::semantic_eligible(&request)
            );
        }
    }

    Ok(())
}

fn build_request(args: RequestArgs) -> Result<CompletionRequest, Box<dyn std::error::Error>> {
    let prompt = resolve_text(args.prompt)?;
    let mut builder = CompletionRequest::builder()
        .message(Message::user(prompt))
        .capabilities(args.capabilities)
        .complexity(args.complexity)
        .priority(args.priority);
    if let Some(n) = args.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(cents) = args.budget_cents {
        builder = builder.cost_budget_cents(cents);
    }
    if let Some(secs) = args.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(caller) = args.caller {
        builder = builder.caller(caller);
    }
    Ok(builder.build()?)
}

/// Resolve the prompt from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_text = if io::stdin().is_terminal() {
        None
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => Err("no prompt provided (pass it as an argument or via stdin)".into()),
    }
}
