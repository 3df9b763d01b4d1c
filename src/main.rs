use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use citeflex::config::{find_config_file, load_config, save_config, ApiKeys, Config};
use citeflex::mcp::McpServer;
use citeflex::pipeline::{self, BatchItem, ResolveError, Resolver};
use citeflex::sources::FAMOUS_CASES;
use citeflex::ui::{self, Status};
use citeflex::utils::CacheService;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// citeflex - resolve free-text references into formatted citations
#[derive(Parser, Debug)]
#[command(name = "citeflex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve free-text references into Chicago, APA, MLA, Bluebook and OSCOLA citations", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-provider timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Bypass the lookup cache
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    /// Never consult the AI classifier
    #[arg(long, global = true, default_value_t = false)]
    no_ai: bool,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    /// Show the environment variables citeflex reads
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table on a terminal, JSON otherwise
    Auto,
    /// Human-readable tables
    Table,
    /// Machine-readable JSON
    Json,
    /// Citation text only
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve one reference and print its citation
    #[command(alias = "c")]
    Cite {
        /// Free-text reference, e.g. "Loving v. Virginia"
        query: String,

        /// Citation style
        #[arg(long, short, default_value = "Chicago")]
        style: String,

        /// Print the short (subsequent) form instead
        #[arg(long)]
        short: bool,

        /// Page or paragraph for the short form
        #[arg(long, requires = "short")]
        pinpoint: Option<String>,
    },

    /// Resolve one reference per line from a file, or stdin with "-"
    #[command(alias = "b")]
    Bulk {
        /// Input file (default: stdin)
        input: Option<PathBuf>,

        /// Citation style
        #[arg(long, short, default_value = "Chicago")]
        style: String,
    },

    /// Show how a reference would be classified
    #[command(alias = "d")]
    Detect {
        /// Free-text reference
        query: String,
    },

    /// List acceptable matches from every provider
    Candidates {
        /// Free-text reference
        query: String,

        /// Citation style
        #[arg(long, short, default_value = "Chicago")]
        style: String,

        /// Maximum number of candidates
        #[arg(long, short, default_value_t = 5)]
        limit: usize,
    },

    /// List supported citation styles
    Styles,

    /// List the offline famous-case table
    Cases,

    /// Run the MCP server
    Serve {
        /// Serve over streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Manage the lookup cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Show or create configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show cache status and statistics
    Status,

    /// Clear all cached lookups
    Clear,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration (API keys masked)
    Show,

    /// Write a default configuration file
    Init {
        /// Destination (default: <config_dir>/citeflex/config.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

/// Print the environment variables citeflex reads
fn print_env_vars() {
    println!("citeflex - Environment Variables");
    println!();
    println!("API Keys:");
    println!("  GEMINI_API_KEY              Gemini key for the AI type classifier");
    println!("  CL_API_KEY                  CourtListener API token");
    println!("  PUBMED_API_KEY              NCBI E-utilities key (higher rate limit)");
    println!("  SEMANTIC_SCHOLAR_API_KEY    Semantic Scholar key (higher rate limit)");
    println!("  GOOGLE_CSE_API_KEY          Google Custom Search key");
    println!("  GOOGLE_CSE_ID               Google Custom Search engine id");
    println!();
    println!("Configuration overrides (CITEFLEX__<SECTION>__<KEY>):");
    println!("  CITEFLEX__ROUTING__CONFIDENCE_THRESHOLD   Pattern confidence that skips the AI (default: 0.7)");
    println!("  CITEFLEX__ROUTING__AI_ENABLED             Enable AI escalation (default: true)");
    println!("  CITEFLEX__CASCADE__PROVIDER_TIMEOUT_SECS  Per-provider timeout (default: 10)");
    println!("  CITEFLEX__CASCADE__MIN_CONFIDENCE         Minimum match confidence (default: 0.5)");
    println!("  CITEFLEX__CASCADE__MAX_CONCURRENT         Bulk concurrency (default: 4)");
    println!("  CITEFLEX__CACHE__ENABLED                  Enable the lookup cache (default: false)");
    println!("  CITEFLEX__CACHE__TTL_SECONDS              Cache lifetime (default: 86400)");
    println!("  CITEFLEX__HTTP__CONTACT_EMAIL             Contact address for Crossref/OpenAlex polite pools");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Log filter (e.g., citeflex=debug)");
}

fn init_logging(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("citeflex={}", level)));

    // stdout carries results and MCP stdio, so logs go to stderr
    let json = cli.log_json || config.logging.is_json();
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn load(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config from environment".to_string(),
    })?;

    if let Some(timeout) = cli.timeout {
        config.cascade.provider_timeout_secs = timeout;
        config.routing.ai_timeout_secs = timeout;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    if cli.no_ai {
        config.routing.ai_enabled = false;
    }
    Ok(config)
}

fn resolver(config: &Config) -> Result<Resolver> {
    Resolver::from_config(config).context("Failed to set up providers")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a user-visible failure and exit non-zero
fn fail(err: &ResolveError, output: OutputFormat) -> ! {
    if output == OutputFormat::Json {
        let tried = match err {
            ResolveError::NotFound { tried, .. } => tried.clone(),
            ResolveError::InvalidStyle(_) => Vec::new(),
        };
        println!(
            "{}",
            serde_json::json!({"error": err.kind(), "message": err.to_string(), "tried": tried})
        );
    } else {
        ui::print_status(Status::Error, &err.to_string());
        if let ResolveError::NotFound { tried, .. } = err {
            if !tried.is_empty() {
                eprintln!("  tried: {}", tried.join(", "));
            }
        }
    }
    std::process::exit(1);
}

/// Non-empty lines that are not `#` comments
fn read_queries(input: Option<&Path>) -> Result<Vec<String>> {
    let text = match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn mask(key: &mut Option<String>) {
    if let Some(value) = key {
        let visible: String = value.chars().take(4).collect();
        *value = format!("{}…", visible);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
        return Ok(());
    }

    let config = load(&cli)?;
    init_logging(&cli, &config);
    let output = cli.output.resolve();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Cite {
            query,
            style,
            short,
            pinpoint,
        } => {
            let resolver = resolver(&config)?;
            let resolution = match resolver.resolve(&query, &style).await {
                Ok(resolution) => resolution,
                Err(e) => fail(&e, output),
            };

            let short_form = if short {
                match pipeline::format_short(&resolution.record, &style, pinpoint.as_deref()) {
                    Ok(citation) => Some(citation),
                    Err(e) => fail(&e, output),
                }
            } else {
                None
            };

            match output {
                OutputFormat::Json => match &short_form {
                    Some(citation) => print_json(&serde_json::json!({
                        "resolution": resolution,
                        "short_citation": citation,
                    }))?,
                    None => print_json(&resolution)?,
                },
                OutputFormat::Plain => {
                    let citation = short_form.as_ref().unwrap_or(&resolution.citation);
                    println!("{}", citation.plain_text());
                }
                _ => {
                    ui::print_resolution(&resolution, cli.verbose > 0);
                    if let Some(citation) = &short_form {
                        ui::print_section("Short form");
                        println!("{}", ui::render_citation(citation, ui::is_terminal()));
                    }
                }
            }
        }

        Commands::Bulk { input, style } => {
            let queries = read_queries(input.as_deref())?;
            // Fail fast on the style before any lookups
            if let Err(e) = pipeline::parse_style(&style) {
                fail(&e, output);
            }

            let resolver = resolver(&config)?;
            let progress = if output == OutputFormat::Table && !cli.quiet {
                ui::BatchProgress::new(queries.len() as u64)
            } else {
                ui::BatchProgress::hidden()
            };

            let mut items: Vec<BatchItem> = Vec::with_capacity(queries.len());
            for chunk in queries.chunks(config.cascade.max_concurrent.max(1) * 4) {
                match resolver.resolve_many(chunk.iter().cloned(), &style).await {
                    Ok(batch) => items.extend(batch),
                    Err(e) => fail(&e, output),
                }
                progress.set_position(items.len() as u64);
            }
            progress.finish();

            match output {
                OutputFormat::Json => print_json(&items)?,
                OutputFormat::Plain => {
                    for item in &items {
                        match &item.result {
                            Ok(resolution) => println!("{}", resolution.citation.plain_text()),
                            Err(e) => println!("# {}", e),
                        }
                    }
                }
                _ => ui::print_batch(&items),
            }
        }

        Commands::Detect { query } => {
            let resolver = resolver(&config)?;
            let routing = resolver.detect(&query).await;
            match output {
                OutputFormat::Json => print_json(&routing)?,
                OutputFormat::Plain => println!("{}", routing.detection.reference_type),
                _ => ui::print_routing(&query, &routing),
            }
        }

        Commands::Candidates {
            query,
            style,
            limit,
        } => {
            let resolver = resolver(&config)?;
            let candidates = match resolver.candidates(&query, &style, limit.max(1)).await {
                Ok(candidates) => candidates,
                Err(e) => fail(&e, output),
            };

            match output {
                OutputFormat::Json => print_json(&candidates)?,
                OutputFormat::Plain => {
                    for candidate in &candidates {
                        println!("{}", candidate.citation.plain_text());
                    }
                }
                _ if candidates.is_empty() => {
                    ui::print_status(Status::Warning, &format!("No candidates for '{}'", query))
                }
                _ => ui::print_candidates(&candidates),
            }
        }

        Commands::Styles => match output {
            OutputFormat::Json => {
                let styles: Vec<serde_json::Value> = citeflex::CitationStyle::ALL
                    .iter()
                    .map(|s| serde_json::json!({"name": s.name(), "description": s.description()}))
                    .collect();
                print_json(&styles)?
            }
            OutputFormat::Plain => {
                for style in citeflex::CitationStyle::ALL {
                    println!("{}", style.name());
                }
            }
            _ => ui::print_styles(),
        },

        Commands::Cases => match output {
            OutputFormat::Json => print_json(&FAMOUS_CASES)?,
            OutputFormat::Plain => {
                for case in FAMOUS_CASES {
                    println!("{}, {} ({})", case.case_name, case.citation, case.year);
                }
            }
            _ => ui::print_cases(FAMOUS_CASES),
        },

        Commands::Serve { http, port, host } => {
            let resolver = Arc::new(resolver(&config)?);
            let server = McpServer::new(resolver)?;

            if http {
                let addr = format!("{}:{}", host, port);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                handle
                    .await
                    .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
            } else {
                server.run().await?;
            }
        }

        Commands::Cache { command } => {
            let cache = CacheService::from_config(config.cache.clone());
            cache
                .initialize()
                .with_context(|| format!("Failed to create {}", cache.cache_dir().display()))?;

            match command {
                CacheCommands::Status => {
                    let stats = cache.stats();
                    if output == OutputFormat::Json {
                        print_json(&stats)?;
                    } else if !stats.enabled {
                        println!("Cache: disabled");
                        println!("To enable, set [cache] enabled = true or CITEFLEX__CACHE__ENABLED=true");
                    } else {
                        println!("Cache: enabled");
                        println!("Directory: {}", stats.cache_dir.display());
                        println!("Entries: {} ({} KB)", stats.entries, stats.size_kb);
                        println!("TTL: {} seconds", stats.ttl.as_secs());
                    }
                }
                CacheCommands::Clear => {
                    cache.clear_all().context("Failed to clear cache")?;
                    if !cli.quiet {
                        ui::print_status(Status::Success, "Cache cleared");
                    }
                }
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let mut shown = config.clone();
                let keys = &mut shown.api_keys;
                mask(&mut keys.gemini);
                mask(&mut keys.courtlistener);
                mask(&mut keys.pubmed);
                mask(&mut keys.semantic_scholar);
                mask(&mut keys.google_cse_key);
                mask(&mut keys.google_cse_id);

                if output == OutputFormat::Json {
                    print_json(&shown)?;
                } else {
                    print!("{}", toml::to_string_pretty(&shown)?);
                }
            }
            ConfigCommands::Init { path, force } => {
                let path = match path {
                    Some(path) => path,
                    None => dirs::config_dir()
                        .context("No platform config directory; pass a path")?
                        .join("citeflex")
                        .join("config.toml"),
                };
                if path.exists() && !force {
                    anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
                }

                // Keys stay in the environment rather than being copied into the file
                let template = Config {
                    api_keys: ApiKeys {
                        gemini: None,
                        courtlistener: None,
                        pubmed: None,
                        semantic_scholar: None,
                        google_cse_key: None,
                        google_cse_id: None,
                    },
                    ..Config::default()
                };
                save_config(&template, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if !cli.quiet {
                    ui::print_status(
                        Status::Success,
                        &format!("Wrote {}", path.display()),
                    );
                }
            }
        },

        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        }
    }

    Ok(())
}
