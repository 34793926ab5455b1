use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use refsmith::config::{find_config_file, load_config, Config};
use refsmith::enrich::PubMedEnricher;
use refsmith::llm::OpenRouterClient;
use refsmith::output;
use refsmith::pipeline::{split_references, Pipeline};
use refsmith::server::{self, AppState};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// refsmith - Extract structured citation metadata from free-text references
#[derive(Parser, Debug)]
#[command(name = "refsmith")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract structured citation metadata from free-text references", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Export format for processed references
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// Pretty-printed JSON array
    Json,
    /// RIS record blocks
    Ris,
    /// Fixed-column CSV
    Csv,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Process references from a file or stdin
    Process {
        /// Input file with one reference per line, or "-" for stdin
        input: String,

        /// Export format
        #[arg(long, short, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Output file (defaults to stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// OpenRouter API key (falls back to OPENROUTER_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Skip PubMed enrichment
        #[arg(long)]
        no_enrich: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("refsmith={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from file if specified or found in default locations
    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        Config::default()
    };

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", host, port);

            let pipeline = build_pipeline(&config, true)?;
            let state = Arc::new(AppState::new(
                pipeline,
                Duration::from_secs(config.server.artifact_ttl_secs),
            ));

            server::serve(&addr, state)
                .await
                .map_err(|e| anyhow::anyhow!("Server failed: {}", e))?;
        }

        Some(Commands::Process {
            input,
            format,
            output,
            api_key,
            no_enrich,
        }) => {
            let api_key = api_key
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .filter(|key| !key.trim().is_empty());
            let Some(api_key) = api_key else {
                anyhow::bail!("No API key provided. Pass --api-key or set OPENROUTER_API_KEY");
            };

            let text = if input == "-" {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                std::fs::read_to_string(&input)?
            };

            let references = split_references(&text);
            if references.is_empty() {
                anyhow::bail!("No references found in input");
            }

            let pipeline = build_pipeline(&config, !no_enrich)?;
            let outcome = pipeline.process_batch(&references, &api_key).await;

            let format = match format {
                Format::Json => output::OutputFormat::Json,
                Format::Ris => output::OutputFormat::Ris,
                Format::Csv => output::OutputFormat::Csv,
            };
            let serialized = output::serialize(format, &outcome.records)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &serialized)?;
                    if !cli.quiet {
                        eprintln!(
                            "Processed {} references ({} found, {} not found) in {} -> {}",
                            outcome.total(),
                            outcome.found(),
                            outcome.not_found(),
                            outcome.elapsed_display(),
                            path.display()
                        );
                    }
                }
                None => println!("{}", serialized),
            }
        }

        None => {
            println!("No command provided. Use --help for usage information.");
            println!("Common commands:");
            println!("  serve              - Run the HTTP server");
            println!("  process <input>    - Process references from a file or stdin");
        }
    }

    Ok(())
}

/// Build the pipeline from configuration, optionally with PubMed enrichment
fn build_pipeline(config: &Config, enrich: bool) -> Result<Pipeline> {
    let llm = OpenRouterClient::new(config.llm.clone())?;
    let mut pipeline = Pipeline::new(Arc::new(llm), &config.pipeline);

    if enrich && config.pubmed.enabled {
        let enricher = PubMedEnricher::new(config.pubmed.clone())?;
        pipeline = pipeline.with_enricher(Arc::new(enricher));
    }

    Ok(pipeline)
}
