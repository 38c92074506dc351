use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use event_atlas::config::AtlasConfig;
use event_atlas::extract::{EntityExplorer, OpenAiCompatClient};
use event_atlas::location::{LocationPipeline, NominatimClient};
use event_atlas::{logging, output, server};
use tracing::warn;

/// Event Atlas: entity and event-location explorer
///
/// Extracts event types, organisations, people and locations from article
/// text, geocodes every location and renders them on a map.
///
/// Examples:
///   atlas locations "[Paris, France; Tokyo, Japan]"
///   atlas analyze --file article.txt
///   atlas extract names "Jane Doe met the WHO in Geneva."
///   atlas serve --port 3000
#[derive(Parser)]
#[command(name = "atlas", version, about, long_about = None)]
struct Cli {
    /// Config file. Defaults to ~/.event_atlas/config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Concurrent geocoding requests (overrides config).
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Debug logging for the location and LLM subsystems.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a delimited location list and print the records as JSON.
    Locations {
        /// e.g. "[Paris, France; Tokyo, Japan]"
        raw: String,
    },
    /// Full analysis; writes results.json and map.html to the artifacts dir.
    Analyze {
        /// Article text. Read from --file when omitted.
        text: Option<String>,

        #[arg(long, short = 'f')]
        file: Option<PathBuf>,

        /// Override the artifacts directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a single extraction task (event_type, entities, names, locations, phone_numbers).
    Extract { kind: String, text: String },
    /// Start the HTTP server.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

fn load_config(cli: &Cli) -> AtlasConfig {
    let loaded = match &cli.config {
        Some(path) => AtlasConfig::load_from(path),
        None => AtlasConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| fail(e));

    if let Some(n) = cli.concurrency {
        config.pipeline.concurrency = n;
    }
    config.validate().unwrap_or_else(|e| fail(e));
    config
}

fn build_pipeline(config: &AtlasConfig) -> LocationPipeline {
    let geocoder = Arc::new(NominatimClient::new(config.geocoder.clone()));
    LocationPipeline::new(geocoder, &config.pipeline).unwrap_or_else(|e| fail(e))
}

fn build_explorer(config: &AtlasConfig, pipeline: LocationPipeline) -> Result<EntityExplorer, String> {
    let client = OpenAiCompatClient::new(config.llm.clone()).map_err(|e| e.to_string())?;
    Ok(EntityExplorer::new(Arc::new(client), config.llm.clone(), pipeline))
}

fn read_article(text: Option<String>, file: Option<PathBuf>) -> String {
    match (text, file) {
        (Some(t), _) => t,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .unwrap_or_else(|e| fail(format!("cannot read {}: {}", path.display(), e))),
        (None, None) => fail("provide article text or --file"),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::configure_logging(cli.verbose);

    let config = load_config(&cli);
    let pipeline = build_pipeline(&config);

    match cli.command {
        Command::Locations { raw } => {
            let batch = pipeline.resolve_raw(&raw).await;
            let json = serde_json::to_string_pretty(&batch.records()).unwrap_or_else(|e| fail(e));
            println!("{}", json);
        }

        Command::Analyze { text, file, out } => {
            let article = read_article(text, file);
            let explorer = build_explorer(&config, pipeline).unwrap_or_else(|e| fail(e));
            let report = explorer.process_text(&article).await.unwrap_or_else(|e| fail(e));

            let dir = out.unwrap_or_else(|| config.artifacts_dir.clone());
            output::save_json(&report, &dir, "results.json").unwrap_or_else(|e| fail(e));
            if report.locations.is_empty() {
                eprintln!("  No geographical data found.");
            } else {
                output::save_map(&report.locations, &dir, "map.html").unwrap_or_else(|e| fail(e));
            }

            eprintln!("  Event types: {}", report.event_types);
            eprintln!("  Entities:    {}", report.entities);
            eprintln!("  Names:       {}", report.names);
            eprintln!("  Locations:");
            for record in &report.locations {
                let marker = if record.geometry.is_some() { "\u{1F4CD}" } else { "\u{2022}" };
                eprintln!("    {} {}", marker, record.split_location);
            }
            eprintln!("  Analysis complete. Results in {}", dir.display());
        }

        Command::Extract { kind, text } => {
            let explorer = build_explorer(&config, pipeline).unwrap_or_else(|e| fail(e));
            let result = explorer.extract_named(&kind, &text).await.unwrap_or_else(|e| fail(e));
            println!("{}", result);
        }

        Command::Serve { host, port } => {
            let explorer = match build_explorer(&config, pipeline.clone()) {
                Ok(explorer) => Some(explorer),
                Err(e) => {
                    warn!("analysis endpoints disabled: {}", e);
                    None
                }
            };
            server::start(&host, port, pipeline, explorer).await;
        }
    }
}
