use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use census_quoter::app::census_use_case::{CensusUseCase, QuotedCensus};
use census_quoter::app::ports::{RecordParserPort, RendererPort};
use census_quoter::config::{Config, DEFAULT_CONFIG_PATH};
use census_quoter::infra::csv_parser::CsvRecordParser;
use census_quoter::infra::in_memory_store::InMemoryRecordStore;
use census_quoter::infra::svg_renderer::SvgRenderer;
use census_quoter::quote::compute_age_band_stats;
use census_quoter::quote::{multipliers_from_stats, quote_from_multipliers};
use census_quoter::server::{start_server, AppState};
use census_quoter::types::{AgeBandStats, QuoteTable};
use census_quoter::{logging, metrics};

#[derive(Parser)]
#[command(name = "census_quoter")]
#[command(about = "Census ingestion and age-banded premium quoting")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a local census file into an in-memory store and render its quote
    Ingest {
        #[arg(long)]
        file: PathBuf,
        /// Directory receiving the rendered SVG artifacts
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },
    /// Compute the quote for a local census file without persisting anything
    Quote {
        #[arg(long)]
        file: PathBuf,
    },
    /// Serve the census event webhook
    Serve {
        /// Overrides the configured port
        #[arg(long)]
        port: Option<u16>,
    },
}

fn print_quote(quote: &QuoteTable, stats: &AgeBandStats) {
    println!("\n{:<10}{:>12}{:>14}{:>10}", "Age Band", "Small", "Significant", "Major");
    for row in &quote.rows {
        println!("{:<10}{:>12}{:>14}{:>10}", row.label, row.small, row.significant, row.major);
    }
    println!(
        "\nDistribution: < 40 {:.1}%  40-59 {:.1}%  60+ {:.1}%",
        stats.band1 * 100.0,
        stats.band2 * 100.0,
        stats.band3 * 100.0
    );
}

fn write_artifacts(quoted: &QuotedCensus, renderer: &dyn RendererPort, output_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(output_dir)?;
    let rendered = [
        renderer.render_quote_table(&quoted.quote),
        renderer.render_distribution_chart(&quoted.stats),
    ];
    for image in rendered {
        match image {
            Ok(image) => {
                let path = output_dir.join(&image.filename);
                fs::write(&path, &image.bytes)?;
                info!("Wrote {}", path.display());
            }
            Err(e) => warn!("Rendering failed: {:#}", e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load_from(&cli.config)?;
    let _log_guard = logging::init_logging(&config.logging);
    metrics::init_metrics(config.metrics_addr()?);

    let today = Local::now().date_naive();

    match cli.command {
        Commands::Ingest { file, output_dir } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("reading census file {}", file.display()))?;
            let renderer = Arc::new(SvgRenderer::default());
            let use_case = CensusUseCase::new(
                Arc::new(InMemoryRecordStore::new()),
                Arc::new(CsvRecordParser::new()),
                renderer.clone(),
                config.chat.channel.clone(),
            );

            match use_case.ingest_and_quote(&source, &file.display().to_string(), today).await {
                Ok(quoted) => {
                    println!(
                        "Census {}: {} rows committed in {} batch(es)",
                        quoted.ingestion.census_id,
                        quoted.ingestion.rows.len(),
                        quoted.ingestion.batches_committed
                    );
                    print_quote(&quoted.quote, &quoted.stats);
                    write_artifacts(&quoted, renderer.as_ref(), &output_dir)?;
                }
                Err(e) => {
                    error!(stage = e.stage(), "Ingestion failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Quote { file } => {
            let source = fs::read_to_string(&file)
                .with_context(|| format!("reading census file {}", file.display()))?;
            let rows = CsvRecordParser::new().parse(&source)?;
            let (_, stats) = compute_age_band_stats(&rows, today)?;
            let quote = quote_from_multipliers(&multipliers_from_stats(&stats));
            print_quote(&quote, &stats);
        }
        Commands::Serve { port } => {
            let use_case = CensusUseCase::new(
                Arc::new(InMemoryRecordStore::new()),
                Arc::new(CsvRecordParser::new()),
                Arc::new(SvgRenderer::default()),
                config.chat.channel.clone(),
            );
            let state = AppState {
                use_case: Arc::new(use_case),
                chat_api_base: config.chat.api_base.clone(),
            };
            start_server(state, port.unwrap_or(config.server.port)).await?;
        }
    }
    Ok(())
}
