/*!
housemap Command Line Interface

Renders the dashboard page (or just the map fragment) for a given
selection, and lists the snapshot months available in the data window.
*/

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use housemap::map::MapSpec;
use housemap::selection::{Metric, PropertyType, Selection};
use housemap::writer::{LeafletWriter, Writer};
use housemap::{page, pipeline, reader, VERSION};

#[derive(Parser)]
#[command(name = "housemap")]
#[command(about = "U.S. housing-market choropleth dashboard")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the dashboard for one selection
    Render {
        /// Path to the gzip-compressed market tracker TSV
        #[arg(long, default_value = "state_market_tracker.tsv000.gz")]
        market: PathBuf,

        /// Path to the state-boundary GeoJSON
        #[arg(long, default_value = "us-state-boundaries.geojson")]
        boundaries: PathBuf,

        /// Snapshot month (period_begin); defaults to the most recent
        #[arg(long)]
        period: Option<String>,

        /// Property type label
        #[arg(long, default_value = "All Residential")]
        property_type: String,

        /// Metric column
        #[arg(long, default_value = "median_sale_price")]
        metric: String,

        /// Emit only the map fragment instead of the full page
        #[arg(long, default_value = "false")]
        map_only: bool,

        /// Output file path (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List the snapshot months available in the data window
    Months {
        /// Path to the gzip-compressed market tracker TSV
        #[arg(long, default_value = "state_market_tracker.tsv000.gz")]
        market: PathBuf,

        /// Path to the state-boundary GeoJSON
        #[arg(long, default_value = "us-state-boundaries.geojson")]
        boundaries: PathBuf,
    },
}

type Joined = (
    polars::prelude::DataFrame,
    std::sync::Arc<reader::BoundaryCollection>,
);

fn load_joined(market: &Path, boundaries: &Path) -> anyhow::Result<Joined> {
    let market = reader::read_market(market)?;
    let bounds = reader::read_boundaries(boundaries)?;
    let joined = pipeline::join_boundaries(
        &pipeline::market_window(&market)?,
        &bounds.attribute_frame()?,
    )?;
    Ok((joined, bounds))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            market,
            boundaries,
            period,
            property_type,
            metric,
            map_only,
            output,
        } => {
            let (joined, bounds) = load_joined(&market, &boundaries)?;
            let months = pipeline::snapshot_months(&joined)?;

            let mut selection = Selection::default_for(&joined)?;
            if let Some(period) = period {
                selection.period_begin = period;
            }
            selection.property_type = PropertyType::from_label(&property_type)?;
            selection.metric = Metric::from_column(&metric)?;

            let filtered = pipeline::apply_selection(&joined, &selection)?;
            let writer = LeafletWriter::new();
            let map_html = writer.write(&MapSpec::for_selection(&selection), &filtered, &bounds)?;

            let rendered = if map_only {
                map_html
            } else {
                page::compose(&selection, &months, &map_html)
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, &rendered)?;
                    println!("Dashboard written to: {}", path.display());
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Months { market, boundaries } => {
            let (joined, _) = load_joined(&market, &boundaries)?;
            for month in pipeline::snapshot_months(&joined)? {
                println!("{}", month);
            }
        }
    }

    Ok(())
}
