#![cfg(not(tarpaulin_include))]
use clap::Parser;
use sales_dashboard::config::validate_chart_size;
use sales_dashboard::graph::{self, GraphOptions};
use sales_dashboard::loader::{self, DEFAULT_SHEET};
use sales_dashboard::orders::OrderFilter;
use std::path::PathBuf;

/// Render every dashboard chart to PNG files
#[derive(Parser, Debug)]
#[command(name = "render_charts", version, about)]
struct Args {
    /// Workbook or CSV file holding the order records
    #[arg(short, long, env = "DASHBOARD_DATA", default_value = "Superstore_Sales.xlsx")]
    data: PathBuf,

    /// Worksheet to read the orders from
    #[arg(long, env = "DASHBOARD_SHEET", default_value = DEFAULT_SHEET)]
    sheet: String,

    /// Output directory for the PNG files
    #[arg(short, long, default_value = "graph_output")]
    out: PathBuf,

    /// Only include orders from this city in the filtered charts
    #[arg(long)]
    city: Option<String>,

    /// Only include orders from this category in the filtered charts
    #[arg(long)]
    category: Option<String>,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 420)]
    height: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    validate_chart_size(args.width, args.height)?;

    let table = loader::load_orders(&args.data, &args.sheet)?;
    let filter = OrderFilter::new(args.city.as_deref(), args.category.as_deref());
    let options = GraphOptions {
        width: args.width,
        height: args.height,
    };

    let charts = graph::render_all(&table, &filter, &options, &args.out)?;
    for (chart, path) in charts {
        println!("Created {} chart at {}", chart, path.display());
    }

    Ok(())
}
