//! Command-line and environment configuration.

use crate::error::{DashboardError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Smallest chart edge, in pixels, the renderer can lay out
pub const MIN_CHART_EDGE: u32 = 64;

/// Largest chart edge, in pixels, accepted from the command line
pub const MAX_CHART_EDGE: u32 = 4096;

/// Interactive sales dashboard over a spreadsheet of retail orders
#[derive(Parser, Debug, Clone)]
#[command(name = "dashboard", version, about)]
pub struct Config {
    /// Workbook or CSV file holding the order records
    #[arg(short, long, env = "DASHBOARD_DATA", default_value = "Superstore_Sales.xlsx")]
    pub data: PathBuf,

    /// Worksheet to read the orders from
    #[arg(long, env = "DASHBOARD_SHEET", default_value = "Orders")]
    pub sheet: String,

    /// Address to listen on
    #[arg(long, env = "DASHBOARD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "DASHBOARD_PORT", default_value_t = 8051)]
    pub port: u16,

    /// Directory served under /static
    #[arg(long, env = "DASHBOARD_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Chart image width in pixels
    #[arg(long, env = "DASHBOARD_CHART_WIDTH", default_value_t = 640)]
    pub chart_width: u32,

    /// Chart image height in pixels
    #[arg(long, env = "DASHBOARD_CHART_HEIGHT", default_value_t = 420)]
    pub chart_height: u32,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// `host:port` string handed to the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rejects settings the server cannot start with
    pub fn validate(&self) -> Result<()> {
        validate_chart_size(self.chart_width, self.chart_height)
    }
}

pub fn validate_chart_size(width: u32, height: u32) -> Result<()> {
    for (name, value) in [("chart width", width), ("chart height", height)] {
        if !(MIN_CHART_EDGE..=MAX_CHART_EDGE).contains(&value) {
            return Err(DashboardError::Config(format!(
                "{} must be between {} and {}, got {}",
                name, MIN_CHART_EDGE, MAX_CHART_EDGE, value
            )));
        }
    }
    Ok(())
}
