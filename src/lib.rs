/*!
# Sales Dashboard

A browser-based dashboard over a spreadsheet of retail orders, built in Rust.

## Overview

The order workbook is read once at startup and kept in memory. Every chart is
recomputed from that table on request, so the city and category dropdowns on
the page re-aggregate the filtered charts without touching the file again.

## Architecture

### Data Layer
- **loader**: Reads the `Orders` sheet (xlsx, xls, ods) or a CSV export into typed records
- **orders**: Order records, the loaded table, dimensions, measures and the dropdown filter

### Chart Layer
- **aggregate**: Group-by sums, counts, rankings and the daily sales series
- **figure**: Chart definitions, titles, colors and the serializable figure model
- **graph**: PNG rendering of figures with plotters

### Web Layer
- **app**: Routing, page template and server lifecycle (axum)
- **downloader**: Export of the filtered orders (CSV, XLSX)

### Ambient
- **config**: Command line and environment settings
- **error**: Crate error type and its HTTP mapping

## Charts

| Chart | Kind | Follows filters |
|-------|------|-----------------|
| Sales by product category | bar | yes |
| Sales distribution across regions | pie | yes |
| Share of shipping modes | pie | yes |
| Profit versus sales | scatter | yes |
| Sales by customer segment | bar | yes |
| Sales trend over time | line | yes |
| Top 10 cities by sales | bar | no |
| Top 5 states by sales | bar | no |

## REST API Endpoints

- `/` - Dashboard page with the dropdown options embedded
- `/health` - Liveness and loaded order count
- `/api/options` - Cities and categories for the dropdowns
- `/api/figure/{chart}` - Aggregated figure as JSON
- `/api/graph/{chart}` - Rendered figure as PNG
- `/api/export` - Filtered orders as CSV or XLSX
*/

pub mod aggregate;
pub mod app;
pub mod config;
pub mod downloader;
pub mod error;
pub mod figure;
pub mod graph;
pub mod loader;
pub mod orders;

pub use config::Config;
pub use error::{DashboardError, Result};
pub use figure::{ChartId, Figure, build_figure};
pub use loader::load_orders;
pub use orders::{OrderFilter, OrderRecord, OrdersTable};
