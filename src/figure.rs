use crate::aggregate::{self, DateTotal, GroupTotal};
use crate::error::DashboardError;
use crate::orders::{Dimension, Measure, OrderFilter, OrdersTable};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Title font size of a chart drawn over the whole table
pub const DEFAULT_TITLE_SIZE: u32 = 16;

/// Title font size once a city or category is selected
pub const FILTERED_TITLE_SIZE: u32 = 13;

pub const TOP_CITIES: usize = 10;
pub const TOP_STATES: usize = 5;

/// An RGB color, serialized as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

/// Qualitative pastel palette
///
/// Pie slices and scatter series cycle through it; bars use it as a
/// continuous scale.
pub const PALETTE: [Rgb; 11] = [
    Rgb(102, 197, 204),
    Rgb(246, 207, 113),
    Rgb(248, 156, 116),
    Rgb(220, 176, 242),
    Rgb(135, 197, 95),
    Rgb(158, 185, 243),
    Rgb(254, 136, 177),
    Rgb(201, 219, 116),
    Rgb(139, 224, 164),
    Rgb(180, 151, 231),
    Rgb(179, 179, 179),
];

/// Palette color for the `index`-th series or slice
pub fn palette_color(index: usize) -> Rgb {
    PALETTE[index % PALETTE.len()]
}

/// Maps `value` onto the palette used as a continuous scale
///
/// `min` maps to the first stop and `max` to the last; colors in between
/// are linearly interpolated between neighbouring stops.
pub fn continuous_color(value: f64, min: f64, max: f64) -> Rgb {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let position = t * (PALETTE.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(PALETTE.len() - 1);
    let frac = position - lower as f64;

    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (PALETTE[lower], PALETTE[upper]);
    Rgb(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// Charts shown on the dashboard, in page order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartId {
    CategorySales,
    RegionSales,
    ShipMode,
    ProfitSales,
    SegmentSales,
    SalesTrend,
    TopCities,
    TopStates,
}

impl ChartId {
    pub const ALL: [ChartId; 8] = [
        ChartId::CategorySales,
        ChartId::RegionSales,
        ChartId::ShipMode,
        ChartId::ProfitSales,
        ChartId::SegmentSales,
        ChartId::SalesTrend,
        ChartId::TopCities,
        ChartId::TopStates,
    ];

    /// URL and element identifier of the chart
    pub fn slug(&self) -> &'static str {
        match self {
            ChartId::CategorySales => "category-sales",
            ChartId::RegionSales => "region-sales",
            ChartId::ShipMode => "ship-mode",
            ChartId::ProfitSales => "profit-sales",
            ChartId::SegmentSales => "segment-sales",
            ChartId::SalesTrend => "sales-trend",
            ChartId::TopCities => "top-cities",
            ChartId::TopStates => "top-states",
        }
    }

    pub fn base_title(&self) -> &'static str {
        match self {
            ChartId::CategorySales => "Sales by product category",
            ChartId::RegionSales => "Sales distribution across regions",
            ChartId::ShipMode => "Share of shipping modes",
            ChartId::ProfitSales => "Profit versus sales",
            ChartId::SegmentSales => "Sales by customer segment",
            ChartId::SalesTrend => "Sales trend over time",
            ChartId::TopCities => "Top 10 cities by sales",
            ChartId::TopStates => "Top 5 states by sales",
        }
    }

    /// Whether the dropdown selection re-aggregates this chart
    pub fn is_filtered(&self) -> bool {
        !matches!(self, ChartId::TopCities | ChartId::TopStates)
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ChartId {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartId::ALL
            .into_iter()
            .find(|c| c.slug() == s)
            .ok_or_else(|| DashboardError::UnknownChart(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub name: String,
    pub color: Rgb,
    pub points: Vec<(f64, f64)>,
}

/// Plotted data of a figure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FigureData {
    Bar { bars: Vec<Bar> },
    Pie { slices: Vec<Slice> },
    Scatter { series: Vec<ScatterSeries> },
    Line { points: Vec<DateTotal> },
}

/// A chart ready to be drawn or sent to the browser
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub chart: ChartId,
    pub title: String,
    pub title_size: u32,
    pub x_label: String,
    pub y_label: String,
    pub data: FigureData,
}

impl Figure {
    /// True when there is nothing to plot
    pub fn is_empty(&self) -> bool {
        match &self.data {
            FigureData::Bar { bars } => bars.is_empty(),
            FigureData::Pie { slices } => slices.iter().all(|s| s.value <= 0.0),
            FigureData::Scatter { series } => series.iter().all(|s| s.points.is_empty()),
            FigureData::Line { points } => points.is_empty(),
        }
    }
}

/// Appends the current selection to a chart title
pub fn generate_title(base: &str, filter: &OrderFilter) -> String {
    match (filter.city.as_deref(), filter.category.as_deref()) {
        (Some(city), Some(category)) => format!("{} for {} in {}", base, category, city),
        (Some(city), None) => format!("{} in {}", base, city),
        (None, Some(category)) => format!("{} for {}", base, category),
        (None, None) => base.to_string(),
    }
}

pub fn title_size(filter: &OrderFilter) -> u32 {
    if filter.is_active() {
        FILTERED_TITLE_SIZE
    } else {
        DEFAULT_TITLE_SIZE
    }
}

fn bars(totals: Vec<GroupTotal>) -> FigureData {
    let min = totals.iter().map(|t| t.value).fold(f64::INFINITY, f64::min);
    let max = totals.iter().map(|t| t.value).fold(f64::NEG_INFINITY, f64::max);
    FigureData::Bar {
        bars: totals
            .into_iter()
            .map(|t| Bar {
                color: continuous_color(t.value, min, max),
                label: t.key,
                value: t.value,
            })
            .collect(),
    }
}

fn slices(totals: Vec<GroupTotal>) -> FigureData {
    FigureData::Pie {
        slices: aggregate::sort_descending(totals)
            .into_iter()
            .enumerate()
            .map(|(i, t)| Slice {
                label: t.key,
                value: t.value,
                color: palette_color(i),
            })
            .collect(),
    }
}

/// Builds the figure for `chart` over the rows selected by `filter`
///
/// Charts that are not filtered ignore the selection and always cover the
/// whole table.
pub fn build_figure(chart: ChartId, table: &OrdersTable, filter: &OrderFilter) -> Figure {
    let filter = if chart.is_filtered() {
        filter.clone()
    } else {
        OrderFilter::default()
    };
    let rows = table.filter(&filter);
    let sales = Measure::Sales.label().to_string();

    let (x_label, y_label, data) = match chart {
        ChartId::CategorySales => (
            Dimension::Category.label().to_string(),
            sales,
            bars(aggregate::sum_by(&rows, Dimension::Category, Measure::Sales)),
        ),
        ChartId::RegionSales => (
            Dimension::Region.label().to_string(),
            sales,
            slices(aggregate::sum_by(&rows, Dimension::Region, Measure::Sales)),
        ),
        ChartId::ShipMode => (
            Dimension::ShipMode.label().to_string(),
            "Orders".to_string(),
            slices(aggregate::count_by(&rows, Dimension::ShipMode)),
        ),
        ChartId::ProfitSales => (
            sales,
            Measure::Profit.label().to_string(),
            FigureData::Scatter {
                series: aggregate::scatter_by(
                    &rows,
                    Dimension::Category,
                    Measure::Sales,
                    Measure::Profit,
                )
                .into_iter()
                .enumerate()
                .map(|(i, (name, points))| ScatterSeries {
                    name,
                    color: palette_color(i),
                    points,
                })
                .collect(),
            },
        ),
        ChartId::SegmentSales => (
            Dimension::Segment.label().to_string(),
            sales,
            bars(aggregate::sum_by(&rows, Dimension::Segment, Measure::Sales)),
        ),
        ChartId::SalesTrend => (
            "Order Date".to_string(),
            sales,
            FigureData::Line {
                points: aggregate::sum_by_date(&rows, Measure::Sales),
            },
        ),
        ChartId::TopCities => (
            Dimension::City.label().to_string(),
            sales,
            bars(aggregate::top_n(
                aggregate::sum_by(&rows, Dimension::City, Measure::Sales),
                TOP_CITIES,
            )),
        ),
        ChartId::TopStates => (
            Dimension::State.label().to_string(),
            sales,
            bars(aggregate::top_n(
                aggregate::sum_by(&rows, Dimension::State, Measure::Sales),
                TOP_STATES,
            )),
        ),
    };

    Figure {
        chart,
        title: generate_title(chart.base_title(), &filter),
        title_size: title_size(&filter),
        x_label,
        y_label,
        data,
    }
}
