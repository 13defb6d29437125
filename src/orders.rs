use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// A single retail order line
///
/// Mirrors one row of the `Orders` sheet. Only the columns the dashboard
/// aggregates over are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Day the order was placed
    pub order_date: NaiveDate,

    /// City the order shipped to
    pub city: String,

    /// State the order shipped to
    pub state: String,

    /// Sales region (e.g. "West")
    pub region: String,

    /// Product category (e.g. "Furniture")
    pub category: String,

    /// Customer segment (e.g. "Consumer")
    pub segment: String,

    /// Shipping mode (e.g. "Second Class")
    pub ship_mode: String,

    /// Sales amount
    pub sales: f64,

    /// Profit amount, negative for a loss
    pub profit: f64,
}

/// Text columns a record can be grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    City,
    State,
    Region,
    Category,
    Segment,
    ShipMode,
}

impl Dimension {
    /// Returns the column value of `record` for this dimension
    pub fn key<'r>(&self, record: &'r OrderRecord) -> &'r str {
        match self {
            Dimension::City => &record.city,
            Dimension::State => &record.state,
            Dimension::Region => &record.region,
            Dimension::Category => &record.category,
            Dimension::Segment => &record.segment,
            Dimension::ShipMode => &record.ship_mode,
        }
    }

    /// Header of the source column, also used as the axis label
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::City => "City",
            Dimension::State => "State",
            Dimension::Region => "Region",
            Dimension::Category => "Category",
            Dimension::Segment => "Segment",
            Dimension::ShipMode => "Ship Mode",
        }
    }
}

/// Numeric columns a record can be summed over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Sales,
    Profit,
}

impl Measure {
    pub fn value(&self, record: &OrderRecord) -> f64 {
        match self {
            Measure::Sales => record.sales,
            Measure::Profit => record.profit,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Measure::Sales => "Sales",
            Measure::Profit => "Profit",
        }
    }
}

/// City and category selection coming from the two dropdowns
///
/// A cleared dropdown arrives either as a missing parameter or as an empty
/// string; both deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub city: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub category: Option<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

impl OrderFilter {
    /// Builds a filter, treating empty strings as "no selection"
    pub fn new(city: Option<&str>, category: Option<&str>) -> Self {
        Self {
            city: city.filter(|s| !s.is_empty()).map(str::to_string),
            category: category.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    /// True when at least one dropdown has a selection
    pub fn is_active(&self) -> bool {
        self.city.is_some() || self.category.is_some()
    }

    pub fn matches(&self, record: &OrderRecord) -> bool {
        let city_ok = self.city.as_deref().is_none_or(|c| record.city == c);
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|c| record.category == c);
        city_ok && category_ok
    }
}

/// The in-memory order table
///
/// Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct OrdersTable {
    records: Vec<OrderRecord>,
}

impl OrdersTable {
    pub fn new(records: Vec<OrderRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct values of a text column, sorted ascending
    pub fn unique_values(&self, dimension: Dimension) -> Vec<String> {
        self.records
            .iter()
            .map(|r| dimension.key(r))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Options of the city dropdown
    pub fn cities(&self) -> Vec<String> {
        self.unique_values(Dimension::City)
    }

    /// Options of the category dropdown
    pub fn categories(&self) -> Vec<String> {
        self.unique_values(Dimension::Category)
    }

    /// Rows matching the filter, in table order
    pub fn filter(&self, filter: &OrderFilter) -> Vec<&OrderRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_table;
    use super::*;

    #[test]
    fn test_unique_values_are_sorted_and_distinct() {
        let table = sample_table();
        assert_eq!(
            table.cities(),
            vec![
                "Fort Lauderdale",
                "Henderson",
                "Los Angeles",
                "New York City",
                "Philadelphia",
                "Seattle"
            ]
        );
        assert_eq!(
            table.categories(),
            vec!["Furniture", "Office Supplies", "Technology"]
        );
    }

    #[test]
    fn test_filter_without_selection_keeps_all_rows() {
        let table = sample_table();
        assert_eq!(table.filter(&OrderFilter::default()).len(), table.len());
    }

    #[test]
    fn test_filter_by_city_and_category() {
        let table = sample_table();

        let by_city = table.filter(&OrderFilter::new(Some("Los Angeles"), None));
        assert_eq!(by_city.len(), 3);
        assert!(by_city.iter().all(|r| r.city == "Los Angeles"));

        let by_category = table.filter(&OrderFilter::new(None, Some("Technology")));
        assert_eq!(by_category.len(), 3);

        let both = table.filter(&OrderFilter::new(
            Some("Los Angeles"),
            Some("Office Supplies"),
        ));
        assert_eq!(both.len(), 2);
        assert!(
            both.iter()
                .all(|r| r.city == "Los Angeles" && r.category == "Office Supplies")
        );
    }

    #[test]
    fn test_unknown_value_yields_empty_subset() {
        let table = sample_table();
        let filter = OrderFilter::new(Some("Atlantis"), None);
        assert!(table.filter(&filter).is_empty());
    }

    #[test]
    fn test_empty_strings_mean_no_selection() {
        let filter = OrderFilter::new(Some(""), Some(""));
        assert!(!filter.is_active());
        assert_eq!(filter, OrderFilter::default());

        let from_json: OrderFilter =
            serde_json::from_str(r#"{"city": "", "category": "Furniture"}"#).unwrap();
        assert_eq!(from_json.city, None);
        assert_eq!(from_json.category.as_deref(), Some("Furniture"));
        assert!(from_json.is_active());
    }
}
