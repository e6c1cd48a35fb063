//! Reads the order list a run starts from.
//!
//! The input is a JSON array of `{"id": "...", "name": "...", "prepTime": n}`
//! records, where `prepTime` is a whole number of time units.

use crate::model::Order;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read orders from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed order list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate order id '{0}'")]
    DuplicateId(String),
}

/// One order as it appears on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "prepTime")]
    pub prep_time: u32,
}

impl OrderRecord {
    pub fn into_order(self, time_unit: Duration) -> Order {
        Order::new(self.id, self.name, time_unit.saturating_mul(self.prep_time))
    }
}

/// Parses an order list, keeping file order.
pub fn parse_orders(json: &str, time_unit: Duration) -> Result<Vec<Order>, LoadError> {
    let records: Vec<OrderRecord> = serde_json::from_str(json)?;

    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        if !seen.insert(record.id.as_str()) {
            return Err(LoadError::DuplicateId(record.id.clone()));
        }
    }

    Ok(records.into_iter().map(|r| r.into_order(time_unit)).collect())
}

pub fn load_orders(path: &Path, time_unit: Duration) -> Result<Vec<Order>, LoadError> {
    let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let orders = parse_orders(&json, time_unit)?;
    info!(path = %path.display(), count = orders.len(), "Orders loaded");
    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"id": "1", "name": "Order 1", "prepTime": 10},
        {"id": "2", "name": "Order 2", "prepTime": 15}
    ]"#;

    #[test]
    fn test_parses_records_in_order() {
        let orders = parse_orders(SAMPLE, Duration::from_secs(1)).unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id().0, "1");
        assert_eq!(orders[0].name(), "Order 1");
        assert_eq!(orders[0].prep_time(), Duration::from_secs(10));
        assert_eq!(orders[1].prep_time(), Duration::from_secs(15));
        assert!(!orders[0].is_ready());
    }

    #[test]
    fn test_prep_time_scales_with_time_unit() {
        let orders = parse_orders(SAMPLE, Duration::from_millis(10)).unwrap();
        assert_eq!(orders[1].prep_time(), Duration::from_millis(150));
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert!(parse_orders("[]", Duration::from_secs(1)).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_duplicates_and_bad_records() {
        let dup = r#"[{"id":"1","name":"a","prepTime":1},{"id":"1","name":"b","prepTime":2}]"#;
        assert!(matches!(
            parse_orders(dup, Duration::from_secs(1)),
            Err(LoadError::DuplicateId(id)) if id == "1"
        ));

        let negative = r#"[{"id":"1","name":"a","prepTime":-1}]"#;
        assert!(matches!(parse_orders(negative, Duration::from_secs(1)), Err(LoadError::Parse(_))));

        let missing = r#"[{"id":"1","prepTime":3}]"#;
        assert!(matches!(parse_orders(missing, Duration::from_secs(1)), Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("kitchen-dispatch-orders-{}.json", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();

        let orders = load_orders(&path, Duration::from_secs(1)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(orders.len(), 2);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_orders(Path::new("no/such/orders.json"), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("no/such/orders.json"));
    }
}
