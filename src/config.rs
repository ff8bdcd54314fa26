use std::path::PathBuf;

use crate::model::{Category, CategoryTable};

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;
const WAL_FILE_NAME: &str = "bookings.wal";

/// Runtime settings read from `VACANCY_*` environment variables.
///
/// Unparsable values fall back to the default (or stay unset) rather than
/// aborting startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub compact_threshold: u64,
    /// Baseline per category from `VACANCY_CAPACITY_<CATEGORY>`. Kept signed so
    /// a negative value reaches the engine and is refused there.
    pub capacities: CategoryTable<Option<i64>>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_dir: lookup("VACANCY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            metrics_port: lookup("VACANCY_METRICS_PORT").and_then(|s| s.trim().parse().ok()),
            compact_threshold: lookup("VACANCY_COMPACT_THRESHOLD")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_COMPACT_THRESHOLD),
            capacities: CategoryTable::from_fn(|category| {
                let key = format!("VACANCY_CAPACITY_{}", category.as_str().to_uppercase());
                lookup(&key).and_then(|s| s.trim().parse().ok())
            }),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(WAL_FILE_NAME)
    }

    pub fn capacity(&self, category: Category) -> Option<i64> {
        self.capacities[category]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let c = config(&[]);
        assert_eq!(c.data_dir, PathBuf::from("./data"));
        assert_eq!(c.metrics_port, None);
        assert_eq!(c.compact_threshold, 1000);
        for category in Category::ALL {
            assert_eq!(c.capacity(category), None);
        }
        assert_eq!(c.wal_path(), PathBuf::from("./data").join("bookings.wal"));
    }

    #[test]
    fn reads_every_setting() {
        let c = config(&[
            ("VACANCY_DATA_DIR", "/var/lib/vacancy"),
            ("VACANCY_METRICS_PORT", "9100"),
            ("VACANCY_COMPACT_THRESHOLD", "50"),
            ("VACANCY_CAPACITY_DOUBLE", "1"),
            ("VACANCY_CAPACITY_TWIN", " 3 "),
            ("VACANCY_CAPACITY_QUEEN", "5"),
            ("VACANCY_CAPACITY_KING", "0"),
        ]);
        assert_eq!(c.wal_path(), PathBuf::from("/var/lib/vacancy/bookings.wal"));
        assert_eq!(c.metrics_port, Some(9100));
        assert_eq!(c.compact_threshold, 50);
        assert_eq!(c.capacity(Category::Double), Some(1));
        assert_eq!(c.capacity(Category::Twin), Some(3));
        assert_eq!(c.capacity(Category::Queen), Some(5));
        assert_eq!(c.capacity(Category::King), Some(0));
    }

    #[test]
    fn bad_values_fall_back() {
        let c = config(&[
            ("VACANCY_METRICS_PORT", "not-a-port"),
            ("VACANCY_COMPACT_THRESHOLD", "-1"),
            ("VACANCY_CAPACITY_TWIN", "three"),
            ("VACANCY_CAPACITY_KING", "-4"),
        ]);
        assert_eq!(c.metrics_port, None);
        assert_eq!(c.compact_threshold, 1000);
        assert_eq!(c.capacity(Category::Twin), None);
        // negative survives parsing so the engine can refuse it
        assert_eq!(c.capacity(Category::King), Some(-4));
    }
}
