use std::path::PathBuf;

/// Runtime settings, read from `LABSTAT_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    /// Compact the log on open once replay exceeds this many events.
    pub compact_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            metrics_port: None,
            compact_threshold: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup("LABSTAT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            metrics_port: lookup("LABSTAT_METRICS_PORT").and_then(|s| s.parse().ok()),
            compact_threshold: lookup("LABSTAT_COMPACT_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compact_threshold),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("labstat.wal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let c = config(&[]);
        assert_eq!(c, Config::default());
        assert_eq!(c.wal_path(), PathBuf::from("./data/labstat.wal"));
    }

    #[test]
    fn reads_overrides() {
        let c = config(&[
            ("LABSTAT_DATA_DIR", "/var/lib/labstat"),
            ("LABSTAT_METRICS_PORT", "9100"),
            ("LABSTAT_COMPACT_THRESHOLD", "50"),
        ]);
        assert_eq!(c.data_dir, PathBuf::from("/var/lib/labstat"));
        assert_eq!(c.metrics_port, Some(9100));
        assert_eq!(c.compact_threshold, 50);
    }

    #[test]
    fn bad_numbers_fall_back() {
        let c = config(&[
            ("LABSTAT_METRICS_PORT", "not-a-port"),
            ("LABSTAT_COMPACT_THRESHOLD", "-3"),
        ]);
        assert_eq!(c.metrics_port, None);
        assert_eq!(c.compact_threshold, 1000);
    }
}
