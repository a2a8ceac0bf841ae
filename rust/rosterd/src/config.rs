use std::path::PathBuf;

pub const DEFAULT_DB_FILE: &str = "rosterd.sqlite3";
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Startup settings, read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workspace opened before the first request (`ROSTERD_WORKSPACE`).
    pub workspace: Option<PathBuf>,
    /// Database file inside the workspace (`ROSTERD_DB_FILE`).
    pub db_file: String,
    /// Log filter used when `RUST_LOG` is unset (`ROSTERD_LOG`).
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            db_file: DEFAULT_DB_FILE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut cfg = Self {
            workspace: non_empty("ROSTERD_WORKSPACE").map(PathBuf::from),
            ..Self::default()
        };
        if let Some(name) = non_empty("ROSTERD_DB_FILE") {
            if name.contains('/') || name.contains('\\') {
                anyhow::bail!("ROSTERD_DB_FILE must be a file name, got {name:?}");
            }
            cfg.db_file = name;
        }
        if let Some(filter) = non_empty("ROSTERD_LOG") {
            cfg.log_filter = filter;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let cfg = Config::from_lookup(lookup(&[
            ("ROSTERD_WORKSPACE", "/tmp/escola"),
            ("ROSTERD_DB_FILE", "turmas.sqlite3"),
            ("ROSTERD_LOG", "  "),
        ]))
        .unwrap();
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/escola")));
        assert_eq!(cfg.db_file, "turmas.sqlite3");
        assert_eq!(cfg.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn db_file_must_not_be_a_path() {
        assert!(Config::from_lookup(lookup(&[("ROSTERD_DB_FILE", "../x.db")])).is_err());
    }
}
