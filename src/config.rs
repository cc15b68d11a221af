use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub workspace: Option<PathBuf>,
    pub busy_timeout: Duration,
    pub leaderboard_limit: usize,
    pub seed_catalog: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            workspace: None,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            seed_catalog: true,
        }
    }
}

impl DaemonConfig {
    /// Reads ECOTASKD_WORKSPACE, ECOTASKD_BUSY_TIMEOUT_MS, ECOTASKD_LEADERBOARD_LIMIT and
    /// ECOTASKD_SEED ("0"/"false"/"no"/"off" disables seeding).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let workspace = get("ECOTASKD_WORKSPACE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let busy_timeout = parse_or("ECOTASKD_BUSY_TIMEOUT_MS", get("ECOTASKD_BUSY_TIMEOUT_MS"))
            .map(Duration::from_millis)
            .unwrap_or(defaults.busy_timeout);

        let leaderboard_limit =
            parse_or::<usize>("ECOTASKD_LEADERBOARD_LIMIT", get("ECOTASKD_LEADERBOARD_LIMIT"))
                .unwrap_or(defaults.leaderboard_limit);

        let seed_catalog = match get("ECOTASKD_SEED").as_deref().map(str::trim) {
            None | Some("") => defaults.seed_catalog,
            Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"),
        };

        Self {
            workspace,
            busy_timeout,
            leaderboard_limit,
            seed_catalog,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(target: "ecotaskd", %key, value = %raw, "invalid value; using default");
            None
        }
    }
}
