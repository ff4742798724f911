use std::time::Duration;

use rand::RngCore;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::schema::DEFAULT_SERIES;

/// How [`crate::store::update`] performs its read-modify-write cycle.
#[derive(Clone, Debug)]
pub struct UpdateConfig {
    /// Series label the run is appended to.
    pub series: String,
    /// Total tries before a concurrent modification is reported as a conflict.
    pub attempts: u32,
    /// Backoff before the first retry; doubles on each further retry.
    pub base_backoff: Duration,
    pub seed: u64,
    /// `repoUrl` for a file created by the first run. `None` requires the file to exist.
    pub init_repo_url: Option<String>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            series: DEFAULT_SERIES.to_string(),
            attempts: 5,
            base_backoff: Duration::from_millis(50),
            seed: 0,
            init_repo_url: None,
        }
    }
}

impl UpdateConfig {
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }

    /// Delay before retry number `retry` (1-based), with up to 50% random jitter.
    pub fn backoff(&self, retry: u32, rng: &mut ChaCha8Rng) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        let base = self.base_backoff.saturating_mul(1 << shift);
        let half = (base.as_nanos() / 2) as u64;
        let jitter = if half == 0 { 0 } else { rng.next_u64() % half };
        base + Duration::from_nanos(jitter)
    }
}

/// Repository URL advertised by GitHub Actions, if running there.
pub fn repo_url_from_env() -> Option<String> {
    let repo = std::env::var("GITHUB_REPOSITORY").ok()?;
    let server =
        std::env::var("GITHUB_SERVER_URL").unwrap_or_else(|_| "https://github.com".to_string());
    Some(format!("{}/{}", server.trim_end_matches('/'), repo))
}
