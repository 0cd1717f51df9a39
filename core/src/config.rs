use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "VOCAB_API_BASE_URL", default = "http://localhost:5000/api")]
    pub api_base_url: String,

    /// Rows per page for every list view.
    #[envconfig(from = "VOCAB_PER_PAGE", default = "10")]
    pub per_page: u32,

    #[envconfig(from = "VOCAB_LIST_STALE_TIME_MS", default = "60000")]
    pub list_stale_time: EnvMsDuration,

    #[envconfig(from = "VOCAB_DETAIL_STALE_TIME_MS", default = "300000")]
    pub detail_stale_time: EnvMsDuration,

    /// Idle time after which a cached response is dropped.
    #[envconfig(from = "VOCAB_CACHE_TIME_MS", default = "600000")]
    pub cache_time: EnvMsDuration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            per_page: 10,
            list_stale_time: EnvMsDuration(time::Duration::from_secs(60)),
            detail_stale_time: EnvMsDuration(time::Duration::from_secs(300)),
            cache_time: EnvMsDuration(time::Duration::from_secs(600)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}
