use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    /// Sent as `limit` when set; otherwise the server's default page size applies.
    pub page_size: Option<u32>,
    pub timeout: Duration,
    pub db_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = lookup("JOBHUB_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let page_size = match lookup("JOBHUB_PAGE_SIZE") {
            Some(raw) => Some(parse_positive(&raw).context("Invalid JOBHUB_PAGE_SIZE")? as u32),
            None => None,
        };

        let timeout = match lookup("JOBHUB_TIMEOUT_SECS") {
            Some(raw) => {
                Duration::from_secs(parse_positive(&raw).context("Invalid JOBHUB_TIMEOUT_SECS")?)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
            page_size,
            timeout,
            db_path: lookup("JOBHUB_DB").map(PathBuf::from),
        })
    }

    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        self
    }
}

fn parse_positive(raw: &str) -> Result<u64> {
    let value: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a number", raw))?;
    if value == 0 || value > u32::MAX as u64 {
        return Err(anyhow!("'{}' is out of range", raw));
    }
    Ok(value)
}
