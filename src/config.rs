use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::cli::FetchArgs;
use crate::fetch::HttpFetcherOptions;
use crate::source::Endpoints;
use crate::throttle::Throttle;

pub const DEFAULT_ORIGIN: &str = "https://www.safaribooksonline.com";
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_COVER_SIZE: &str = "720h";

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub origin: Url,
    /// Minimum spacing between request starts within one batch.
    pub interval: Duration,
    pub max_in_flight: Option<usize>,
    pub cover_size: String,
    pub user_agent: String,
    pub cookie: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin is a valid url"),
            interval: DEFAULT_INTERVAL,
            max_in_flight: None,
            cover_size: DEFAULT_COVER_SIZE.to_owned(),
            user_agent: concat!("bookpack/", env!("CARGO_PKG_VERSION")).to_owned(),
            cookie: None,
            request_timeout: None,
        }
    }
}

impl JobConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `BOOKPACK_*` variables as returned by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(raw) = var("BOOKPACK_ORIGIN") {
            config.origin = parse_origin(&raw).context("BOOKPACK_ORIGIN")?;
        }
        if let Some(raw) = var("BOOKPACK_INTERVAL_MS") {
            let ms = raw
                .parse::<u64>()
                .with_context(|| format!("invalid BOOKPACK_INTERVAL_MS={raw:?}"))?;
            config.interval = Duration::from_millis(ms);
        }
        if let Some(raw) = var("BOOKPACK_MAX_IN_FLIGHT") {
            let max = raw
                .parse::<usize>()
                .with_context(|| format!("invalid BOOKPACK_MAX_IN_FLIGHT={raw:?}"))?;
            config.max_in_flight = (max > 0).then_some(max);
        }
        if let Some(raw) = var("BOOKPACK_COVER_SIZE") {
            config.cover_size = raw;
        }
        if let Some(raw) = var("BOOKPACK_USER_AGENT") {
            config.user_agent = raw;
        }
        if let Some(raw) = var("BOOKPACK_COOKIE") {
            config.cookie = Some(raw);
        }
        if let Some(raw) = var("BOOKPACK_TIMEOUT_SECS") {
            let secs = raw
                .parse::<u64>()
                .with_context(|| format!("invalid BOOKPACK_TIMEOUT_SECS={raw:?}"))?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Command-line flags win over the environment.
    pub fn apply_args(mut self, args: &FetchArgs) -> anyhow::Result<Self> {
        if let Some(origin) = args.origin.as_deref() {
            self.origin = parse_origin(origin).context("--origin")?;
        }
        if let Some(ms) = args.interval_ms {
            self.interval = Duration::from_millis(ms);
        }
        if let Some(max) = args.max_in_flight {
            self.max_in_flight = (max > 0).then_some(max);
        }
        if let Some(cover_size) = &args.cover_size {
            self.cover_size = cover_size.clone();
        }
        Ok(self)
    }

    pub fn throttle(&self) -> Throttle {
        Throttle::new(self.interval).with_max_in_flight(self.max_in_flight)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.origin.clone(), self.cover_size.clone())
    }

    pub fn fetcher_options(&self) -> HttpFetcherOptions {
        HttpFetcherOptions {
            user_agent: self.user_agent.clone(),
            cookie: self.cookie.clone(),
            timeout: self.request_timeout,
        }
    }
}

fn parse_origin(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("parse origin url: {raw}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("origin must be http/https: {url}");
    }
    if url.host_str().is_none() {
        anyhow::bail!("origin must have a host: {url}");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = JobConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.origin.as_str(), "https://www.safaribooksonline.com/");
        assert_eq!(config.interval, Duration::from_millis(1000));
        assert_eq!(config.max_in_flight, None);
        assert_eq!(config.cover_size, "720h");
        assert!(config.cookie.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = JobConfig::from_lookup(lookup(&[
            ("BOOKPACK_ORIGIN", "http://127.0.0.1:8080"),
            ("BOOKPACK_INTERVAL_MS", "0"),
            ("BOOKPACK_MAX_IN_FLIGHT", "3"),
            ("BOOKPACK_COOKIE", " session=abc "),
            ("BOOKPACK_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.origin.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.interval, Duration::ZERO);
        assert_eq!(config.max_in_flight, Some(3));
        assert_eq!(config.cookie.as_deref(), Some("session=abc"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = JobConfig::from_lookup(lookup(&[("BOOKPACK_INTERVAL_MS", "  ")])).unwrap();
        assert_eq!(config.interval, DEFAULT_INTERVAL);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = JobConfig::from_lookup(lookup(&[("BOOKPACK_INTERVAL_MS", "soon")]))
            .unwrap_err()
            .to_string();
        assert!(err.contains("BOOKPACK_INTERVAL_MS"));

        let err = JobConfig::from_lookup(lookup(&[("BOOKPACK_ORIGIN", "ftp://x.test")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("http/https"));
    }

    #[test]
    fn args_override_environment() {
        let config = JobConfig::from_lookup(lookup(&[("BOOKPACK_INTERVAL_MS", "250")]))
            .unwrap()
            .apply_args(&FetchArgs {
                url: "https://www.safaribooksonline.com/library/view/b/1/".to_owned(),
                out: ".".to_owned(),
                origin: None,
                interval_ms: Some(10),
                max_in_flight: Some(0),
                cover_size: None,
                force: false,
            })
            .unwrap();
        assert_eq!(config.interval, Duration::from_millis(10));
        assert_eq!(config.max_in_flight, None);
        assert_eq!(config.throttle().interval, Duration::from_millis(10));
    }
}
