use once_cell::sync::Lazy;
use serde::Deserialize;
use shared::models::FeedType;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Host every upstream page lives under, also the reverse proxy target.
    #[serde(default = "default_upstream_base")]
    pub upstream_base: String,
    #[serde(default = "default_argo_url")]
    pub argo_url: String,
    #[serde(default = "default_moored_url")]
    pub moored_url: String,
    #[serde(default = "default_rama_url")]
    pub rama_url: String,
    /// The OMNI network has no public listing endpoint.
    #[serde(default)]
    pub omni_url: Option<String>,
    #[serde(default = "default_moored_data_path")]
    pub moored_data_path: String,
    #[serde(default = "default_feed_timeout_secs")]
    pub feed_timeout_secs: u64,
    #[serde(default = "default_rama_timeout_secs")]
    pub rama_timeout_secs: u64,
    #[serde(default = "default_scrape_timeout_secs")]
    pub scrape_timeout_secs: u64,
    #[serde(default = "default_proxy_timeout_secs")]
    pub proxy_timeout_secs: u64,
    /// 0 disables the listing cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_upstream_base() -> String {
    "https://incois.gov.in".to_string()
}

fn default_argo_url() -> String {
    "https://incois.gov.in/OON/fetchArgoData.jsp".to_string()
}

fn default_moored_url() -> String {
    "https://incois.gov.in/OON/fetchMooredBuoyData.jsp".to_string()
}

fn default_rama_url() -> String {
    "https://incois.gov.in/geoserver/JointPortal/ows?service=WFS&version=1.0.0&request=GetFeature&typeName=JointPortal:Ramabuoys&outputFormat=application/json".to_string()
}

fn default_moored_data_path() -> String {
    "/site/datainfo/moored_omnidata_stock.jsp".to_string()
}

fn default_feed_timeout_secs() -> u64 {
    30
}

fn default_rama_timeout_secs() -> u64 {
    20
}

fn default_scrape_timeout_secs() -> u64 {
    45
}

fn default_proxy_timeout_secs() -> u64 {
    30
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://localhost:5000".to_string(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            upstream_base: default_upstream_base(),
            argo_url: default_argo_url(),
            moored_url: default_moored_url(),
            rama_url: default_rama_url(),
            omni_url: None,
            moored_data_path: default_moored_data_path(),
            feed_timeout_secs: default_feed_timeout_secs(),
            rama_timeout_secs: default_rama_timeout_secs(),
            scrape_timeout_secs: default_scrape_timeout_secs(),
            proxy_timeout_secs: default_proxy_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Config {
    pub fn feed_url(&self, feed: FeedType) -> Option<&str> {
        match feed {
            FeedType::Argo => Some(&self.argo_url),
            FeedType::Moored => Some(&self.moored_url),
            FeedType::Rama => Some(&self.rama_url),
            FeedType::Omni => self.omni_url.as_deref(),
        }
    }

    pub fn feed_timeout(&self, feed: FeedType) -> Duration {
        match feed {
            FeedType::Rama => Duration::from_secs(self.rama_timeout_secs),
            _ => Duration::from_secs(self.feed_timeout_secs),
        }
    }

    /// Absolute URL of the moored-buoy chart page.
    pub fn moored_data_url(&self) -> String {
        format!(
            "{}{}",
            self.upstream_base.trim_end_matches('/'),
            self.moored_data_path
        )
    }

    pub fn frame_ancestors(&self) -> String {
        let mut policy = "frame-ancestors 'self'".to_string();
        for origin in &self.allowed_origins {
            policy.push(' ');
            policy.push_str(origin);
        }
        policy
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    envy::prefixed("INCOIS_")
        .from_env::<Config>()
        .expect("Invalid INCOIS_* configuration in environment")
});

pub fn config() -> &'static Config {
    &CONFIG
}
