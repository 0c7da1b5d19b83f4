//! Configuration management for Folio
//!
//! Every value has a default; `Config::from_env` overrides them from the
//! process environment (after `dotenvy` has loaded any `.env` file).

use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub viewer: ViewerConfig,
    pub progress_api: Option<ProgressApiConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Remote progress API used by `HttpProgressClient`
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressApiConfig {
    /// Base URL, e.g. `http://localhost:3000/api`
    pub base_url: String,
    /// Optional bearer token forwarded to the gateway
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

/// How the active page is derived from the scroll position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMode {
    /// Page whose top offset is nearest to the scroll offset
    ScrollTop,
    /// Page containing the vertical center of the viewport
    ViewportCenter,
}

impl FromStr for DetectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scroll-top" | "top" => Ok(Self::ScrollTop),
            "viewport-center" | "center" => Ok(Self::ViewportCenter),
            other => Err(format!("unknown detection mode: {}", other)),
        }
    }
}

/// Viewer behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    /// Scale used when a document is opened
    pub default_scale: f32,
    /// Lower zoom bound
    pub min_scale: f32,
    /// Upper zoom bound
    pub max_scale: f32,
    /// Zoom in/out increment
    pub zoom_step: f32,
    /// Vertical gap between page surfaces, in device pixels
    pub page_gap: f64,
    /// Height of the scroll container's visible area
    pub viewport_height: f64,
    /// Active page detection strategy
    pub detection: DetectionMode,
    /// Capacity of the viewer event channel
    pub event_capacity: usize,
    /// Timeout for opening a document
    pub open_timeout_secs: u64,
    /// Timeout for painting a single page
    pub paint_timeout_secs: u64,
    /// Timeout for fetching saved progress on open
    pub progress_timeout_secs: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_scale: 1.4,
            min_scale: 0.5,
            max_scale: 2.5,
            zoom_step: 0.3,
            page_gap: 16.0,
            viewport_height: 800.0,
            detection: DetectionMode::ScrollTop,
            event_capacity: 64,
            open_timeout_secs: 30,
            paint_timeout_secs: 30,
            progress_timeout_secs: 5,
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_scale: parse_var("FOLIO_DEFAULT_SCALE", defaults.default_scale),
            min_scale: parse_var("FOLIO_MIN_SCALE", defaults.min_scale),
            max_scale: parse_var("FOLIO_MAX_SCALE", defaults.max_scale),
            zoom_step: parse_var("FOLIO_ZOOM_STEP", defaults.zoom_step),
            page_gap: parse_var("FOLIO_PAGE_GAP", defaults.page_gap),
            viewport_height: parse_var("FOLIO_VIEWPORT_HEIGHT", defaults.viewport_height),
            detection: parse_var("FOLIO_DETECTION", defaults.detection),
            event_capacity: parse_var("FOLIO_EVENT_CAPACITY", defaults.event_capacity),
            open_timeout_secs: parse_var("FOLIO_OPEN_TIMEOUT_SECS", defaults.open_timeout_secs),
            paint_timeout_secs: parse_var("FOLIO_PAINT_TIMEOUT_SECS", defaults.paint_timeout_secs),
            progress_timeout_secs: parse_var(
                "FOLIO_PROGRESS_TIMEOUT_SECS",
                defaults.progress_timeout_secs,
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./folio.db".to_string(),
            },
            viewer: ViewerConfig::default(),
            progress_api: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./folio.db".to_string()),
            },
            viewer: ViewerConfig::from_env(),
            progress_api: match env::var("PROGRESS_API_URL") {
                Ok(base_url) => Some(ProgressApiConfig {
                    base_url,
                    token: env::var("PROGRESS_API_TOKEN").ok(),
                    timeout_secs: parse_var("PROGRESS_API_TIMEOUT_SECS", 10),
                }),
                Err(env::VarError::NotPresent) => None,
                Err(e) => return Err(e),
            },
        })
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
