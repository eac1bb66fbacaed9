use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::text::StripPolicy;

const DEFAULT_PREFIXES: [&str; 4] = [
    "SALE CỰC SHOCK MÚC NGAY THÔI!!!",
    "SIÊU SALE!!!",
    "GIÁ SỐC HÔM NAY!!!",
    "DEAL HOT GIẢM SẬP SÀN!!!",
];

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub content_in: PathBuf,
    pub content_out: PathBuf,
    pub urls_in: PathBuf,
    pub urls_out: PathBuf,
    pub results_out: PathBuf,
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub request_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub prefixes: Vec<String>,
    /// Pin the prefix instead of picking one at random.
    #[serde(default)]
    pub prefix_index: Option<usize>,
    pub strip_policy: StripPolicy,
}

// api_key stays out of logs
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("content_in", &self.content_in)
            .field("content_out", &self.content_out)
            .field("urls_in", &self.urls_in)
            .field("urls_out", &self.urls_out)
            .field("results_out", &self.results_out)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_delay_secs", &self.request_delay_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("prefixes", &self.prefixes)
            .field("prefix_index", &self.prefix_index)
            .field("strip_policy", &self.strip_policy)
            .finish()
    }
}

/// Defaults, then `promo.toml` (or `file`), then `PROMO_*` environment
/// variables. `PROMO_PREFIXES` is a `|`-separated list. The API key falls
/// back to `GOOGLE_API_KEY`.
pub fn load(file: Option<&Path>) -> Result<Settings> {
    let builder = Config::builder()
        .set_default("content_in", "input.xlsx")?
        .set_default("content_out", "contents.xlsx")?
        .set_default("urls_in", "urls.xlsx")?
        .set_default("urls_out", "urls_clean.xlsx")?
        .set_default("results_out", "results.xlsx")?
        .set_default("api_base", "https://generativelanguage.googleapis.com/v1beta")?
        .set_default("model", "gemini-1.5-flash")?
        .set_default("request_delay_secs", 30i64)?
        .set_default("request_timeout_secs", 120i64)?
        .set_default("prefixes", DEFAULT_PREFIXES.to_vec())?
        .set_default("strip_policy", "all_matches")?;

    let builder = match file {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => builder.add_source(File::with_name("promo").required(false)),
    };

    let mut settings: Settings = builder
        .add_source(
            Environment::with_prefix("PROMO")
                .try_parsing(true)
                .list_separator("|")
                .with_list_parse_key("prefixes"),
        )
        .build()?
        .try_deserialize()?;

    if settings.api_key.as_deref().map_or(true, str::is_empty) {
        settings.api_key = env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty());
    }
    Ok(settings)
}

impl Settings {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            PipelineError::InvalidConfig(
                "no API key: set PROMO_API_KEY or GOOGLE_API_KEY".to_string(),
            )
        })
    }
}
