use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use log::warn;
use serde_json::Value;

/// A resolved giphy embed, rendered by the rewriter as `[![label](image)](page)`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GiphyEmbed {
    pub source_label: String,
    pub image_url: String,
    pub page_url: String,
}

/// External lookup capability for the two network-backed rewrite passes.
/// Injected so the rewriter can be tested without network access.
pub(crate) trait MediaResolver: Sync {
    fn resolve_giphy(&self, id: &str) -> anyhow::Result<GiphyEmbed>;
    fn resolve_soundcloud(&self, track_url: &str) -> anyhow::Result<String>;
}

/// Resolver backed by the giphy and soundcloud HTTP APIs.
pub(crate) struct HttpResolver {
    client: reqwest::blocking::Client,
    giphy_key: Option<String>,
}

const SOUNDCLOUD_OEMBED_URL: &str = "https://soundcloud.com/oembed";

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

// Runs `op` up to MAX_ATTEMPTS times with a doubling sleep between attempts;
// the last error propagates with `what` as context.
fn with_retry<T>(what: &str, mut op: impl FnMut() -> anyhow::Result<T>) -> anyhow::Result<T> {
    let mut wait = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!("{what} request failed (attempt {attempt}/{MAX_ATTEMPTS}): {e:#}");
                std::thread::sleep(wait);
                wait *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("{what} request failed")),
        }
    }
}

impl HttpResolver {
    pub fn new(giphy_key: Option<String>) -> Self {
        HttpResolver {
            client: reqwest::blocking::Client::new(),
            giphy_key,
        }
    }

    // GETs `url` with the given query parameters and parses the response body
    // as JSON, retrying transient failures.
    fn get_json(&self, url: &str, query: &[(&str, &str)], what: &str) -> anyhow::Result<Value> {
        with_retry(what, || {
            let response = self
                .client
                .get(url)
                .query(query)
                .send()?
                .error_for_status()?;
            Ok(response.json()?)
        })
    }
}

impl MediaResolver for HttpResolver {
    fn resolve_giphy(&self, id: &str) -> anyhow::Result<GiphyEmbed> {
        let Some(key) = self.giphy_key.as_deref().filter(|k| !k.is_empty()) else {
            bail!("missing GIPHY API key");
        };
        let url = format!("https://api.giphy.com/v1/gifs/{id}");
        let response = self.get_json(&url, &[("api_key", key)], "giphy")?;
        giphy_embed(&response).with_context(|| format!("giphy id {id}"))
    }

    fn resolve_soundcloud(&self, track_url: &str) -> anyhow::Result<String> {
        let query = [("format", "json"), ("url", track_url)];
        let response = self.get_json(SOUNDCLOUD_OEMBED_URL, &query, "soundcloud")?;
        json_str(&response, "/html").with_context(|| format!("soundcloud url {track_url}"))
    }
}

fn giphy_embed(response: &Value) -> anyhow::Result<GiphyEmbed> {
    Ok(GiphyEmbed {
        source_label: json_str(response, "/data/source")?,
        image_url: json_str(response, "/data/images/original/url")?,
        page_url: json_str(response, "/data/url")?,
    })
}

fn json_str(value: &Value, pointer: &str) -> anyhow::Result<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("response has no string field at {pointer}"))
}
