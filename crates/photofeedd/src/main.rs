// # photofeedd - Photo Feed Driver
//
// This binary is a THIN integration layer over photofeed-core:
// - No caching, pagination or like logic lives here
// - Configuration is via environment variables only
//
// The photofeedd binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the HTTP transport into a photo store
// 4. Loading pages, optionally toggling one like, and printing the cache
//
// ## Configuration
//
// - `PHOTOFEED_BASE_URL`: API base URL (default `https://api.unsplash.com`)
// - `PHOTOFEED_ACCESS_TOKEN`: Bearer token (optional)
// - `PHOTOFEED_PAGES`: Number of pages to load (default 1)
// - `PHOTOFEED_PER_PAGE`: Photos per page (default 10)
// - `PHOTOFEED_TIMEOUT_SECS`: HTTP timeout in seconds (default 30)
// - `PHOTOFEED_LIKE_PHOTO_ID`: Photo to like/unlike after loading (optional)
// - `PHOTOFEED_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export PHOTOFEED_ACCESS_TOKEN=your_token
// export PHOTOFEED_PAGES=2
// export PHOTOFEED_LIKE_PHOTO_ID=Dwu85P9SOIk
//
// photofeedd > photos.json
// ```

use anyhow::Result;
use photofeed_core::{ChangeNotifier, PhotoStore, PhotoStoreHandle, StoreConfig, StoreEvent};
use photofeed_http::{HttpTransport, HttpTransportConfig};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum FeedExitCode {
    /// Everything requested was loaded
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// A page load or like toggle failed
    RuntimeError = 2,
    /// Interrupted by Ctrl-C
    Interrupted = 130,
}

impl From<FeedExitCode> for ExitCode {
    fn from(code: FeedExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    base_url: String,
    access_token: Option<String>,
    pages: u32,
    per_page: u32,
    timeout_secs: u64,
    like_photo_id: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: env::var("PHOTOFEED_BASE_URL")
                .unwrap_or_else(|_| "https://api.unsplash.com".to_string()),
            access_token: env::var("PHOTOFEED_ACCESS_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            pages: parse_var("PHOTOFEED_PAGES", 1)?,
            per_page: parse_var("PHOTOFEED_PER_PAGE", 10)?,
            timeout_secs: parse_var("PHOTOFEED_TIMEOUT_SECS", 30)?,
            like_photo_id: env::var("PHOTOFEED_LIKE_PHOTO_ID")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            log_level: env::var("PHOTOFEED_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            anyhow::bail!(
                "PHOTOFEED_BASE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.base_url
            );
        }

        if self.base_url.starts_with("http://") {
            eprintln!(
                "WARNING: PHOTOFEED_BASE_URL uses HTTP (not HTTPS). \
                The access token would be sent in clear text."
            );
        }

        if !(1..=50).contains(&self.pages) {
            anyhow::bail!("PHOTOFEED_PAGES must be between 1 and 50. Got: {}", self.pages);
        }

        if !(1..=30).contains(&self.per_page) {
            anyhow::bail!(
                "PHOTOFEED_PER_PAGE must be between 1 and 30. Got: {}",
                self.per_page
            );
        }

        if !(1..=300).contains(&self.timeout_secs) {
            anyhow::bail!(
                "PHOTOFEED_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.timeout_secs
            );
        }

        if self.like_photo_id.is_some() && self.access_token.is_none() {
            anyhow::bail!(
                "PHOTOFEED_LIKE_PHOTO_ID requires PHOTOFEED_ACCESS_TOKEN. \
                Set it via: export PHOTOFEED_ACCESS_TOKEN=your_token"
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "PHOTOFEED_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.base_url.clone()).with_per_page(self.per_page)
    }

    fn transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            access_token: self.access_token.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Read a numeric variable, falling back to `default` when unset
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is not a valid number ('{}'): {}", name, value, e)),
        Err(_) => Ok(default),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FeedExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return FeedExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays valid JSON
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FeedExitCode::ConfigError.into();
    }

    info!("Starting photofeedd against {}", config.base_url);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FeedExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        tokio::select! {
            result = run(config) => match result {
                Ok(()) => FeedExitCode::Success,
                Err(e) => {
                    error!("photofeedd failed: {:#}", e);
                    FeedExitCode::RuntimeError
                }
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                FeedExitCode::Interrupted
            }
        }
    })
    .into()
}

/// Wire the store, drive it, print the cache
async fn run(config: Config) -> Result<()> {
    let transport = HttpTransport::new(config.transport_config())?;
    info!(
        "HTTP transport ready ({})",
        if transport.is_authenticated() { "authenticated" } else { "anonymous" }
    );

    let (store, mut events) = PhotoStore::new(
        Arc::new(transport),
        ChangeNotifier::new(),
        config.store_config(),
    )?;
    let (handle, join) = store.spawn();

    let outcome = drive(&config, &handle, &mut events).await;

    handle.shutdown().await?;
    join.await?;

    let photos = outcome?;
    println!("{}", serde_json::to_string_pretty(&photos)?);
    Ok(())
}

async fn drive(
    config: &Config,
    handle: &PhotoStoreHandle,
    events: &mut mpsc::Receiver<StoreEvent>,
) -> Result<Vec<photofeed_core::PhotoRecord>> {
    let page_timeout = Duration::from_secs(config.timeout_secs + 5);

    for _ in 0..config.pages {
        load_next_page(handle, events, page_timeout).await?;
    }

    if let Some(photo_id) = &config.like_photo_id {
        let photos = handle.photos().await?;
        let Some(photo) = photos.iter().find(|p| &p.id == photo_id) else {
            anyhow::bail!("Photo {} is not among the {} loaded photo(s)", photo_id, photos.len());
        };

        // Like when currently unliked, unlike otherwise
        let like = !photo.is_liked;
        info!("{} photo {}", if like { "Liking" } else { "Unliking" }, photo_id);
        handle.toggle_like(photo_id.clone(), like).await?;
    }

    Ok(handle.photos().await?)
}

/// Request one page and wait until it lands or fails
async fn load_next_page(
    handle: &PhotoStoreHandle,
    events: &mut mpsc::Receiver<StoreEvent>,
    page_timeout: Duration,
) -> Result<()> {
    let mut changes = Box::pin(handle.notifier().watch());
    handle.fetch_next_page().await?;

    let outcome = tokio::time::timeout(page_timeout, async {
        loop {
            tokio::select! {
                Some(()) = changes.next() => return Ok(()),
                event = events.recv() => match event {
                    Some(StoreEvent::PageFailed { page, error }) => {
                        anyhow::bail!("Page {} failed: {}", page, error)
                    }
                    Some(StoreEvent::Stopped) | None => anyhow::bail!("Photo store stopped"),
                    Some(_) => continue,
                },
            }
        }
    })
    .await;

    match outcome {
        Ok(result) => result,
        Err(_) => anyhow::bail!("No page within {:?}", page_timeout),
    }
}
