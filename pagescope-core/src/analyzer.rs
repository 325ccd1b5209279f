use crate::cache::{DEFAULT_CACHE_TTL, PageCache};
use crate::config::Settings;
use chrono::Utc;
use pagescope_scanner::error::{Result, ScanError};
use pagescope_scanner::{
    AnalysisResult, DEFAULT_LOGIN_THRESHOLD, HttpClient, PageSnapshot, Prober, ReqwestClient,
    validate_url,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Single-page analysis pipeline: cache lookup, validation, fetch, parse, link probing,
/// login detection and a best-effort cache write.
pub struct Analyzer {
    client: Arc<dyn HttpClient>,
    cache: Arc<dyn PageCache>,
    prober: Prober,
    login_threshold: u32,
    cache_ttl: Duration,
}

impl Analyzer {
    pub fn new(client: Arc<dyn HttpClient>, cache: Arc<dyn PageCache>) -> Self {
        let prober = Prober::new(Arc::clone(&client));
        Self {
            client,
            cache,
            prober,
            login_threshold: DEFAULT_LOGIN_THRESHOLD,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Build the production pipeline: a reqwest client and prober configured from `settings`.
    pub fn from_settings(settings: &Settings, cache: Arc<dyn PageCache>) -> Result<Self> {
        let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(
            settings.link_timeout(),
            settings.analyzer.max_redirects,
        )?);

        let prober = Prober::new(Arc::clone(&client))
            .with_workers(settings.analyzer.max_workers)
            .with_max_links(settings.analyzer.max_links)
            .with_external_timeout(settings.link_timeout());

        Ok(Self::new(client, cache)
            .with_prober(prober)
            .with_login_threshold(settings.analyzer.login_threshold)
            .with_cache_ttl(settings.cache_ttl()))
    }

    pub fn with_prober(mut self, prober: Prober) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_login_threshold(mut self, threshold: u32) -> Self {
        self.login_threshold = threshold;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub async fn analyze(&self, url: &str, cancel: &CancellationToken) -> Result<AnalysisResult> {
        match self.cache.get(url).await {
            Ok(Some(cached)) => {
                info!("Cache hit for {}", url);
                return Ok(cached);
            }
            Ok(None) => debug!("Cache miss for {}", url),
            Err(e) => warn!("Cache lookup failed for {}: {}", url, e),
        }

        let parsed = validate_url(url)?;
        info!("Analyzing {}", url);
        let start = Instant::now();

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled),
            body = self.client.fetch_page(parsed.as_str()) => body?,
        };

        // scraper's tree is not Send; everything needed later is copied out here
        let snapshot = PageSnapshot::parse(&body, &parsed);
        drop(body);

        let links = self.prober.check_links(&snapshot.links, cancel).await;

        let result = AnalysisResult {
            url: url.to_string(),
            html_version: snapshot.html_version,
            title: snapshot.title,
            headings: snapshot.headings,
            links,
            has_login_form: snapshot.login.is_login_page(self.login_threshold),
            analyzed_at: Utc::now(),
        };

        info!(
            "Analysis of {} complete in {}ms: {} internal, {} external, {} inaccessible links",
            url,
            start.elapsed().as_millis(),
            result.links.internal,
            result.links.external,
            result.links.inaccessible
        );

        // Probes cut short by cancellation report reachable links as inaccessible
        if cancel.is_cancelled() {
            debug!("Analysis of {} was cancelled during probing, not caching", url);
        } else if let Err(e) = self.cache.set(url, &result, self.cache_ttl).await {
            warn!("Failed to cache analysis of {}: {}", url, e);
        }

        Ok(result)
    }

    /// Release the cache. Failures are logged.
    pub async fn close(&self) {
        if let Err(e) = self.cache.close().await {
            warn!("Failed to close cache: {}", e);
        }
    }
}
