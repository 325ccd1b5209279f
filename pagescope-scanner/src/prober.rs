use crate::client::HttpClient;
use crate::links::{ExtractedLinks, LinkClass};
use crate::result::LinkStats;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_LINKS: usize = 100;
pub const DEFAULT_WORKERS: usize = 20;
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_INTERNAL_LINK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCheckTask {
    pub url: String,
    pub class: LinkClass,
}

/// Select the links that will be probed: external links first, then internal links in
/// document order, never more than `budget` in total.
pub fn admit_tasks(links: &ExtractedLinks, budget: usize) -> Vec<LinkCheckTask> {
    let external = links.external.iter().map(|url| LinkCheckTask {
        url: url.clone(),
        class: LinkClass::External,
    });
    let internal = links.internal.iter().map(|url| LinkCheckTask {
        url: url.clone(),
        class: LinkClass::Internal,
    });

    external.chain(internal).take(budget).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub admitted: usize,
    pub inaccessible: usize,
}

/// Bounded worker pool that checks link reachability.
///
/// Every call to [`Prober::probe_all`] builds its own queues and workers; nothing is
/// shared between analyses.
pub struct Prober {
    client: Arc<dyn HttpClient>,
    workers: usize,
    max_links: usize,
    external_timeout: Duration,
    internal_timeout: Duration,
}

impl Prober {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            workers: DEFAULT_WORKERS,
            max_links: DEFAULT_MAX_LINKS,
            external_timeout: DEFAULT_LINK_TIMEOUT,
            internal_timeout: DEFAULT_INTERNAL_LINK_TIMEOUT,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_links(mut self, max_links: usize) -> Self {
        self.max_links = max_links;
        self
    }

    pub fn with_external_timeout(mut self, timeout: Duration) -> Self {
        self.external_timeout = timeout;
        self
    }

    pub fn with_internal_timeout(mut self, timeout: Duration) -> Self {
        self.internal_timeout = timeout;
        self
    }

    pub fn timeout_for(&self, class: LinkClass) -> Duration {
        match class {
            LinkClass::External => self.external_timeout,
            LinkClass::Internal => self.internal_timeout,
        }
    }

    /// Count internal/external links and probe the admitted subset.
    pub async fn check_links(&self, links: &ExtractedLinks, cancel: &CancellationToken) -> LinkStats {
        let summary = self.probe_all(links, cancel).await;
        LinkStats {
            internal: links.internal.len(),
            external: links.external.len(),
            inaccessible: summary.inaccessible,
        }
    }

    pub async fn probe_all(&self, links: &ExtractedLinks, cancel: &CancellationToken) -> ProbeSummary {
        let tasks = admit_tasks(links, self.max_links);
        let admitted = tasks.len();
        if admitted == 0 {
            return ProbeSummary::default();
        }

        let worker_count = self.workers.max(1).min(admitted);
        info!(
            "Probing {} of {} links with {} workers",
            admitted,
            links.total(),
            worker_count
        );

        // Both queues hold exactly the admitted tasks, so neither side ever waits for room
        let (task_tx, task_rx) = mpsc::channel::<(LinkCheckTask, Duration)>(admitted);
        let (result_tx, mut result_rx) = mpsc::channel::<bool>(admitted);

        for task in tasks {
            let timeout = self.timeout_for(task.class);
            if let Err(e) = task_tx.try_send((task, timeout)) {
                warn!("Failed to enqueue link check: {}", e);
            }
        }
        drop(task_tx);

        let task_rx = Arc::new(Mutex::new(task_rx));
        let mut worker_handles = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let client = Arc::clone(&self.client);
            let task_rx = Arc::clone(&task_rx);
            let result_tx = result_tx.clone();
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                debug!("Prober worker {} started", worker_id);

                loop {
                    let task = { task_rx.lock().await.recv().await };
                    let Some((task, timeout)) = task else {
                        break;
                    };

                    let accessible = check_link(client.as_ref(), &task, timeout, &cancel).await;

                    if result_tx.send(accessible).await.is_err() {
                        break;
                    }
                }

                debug!("Prober worker {} finished", worker_id);
            });

            worker_handles.push(handle);
        }
        drop(result_tx);

        for joined in join_all(worker_handles).await {
            if let Err(e) = joined {
                warn!("Prober worker failed: {}", e);
            }
        }

        let mut summary = ProbeSummary {
            admitted,
            inaccessible: 0,
        };
        while let Some(accessible) = result_rx.recv().await {
            if !accessible {
                summary.inaccessible += 1;
            }
        }

        debug!(
            "Link probing complete: {} admitted, {} inaccessible",
            summary.admitted, summary.inaccessible
        );
        summary
    }
}

/// A link is accessible iff a response with status < 400 arrives within `timeout`.
/// Transport errors, timeouts and cancellation all count as inaccessible.
pub async fn check_link(
    client: &dyn HttpClient,
    task: &LinkCheckTask,
    timeout: Duration,
    cancel: &CancellationToken,
) -> bool {
    let start = Instant::now();

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        probed = tokio::time::timeout(timeout, client.probe(&task.url, timeout)) => Some(probed),
    };

    let accessible = matches!(outcome, Some(Ok(Ok(status))) if status < 400);
    debug!(
        "Probed {} ({:?}) accessible={} in {}ms",
        task.url,
        task.class,
        accessible,
        start.elapsed().as_millis()
    );
    accessible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ReqwestClient;
    use crate::error::{Result, ScanError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    /// Test double answering probes from a fixed table. Unknown URLs fail like a refused
    /// connection.
    #[derive(Default)]
    struct ScriptedClient {
        statuses: HashMap<String, u16>,
        delay: Duration,
        calls: StdMutex<Vec<(String, Duration)>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl ScriptedClient {
        fn with_statuses(statuses: &[(&str, u16)]) -> Self {
            Self {
                statuses: statuses
                    .iter()
                    .map(|(url, status)| (url.to_string(), *status))
                    .collect(),
                ..Default::default()
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn probed_urls(&self) -> Vec<String> {
            let mut urls: Vec<String> = self
                .calls
                .lock()
                .unwrap()
                .iter()
                .map(|(url, _)| url.clone())
                .collect();
            urls.sort();
            urls
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn fetch_page(&self, url: &str) -> Result<String> {
            Err(ScanError::InvalidUrl(url.to_string()))
        }

        async fn probe(&self, url: &str, timeout: Duration) -> Result<u16> {
            self.calls.lock().unwrap().push((url.to_string(), timeout));
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.statuses
                .get(url)
                .copied()
                .ok_or_else(|| ScanError::InvalidUrl(url.to_string()))
        }
    }

    fn links(external: &[&str], internal: &[&str]) -> ExtractedLinks {
        ExtractedLinks {
            external: external.iter().map(|s| s.to_string()).collect(),
            internal: internal.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_admission_puts_external_links_first() {
        let links = links(&["https://x.org/1", "https://x.org/2"], &["/a", "/b", "/c"]);

        let admitted = admit_tasks(&links, 4);
        let urls: Vec<&str> = admitted.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x.org/1", "https://x.org/2", "/a", "/b"]);
        assert_eq!(admitted[0].class, LinkClass::External);
        assert_eq!(admitted[3].class, LinkClass::Internal);
    }

    #[test]
    fn test_admission_budget_can_exclude_all_internal_links() {
        let links = links(&["https://x.org/1", "https://x.org/2"], &["/a"]);
        let admitted = admit_tasks(&links, 1);
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].url, "https://x.org/1");

        assert!(admit_tasks(&links, 0).is_empty());
        assert_eq!(admit_tasks(&links, 100).len(), 3);
    }

    #[tokio::test]
    async fn test_outcomes_are_counted_by_status() {
        let client = Arc::new(ScriptedClient::with_statuses(&[
            ("https://ok.org/", 200),
            ("https://moved.org/", 301),
            ("https://gone.org/", 404),
            ("https://broken.org/", 500),
            ("https://site.test/a", 204),
        ]));
        let prober = Prober::new(client.clone()).with_workers(3);
        let links = links(
            &[
                "https://ok.org/",
                "https://moved.org/",
                "https://gone.org/",
                "https://broken.org/",
                "https://refused.org/",
            ],
            &["https://site.test/a"],
        );

        let stats = prober.check_links(&links, &CancellationToken::new()).await;

        assert_eq!(
            stats,
            LinkStats {
                internal: 1,
                external: 5,
                inaccessible: 3
            }
        );
    }

    #[tokio::test]
    async fn test_links_beyond_budget_are_never_probed() {
        let client = Arc::new(ScriptedClient::default());
        let prober = Prober::new(client.clone()).with_max_links(3);
        let links = links(
            &["https://x.org/1"],
            &["https://site.test/1", "https://site.test/2", "https://site.test/3"],
        );

        let summary = prober.probe_all(&links, &CancellationToken::new()).await;
        assert_eq!(summary.admitted, 3);
        assert_eq!(summary.inaccessible, 3);
        assert_eq!(
            client.probed_urls(),
            vec!["https://site.test/1", "https://site.test/2", "https://x.org/1"]
        );

        let stats = prober.check_links(&links, &CancellationToken::new()).await;
        assert_eq!(stats.internal, 3);
        assert_eq!(stats.external, 1);
        assert!(stats.inaccessible <= 3);
    }

    #[tokio::test]
    async fn test_worker_count_bounds_concurrency() {
        let urls: Vec<String> = (0..12).map(|i| format!("https://x.org/{}", i)).collect();
        let statuses: Vec<(&str, u16)> = urls.iter().map(|u| (u.as_str(), 200)).collect();
        let client =
            Arc::new(ScriptedClient::with_statuses(&statuses).with_delay(Duration::from_millis(20)));
        let prober = Prober::new(client.clone()).with_workers(4);

        let url_refs: Vec<&str> = urls.iter().map(|u| u.as_str()).collect();
        let summary = prober
            .probe_all(&links(&url_refs, &[]), &CancellationToken::new())
            .await;

        assert_eq!(summary.admitted, 12);
        assert_eq!(summary.inaccessible, 0);
        let peak = client.peak_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {} exceeded worker count", peak);
        assert!(peak > 1, "workers did not run concurrently");
    }

    #[tokio::test]
    async fn test_probe_timeout_depends_on_class() {
        let client = Arc::new(ScriptedClient::default());
        let prober = Prober::new(client.clone()).with_external_timeout(Duration::from_secs(7));

        prober
            .probe_all(
                &links(&["https://x.org/"], &["https://site.test/"]),
                &CancellationToken::new(),
            )
            .await;

        let calls = client.calls.lock().unwrap().clone();
        let timeouts: HashMap<String, Duration> = calls.into_iter().collect();
        assert_eq!(timeouts["https://x.org/"], Duration::from_secs(7));
        assert_eq!(timeouts["https://site.test/"], DEFAULT_INTERNAL_LINK_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_is_inaccessible() {
        let client = Arc::new(
            ScriptedClient::with_statuses(&[("https://site.test/slow", 200)])
                .with_delay(Duration::from_secs(30)),
        );
        let prober = Prober::new(client).with_internal_timeout(Duration::from_millis(100));

        let summary = prober
            .probe_all(&links(&[], &["https://site.test/slow"]), &CancellationToken::new())
            .await;
        assert_eq!(summary.inaccessible, 1);
    }

    #[tokio::test]
    async fn test_cancelled_probes_are_inaccessible() {
        let client = Arc::new(ScriptedClient::with_statuses(&[
            ("https://x.org/", 200),
            ("https://site.test/", 200),
        ]));
        let prober = Prober::new(client);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = prober
            .probe_all(&links(&["https://x.org/"], &["https://site.test/"]), &cancel)
            .await;
        assert_eq!(summary.admitted, 2);
        assert_eq!(summary.inaccessible, 2);
    }

    #[tokio::test]
    async fn test_empty_link_set_spawns_nothing() {
        let client = Arc::new(ScriptedClient::default());
        let prober = Prober::new(client.clone());

        let summary = prober
            .probe_all(&ExtractedLinks::default(), &CancellationToken::new())
            .await;
        assert_eq!(summary, ProbeSummary::default());
        assert!(client.probed_urls().is_empty());
    }

    #[tokio::test]
    async fn test_probing_against_live_server() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/alive"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = Arc::new(ReqwestClient::new(Duration::from_secs(5), 5).unwrap());
        let prober = Prober::new(client).with_workers(2);
        let alive = format!("{}/alive", mock_server.uri());
        let missing = format!("{}/missing", mock_server.uri());

        let stats = prober
            .check_links(
                &links(
                    &["http://127.0.0.1:1/refused"],
                    &[alive.as_str(), missing.as_str()],
                ),
                &CancellationToken::new(),
            )
            .await;

        // the unmounted internal path answers 404 and port 1 refuses the connection
        assert_eq!(stats.external, 1);
        assert_eq!(stats.internal, 2);
        assert_eq!(stats.inaccessible, 2);
    }
}
