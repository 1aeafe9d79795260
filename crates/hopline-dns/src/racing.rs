//! Fan a lookup out to several backends and take the first answer.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::DnsResolver;
use crate::config::DnsConfig;
use crate::error::DnsError;
use crate::family::Family;
use crate::lookup::LookupIp;

/// Races a fixed set of resolver backends.
///
/// Every lookup spawns one task per backend under a child of the caller's
/// token. The first successful answer wins and cancels the rest; failures
/// are collected until a success arrives or every backend has reported, in
/// which case [`DnsError::AllFailed`] carries one error per backend.
///
/// The result channel has one slot per backend and tasks report with
/// `try_send`, so a task whose result is no longer wanted never blocks.
#[derive(Clone)]
pub struct RacingResolver {
    backends: Vec<Arc<dyn LookupIp>>,
}

impl std::fmt::Debug for RacingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RacingResolver")
            .field("backends", &self.backends.len())
            .finish()
    }
}

impl RacingResolver {
    pub fn new(backends: Vec<Arc<dyn LookupIp>>) -> Self {
        Self { backends }
    }

    /// Build one hickory backend per URL.
    ///
    /// A single URL yields that backend directly, without a racing wrapper.
    pub fn from_urls<S: AsRef<str>>(
        urls: &[S],
        config: &DnsConfig,
    ) -> Result<Arc<dyn LookupIp>, DnsError> {
        let mut backends: Vec<Arc<dyn LookupIp>> = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            let url = url.as_ref();
            let backend = DnsResolver::from_url(url, config).map_err(|e| {
                DnsError::InvalidServer(format!("resolver #{i} ({url:?}): {e}"))
            })?;
            backends.push(Arc::new(backend));
        }

        match backends.len() {
            0 => Err(DnsError::InvalidServer(
                "no dns servers configured".to_string(),
            )),
            1 => Ok(backends.remove(0)),
            _ => Ok(Arc::new(Self::new(backends))),
        }
    }

    /// Build the resolver described by `config`.
    ///
    /// No servers means the system resolver.
    pub fn from_config(config: &DnsConfig) -> Result<Arc<dyn LookupIp>, DnsError> {
        if config.servers.is_empty() {
            return Ok(Arc::new(DnsResolver::system(config)?));
        }
        Self::from_urls(&config.servers, config)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[async_trait]
impl LookupIp for RacingResolver {
    async fn lookup_ip(
        &self,
        family: Family,
        host: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<IpAddr>, DnsError> {
        if self.backends.is_empty() {
            return Err(DnsError::AllFailed(Vec::new()));
        }

        let scope = cancel.child_token();
        // Losing backends are cancelled however this call returns.
        let _scope_guard = scope.clone().drop_guard();

        let (tx, mut rx) = mpsc::channel(self.backends.len());
        for (index, backend) in self.backends.iter().enumerate() {
            let backend = Arc::clone(backend);
            let tx = tx.clone();
            let scope = scope.clone();
            let host = host.to_owned();
            tokio::spawn(async move {
                let result = backend.lookup_ip(family, &host, &scope).await;
                // Full or closed only when the race is already decided.
                let _ = tx.try_send((index, result));
            });
        }
        drop(tx);

        let mut errors = Vec::new();
        loop {
            let (index, result) = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DnsError::Cancelled),
                next = rx.recv() => match next {
                    Some(report) => report,
                    None => break,
                },
            };
            match result {
                Ok(addrs) => {
                    debug!(host = %host, backend = index, count = addrs.len(), "resolver race won");
                    return Ok(addrs);
                }
                Err(e) => {
                    debug!(host = %host, backend = index, error = %e, "resolver failed");
                    errors.push(e);
                }
            }
        }

        Err(DnsError::AllFailed(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    struct MockBackend {
        delay: Duration,
        answer: Option<Vec<IpAddr>>,
        cancelled: Arc<AtomicUsize>,
    }

    impl MockBackend {
        fn ok(delay_ms: u64, addrs: &[&str]) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                answer: Some(addrs.iter().map(|a| a.parse().unwrap()).collect()),
                cancelled: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn fail(delay_ms: u64) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                answer: None,
                cancelled: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl LookupIp for MockBackend {
        async fn lookup_ip(
            &self,
            _family: Family,
            host: &str,
            cancel: &CancellationToken,
        ) -> Result<Vec<IpAddr>, DnsError> {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.cancelled.fetch_add(1, Ordering::SeqCst);
                    Err(DnsError::Cancelled)
                }
                _ = tokio::time::sleep(self.delay) => match &self.answer {
                    Some(addrs) => Ok(addrs.clone()),
                    None => Err(DnsError::NoResults(host.to_string())),
                },
            }
        }
    }

    fn racing(backends: Vec<MockBackend>) -> RacingResolver {
        RacingResolver::new(
            backends
                .into_iter()
                .map(|b| Arc::new(b) as Arc<dyn LookupIp>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn fastest_success_wins() {
        let resolver = racing(vec![
            MockBackend::ok(2000, &["10.0.0.1"]),
            MockBackend::ok(20, &["10.0.0.2"]),
            MockBackend::ok(1000, &["10.0.0.3"]),
        ]);

        let start = Instant::now();
        let addrs = resolver
            .lookup_ip(Family::Ip, "example.com", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(addrs, vec!["10.0.0.2".parse::<IpAddr>().unwrap()]);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn early_failures_do_not_end_race() {
        let resolver = racing(vec![
            MockBackend::fail(0),
            MockBackend::fail(5),
            MockBackend::ok(50, &["192.0.2.7"]),
        ]);

        let addrs = resolver
            .lookup_ip(Family::Ip4, "example.com", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(addrs, vec!["192.0.2.7".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn all_failures_are_aggregated() {
        let resolver = racing(vec![
            MockBackend::fail(0),
            MockBackend::fail(10),
            MockBackend::fail(20),
        ]);

        let err = resolver
            .lookup_ip(Family::Ip, "example.com", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DnsError::AllFailed(_)));
        assert_eq!(err.errors().len(), 3);
    }

    #[tokio::test]
    async fn empty_answer_is_success() {
        let resolver = racing(vec![MockBackend::ok(0, &[]), MockBackend::fail(50)]);

        let addrs = resolver
            .lookup_ip(Family::Ip, "example.com", &CancellationToken::new())
            .await
            .unwrap();
        assert!(addrs.is_empty());
    }

    #[tokio::test]
    async fn losers_are_cancelled() {
        let slow = MockBackend::ok(5000, &["10.0.0.9"]);
        let slow_cancelled = Arc::clone(&slow.cancelled);
        let resolver = racing(vec![MockBackend::ok(0, &["10.0.0.1"]), slow]);

        resolver
            .lookup_ip(Family::Ip, "example.com", &CancellationToken::new())
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while slow_cancelled.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("slow backend kept running after the race was decided");
    }

    #[tokio::test]
    async fn caller_cancellation() {
        let resolver = racing(vec![MockBackend::ok(5000, &["10.0.0.1"])]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = resolver
            .lookup_ip(Family::Ip, "example.com", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DnsError::Cancelled));
    }

    #[tokio::test]
    async fn from_urls_builds_backends() {
        let config = DnsConfig::default();
        RacingResolver::from_urls(&["udp://127.0.0.1"], &config).unwrap();
        RacingResolver::from_urls(&["127.0.0.1", "tcp://127.0.0.1"], &config).unwrap();

        let none: [&str; 0] = [];
        RacingResolver::from_urls(&none, &config).err().expect("expected an error");
    }

    #[tokio::test]
    async fn bad_url_reports_index() {
        let config = DnsConfig::default();
        let err = RacingResolver::from_urls(&["127.0.0.1", "gopher://x"], &config).err().expect("expected an error");
        assert!(err.to_string().contains("#1"));
    }
}
