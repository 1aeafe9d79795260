//! Pick one candidate dialer by policy.

use std::sync::Arc;
use std::time::Duration;

use hopline_core::defaults::DEFAULT_NETWORK_TIMEOUT_SECS;
use hopline_dial::Dialer;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ProbeError, SelectionError};
use crate::policy::SelectionPolicy;
use crate::probe::Probe;

/// The chosen candidate.
pub struct Selection<D: ?Sized> {
    /// Position of the winner in the candidate slice.
    pub index: usize,
    pub dialer: Arc<D>,
}

impl<D: ?Sized> Clone for Selection<D> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            dialer: Arc::clone(&self.dialer),
        }
    }
}

impl<D: ?Sized> std::fmt::Debug for Selection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection").field("index", &self.index).finish()
    }
}

/// Chooses one of several interchangeable dialers.
///
/// `first` and `random` never touch the network. `fastest` runs the
/// configured [`Probe`] through every candidate at once and returns the
/// first to succeed; the remaining probes keep running in the background
/// until they finish or the selection deadline passes, and report into a
/// channel sized so they never block.
pub struct ServerSelector {
    policy: SelectionPolicy,
    probe: Option<Arc<dyn Probe>>,
    timeout: Duration,
}

impl std::fmt::Debug for ServerSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSelector")
            .field("policy", &self.policy)
            .field("probe", &self.probe.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ServerSelector {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            probe: None,
            timeout: Duration::from_secs(DEFAULT_NETWORK_TIMEOUT_SECS),
        }
    }

    pub fn with_probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    /// Upper bound on a `fastest` selection.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub async fn select<D>(
        &self,
        candidates: &[Arc<D>],
        cancel: &CancellationToken,
    ) -> Result<Selection<D>, SelectionError>
    where
        D: Dialer + ?Sized + 'static,
    {
        if candidates.is_empty() {
            return Err(SelectionError::Empty);
        }

        let index = match self.policy {
            SelectionPolicy::First => 0,
            SelectionPolicy::Random => random_index(candidates.len()),
            SelectionPolicy::Fastest => self.fastest(candidates, cancel).await?,
        };

        Ok(Selection {
            index,
            dialer: Arc::clone(&candidates[index]),
        })
    }

    async fn fastest<D>(
        &self,
        candidates: &[Arc<D>],
        cancel: &CancellationToken,
    ) -> Result<usize, SelectionError>
    where
        D: Dialer + ?Sized + 'static,
    {
        let probe = self.probe.clone().ok_or(SelectionError::MissingProbe)?;

        let started = Instant::now();
        let deadline = started + self.timeout;
        let scope = cancel.child_token();

        let (tx, mut rx) = mpsc::channel(candidates.len());
        for (index, dialer) in candidates.iter().enumerate() {
            let probe = Arc::clone(&probe);
            let dialer = Arc::clone(dialer);
            let tx = tx.clone();
            let scope = scope.clone();
            tokio::spawn(async move {
                let result =
                    match tokio::time::timeout_at(deadline, probe.probe(&dialer, &scope)).await {
                        Ok(result) => result,
                        Err(_) => Err(ProbeError::Timeout),
                    };
                // Nobody is listening once a winner has been returned.
                let _ = tx.try_send((index, result));
            });
        }
        drop(tx);

        let expired = tokio::time::sleep_until(deadline);
        tokio::pin!(expired);

        let mut errors = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SelectionError::Cancelled),
                _ = &mut expired => return Err(SelectionError::Timeout),
                next = rx.recv() => match next {
                    Some((index, Ok(()))) => {
                        info!(
                            candidate = index,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "fastest candidate selected"
                        );
                        return Ok(index);
                    }
                    Some((index, Err(e))) => {
                        debug!(candidate = index, error = %e, "probe failed");
                        errors.push(e);
                    }
                    None => break,
                },
            }
        }

        Err(SelectionError::AllFailed(errors))
    }
}

fn random_index(len: usize) -> usize {
    rand::thread_rng().gen_range(0..len)
}
