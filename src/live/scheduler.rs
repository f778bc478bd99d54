//! Per-connection live polling.
//!
//! ```text
//!              subscribe(g)                  subscribe(h)
//!   Idle ───────────────────► Subscribed(g) ─────────────► Subscribed(h)
//!    ▲                            │          cancel g, wait, start h
//!    └──── unsubscribe / drop ────┘
//! ```
//!
//! Each subscription is one task ticking at a fixed interval. A tick runs the
//! live query to completion before the next one is considered; ticks missed
//! while a query is slow are skipped, not queued. Every await in the task
//! races the subscription's cancellation token, so once `subscribe` or
//! `unsubscribe` returns, the replaced group sends nothing more.

use std::time::Duration;

use chrono::Utc;
use plcwatch_types::SampleRow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::service::ChartService;

/// Outcome of one live tick.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveUpdate {
    Rows { group: String, rows: Vec<SampleRow> },
    Failed { group: String, message: String },
}

impl LiveUpdate {
    pub fn group(&self) -> &str {
        match self {
            LiveUpdate::Rows { group, .. } | LiveUpdate::Failed { group, .. } => group,
        }
    }
}

#[derive(Debug)]
struct Subscription {
    group: String,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns at most one live subscription for a connection.
///
/// Updates are converted into `E` and sent to `sink`. Cancelling the root
/// token passed to [`LiveScheduler::new`] stops the subscription as well.
#[derive(Debug)]
pub struct LiveScheduler<E> {
    service: ChartService,
    interval: Duration,
    root: CancellationToken,
    sink: mpsc::Sender<E>,
    active: Option<Subscription>,
}

impl<E> LiveScheduler<E>
where
    E: From<LiveUpdate> + Send + 'static,
{
    pub fn new(
        service: ChartService,
        interval: Duration,
        root: CancellationToken,
        sink: mpsc::Sender<E>,
    ) -> Self {
        Self {
            service,
            interval,
            root,
            sink,
            active: None,
        }
    }

    /// Start polling `group`, replacing any current subscription.
    ///
    /// The group's variables are resolved now; later configuration changes
    /// apply to the next subscription.
    pub async fn subscribe(&mut self, group: &str) {
        if let Some(previous) = self.stop().await {
            info!(from = %previous, to = group, "Switching live subscription");
        } else {
            info!(group, "Starting live subscription");
        }

        let variables = self.service.variables_for_group(group).await;
        if variables.is_empty() {
            debug!(group, "Live group has no variables");
        }

        let token = self.root.child_token();
        let handle = tokio::spawn(run(
            self.service.clone(),
            group.to_string(),
            variables,
            self.interval,
            token.clone(),
            self.sink.clone(),
        ));

        self.active = Some(Subscription {
            group: group.to_string(),
            token,
            handle,
        });
    }

    /// Stop the current subscription, if any. Returns whether one was active.
    pub async fn unsubscribe(&mut self) -> bool {
        match self.stop().await {
            Some(group) => {
                info!(%group, "Stopped live subscription");
                true
            }
            None => false,
        }
    }

    /// Group currently being polled.
    pub fn active_group(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.group.as_str())
    }

    /// Whether a subscription task is still running.
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    async fn stop(&mut self) -> Option<String> {
        let subscription = self.active.take()?;
        subscription.token.cancel();
        if let Err(e) = subscription.handle.await {
            warn!(group = %subscription.group, error = %e, "Live task ended abnormally");
        }
        Some(subscription.group)
    }
}

impl<E> Drop for LiveScheduler<E> {
    fn drop(&mut self) {
        if let Some(subscription) = &self.active {
            subscription.token.cancel();
        }
    }
}

async fn run<E>(
    service: ChartService,
    group: String,
    variables: Vec<String>,
    interval: Duration,
    token: CancellationToken,
    sink: mpsc::Sender<E>,
) where
    E: From<LiveUpdate> + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = service.live_rows(&variables, Utc::now()) => result,
        };

        let update = match result {
            Ok(rows) => LiveUpdate::Rows {
                group: group.clone(),
                rows,
            },
            Err(e) => {
                warn!(%group, error = %e, "Live tick failed");
                LiveUpdate::Failed {
                    group: group.clone(),
                    message: e.to_string(),
                }
            }
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = sink.send(E::from(update)) => {
                if sent.is_err() {
                    debug!(%group, "Live sink closed");
                    break;
                }
            }
        }
    }

    debug!(%group, "Live task stopped");
}
