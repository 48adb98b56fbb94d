//! Network-idle detection from CDP request lifecycle events.
//!
//! The page counts as idle once no request has been in flight for the
//! configured quiet period.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct IdleState {
    in_flight: HashSet<String>,
    last_activity: Instant,
}

#[derive(Debug)]
pub struct NetworkIdleMonitor {
    state: Mutex<IdleState>,
    quiet: Duration,
}

enum Lifecycle {
    Started(String),
    Settled(String),
}

impl NetworkIdleMonitor {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            state: Mutex::new(IdleState {
                in_flight: HashSet::new(),
                last_activity: Instant::now(),
            }),
            quiet,
        }
    }

    pub fn request_started(&self, request_id: &str) {
        let mut state = self.state.lock();
        state.in_flight.insert(request_id.to_string());
        state.last_activity = Instant::now();
    }

    pub fn request_settled(&self, request_id: &str) {
        let mut state = self.state.lock();
        if state.in_flight.remove(request_id) {
            state.last_activity = Instant::now();
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.in_flight.is_empty() && state.last_activity.elapsed() >= self.quiet
    }

    /// Resolve once the network is idle. Unbounded; race it with a deadline.
    pub async fn wait_for_idle(&self) {
        while !self.is_idle() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Feed this monitor from the request lifecycle events of `page`.
    pub async fn attach(self: &Arc<Self>, page: &Page) -> Result<JoinHandle<()>> {
        let sent = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .context("Failed to subscribe to Network.requestWillBeSent")?;
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .context("Failed to subscribe to Network.loadingFinished")?;
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .context("Failed to subscribe to Network.loadingFailed")?;

        let mut events = stream::select(
            sent.map(|e| Lifecycle::Started(e.request_id.inner().clone())),
            stream::select(
                finished.map(|e| Lifecycle::Settled(e.request_id.inner().clone())),
                failed.map(|e| Lifecycle::Settled(e.request_id.inner().clone())),
            ),
        );

        let monitor = Arc::clone(self);
        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    Lifecycle::Started(id) => monitor.request_started(&id),
                    Lifecycle::Settled(id) => monitor.request_settled(&id),
                }
            }
        }))
    }
}
