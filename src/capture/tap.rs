//! Wiring of the request filter, interceptor and idle monitor onto a page.

use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::Page;
use tokio::task::JoinHandle;

use super::interceptor::ResponseInterceptor;
use super::network_idle::NetworkIdleMonitor;
use super::request_filter::RequestFilter;

/// Listener tasks of one page; aborted when dropped.
#[derive(Debug, Default)]
pub struct PageTap {
    tasks: Vec<JoinHandle<()>>,
}

impl PageTap {
    fn push(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }
}

impl Drop for PageTap {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Session components that observe every page the session opens
#[derive(Debug, Clone)]
pub struct CaptureTaps {
    filter: Arc<RequestFilter>,
    interceptor: Arc<ResponseInterceptor>,
}

impl CaptureTaps {
    pub fn new(filter: Arc<RequestFilter>, interceptor: Arc<ResponseInterceptor>) -> Self {
        Self { filter, interceptor }
    }

    #[must_use]
    pub fn interceptor(&self) -> &Arc<ResponseInterceptor> {
        &self.interceptor
    }

    /// Attach the interceptor, then the filter. Listeners are registered
    /// before interception is enabled, so no exchange is missed.
    pub async fn attach(&self, page: &Page) -> Result<PageTap> {
        let mut tap = PageTap::default();
        tap.push(self.interceptor.attach(page).await?);
        tap.push(self.filter.attach(page).await?);
        Ok(tap)
    }

    /// Like [`Self::attach`], also feeding `monitor` from the same page.
    pub async fn attach_with_idle(&self, page: &Page, monitor: &Arc<NetworkIdleMonitor>) -> Result<PageTap> {
        let mut tap = self.attach(page).await?;
        tap.push(monitor.attach(page).await?);
        Ok(tap)
    }
}
