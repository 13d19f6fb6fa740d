//! Async entry points for hosts running on tokio.
//!
//! Fetches run on blocking threads and are raced against the hydrator's
//! cancellation token, so a stale request is abandoned instead of awaited.
//! The page itself is never sent across threads: every mutation happens on
//! the calling task after the fetches settle.

use crate::cancel::CancellationToken;
use crate::content::ContentPayload;
use crate::fetch::ContentFetcher;
use crate::page::Page;
use crate::pipeline::{Hydrator, SectionReport, Started};
use crate::{Error, Result, SourceConfig};
use futures::future::join_all;
use log::debug;

/// Fetch on a blocking thread. `None` means the token fired first.
pub async fn fetch_cancellable<F>(
    fetcher: F,
    source: SourceConfig,
    cancel: CancellationToken,
) -> Option<Result<ContentPayload>>
where
    F: ContentFetcher + 'static,
{
    if cancel.is_cancelled() {
        return None;
    }
    let endpoint = source.endpoint.clone();
    let task = tokio::task::spawn_blocking(move || fetcher.fetch(&source));
    tokio::select! {
        joined = task => Some(
            joined.unwrap_or_else(|e| Err(Error::Network(format!("fetch task failed: {}", e))))
        ),
        _ = cancel.cancelled() => {
            debug!("abandoning in-flight fetch of '{}'", endpoint);
            None
        }
    }
}

impl<F> Hydrator<F>
where
    F: ContentFetcher + Clone + 'static,
{
    /// Async counterpart of [`Hydrator::run`].
    pub async fn run_async(&self, page: &mut Page, name: &str) -> Result<SectionReport> {
        let section = self
            .sections()
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::ConfigError(format!("no section named '{}'", name)))?;
        let pipeline = self.pipeline(section);
        match pipeline.begin(page)? {
            Started::Done(report) => Ok(report),
            Started::Pending(pending) => {
                let fetched = fetch_cancellable(
                    self.fetcher().clone(),
                    section.source.clone(),
                    self.cancellation_token(),
                )
                .await;
                pipeline.finish(page, pending, fetched)
            }
        }
    }

    /// Run every section, fetching all endpoints concurrently.
    ///
    /// Rendering still happens one section at a time, in section order.
    pub async fn run_all_async(&self, page: &mut Page) -> Vec<Result<SectionReport>> {
        let sections = self.sections();
        let started: Vec<Result<Started>> = sections
            .iter()
            .map(|section| self.pipeline(section).begin(page))
            .collect();

        let fetches = started.iter().zip(sections).map(|(start, section)| {
            let wanted = matches!(start, Ok(Started::Pending(_)));
            let fetcher = self.fetcher().clone();
            let source = section.source.clone();
            let cancel = self.cancellation_token();
            async move {
                if wanted {
                    Some(fetch_cancellable(fetcher, source, cancel).await)
                } else {
                    None
                }
            }
        });
        let fetched = join_all(fetches).await;

        let mut reports = Vec::with_capacity(sections.len());
        for ((start, section), fetched) in started.into_iter().zip(sections).zip(fetched) {
            let report = match start {
                Err(err) => Err(err),
                Ok(Started::Done(report)) => Ok(report),
                Ok(Started::Pending(pending)) => {
                    self.pipeline(section).finish(page, pending, fetched.flatten())
                }
            };
            reports.push(report);
        }
        reports
    }
}
