//! Cancellation tied to page teardown
//!
//! Hosts cancel the token when the page (or component) goes away. Clones
//! and child tokens observe the same cancellation; once cancelled a token
//! stays cancelled.

pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::Hydrator;

    #[test]
    fn host_teardown_reaches_hydrator() {
        let host = CancellationToken::new();
        let hydrator = Hydrator::new(StaticFetcher::new()).with_cancellation(host.child_token());
        let token = hydrator.cancellation_token();
        assert!(!token.is_cancelled());
        host.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn hydrator_cancel_leaves_host_alone() {
        let host = CancellationToken::new();
        let hydrator = Hydrator::new(StaticFetcher::new()).with_cancellation(host.child_token());
        hydrator.cancellation_token().cancel();
        assert!(!host.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::task::yield_now().await;
        token.cancel();
        handle.await.unwrap();
    }
}
