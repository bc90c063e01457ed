// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Food photo analysis with retry and cancellation.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use super::vision::{VisionClient, VisionError};
use crate::models::AnalysisData;

/// Cooperative cancellation flag shared between a request and its canceller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Runs vision analysis and tracks in-flight requests by id.
#[derive(Clone)]
pub struct AnalysisService {
    client: VisionClient,
    timeout: Duration,
    extended_timeout: Duration,
    in_flight: Arc<DashMap<String, CancellationToken>>,
}

impl AnalysisService {
    pub fn new(client: VisionClient, timeout: Duration, extended_timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            extended_timeout,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn client(&self) -> &VisionClient {
        &self.client
    }

    /// Analyze `image`, retrying once with the extended timeout if the first
    /// attempt times out. When `request_id` is given the request can be
    /// cancelled through [`AnalysisService::cancel`] until it finishes.
    pub async fn analyze(
        &self,
        image: &str,
        request_id: Option<&str>,
    ) -> Result<AnalysisData, VisionError> {
        let token = CancellationToken::new();
        let _guard = request_id.map(|id| self.register(id, token.clone()));

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!(request_id = ?request_id, "Analysis cancelled");
                Err(VisionError::Cancelled)
            }
            result = self.analyze_with_retry(image) => result,
        }
    }

    async fn analyze_with_retry(&self, image: &str) -> Result<AnalysisData, VisionError> {
        match self.client.analyze(image, self.timeout).await {
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    timeout_secs = self.extended_timeout.as_secs(),
                    "Vision request timed out, retrying with extended timeout"
                );
                self.client.analyze(image, self.extended_timeout).await
            }
            other => other,
        }
    }

    /// Cancel an in-flight request. Returns false if no such request is running.
    pub fn cancel(&self, request_id: &str) -> bool {
        match self.in_flight.get(request_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn register(&self, id: &str, token: CancellationToken) -> InFlightGuard {
        if let Some(previous) = self.in_flight.insert(id.to_string(), token.clone()) {
            tracing::debug!(request_id = %id, "Replacing in-flight request with same id");
            previous.cancel();
        }
        InFlightGuard {
            registry: self.in_flight.clone(),
            id: id.to_string(),
            token,
        }
    }
}

/// Removes the registry entry when the request finishes or is dropped.
struct InFlightGuard {
    registry: Arc<DashMap<String, CancellationToken>>,
    id: String,
    token: CancellationToken,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // Only remove our own entry; a newer request may have reused the id.
        self.registry
            .remove_if(&self.id, |_, t| Arc::ptr_eq(&t.inner, &self.token.inner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_wakes_waiter() {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::task::yield_now().await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_before_wait_returns_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn mock_analysis_clears_registry() {
        let service = AnalysisService::new(
            VisionClient::mock(),
            Duration::from_secs(1),
            Duration::from_secs(2),
        );
        let data = service.analyze("QUJD", Some("req-1")).await.unwrap();
        assert!(!data.foods.is_empty());
        assert_eq!(service.in_flight_count(), 0);
        assert!(!service.cancel("req-1"));
    }
}
