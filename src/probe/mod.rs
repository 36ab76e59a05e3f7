//! Probe abstraction
//!
//! A probe is one opaque asynchronous network check bound to a [`ProbeKey`].
//! Implementors write [`Probe::execute`]; the provided [`Probe::invoke`]
//! applies the timeout, honours cancellation and folds every outcome into a
//! single [`ProbeResult`].

use crate::error::Result;
use crate::session::SessionLease;
use crate::types::{FailureKind, ProbeKey, ProbePayload, ProbeResult};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything a running probe may touch
#[derive(Debug)]
pub struct ProbeContext {
    key: ProbeKey,
    session: SessionLease,
    cancel: CancellationToken,
}

impl ProbeContext {
    pub fn new(key: ProbeKey, session: SessionLease, cancel: CancellationToken) -> Self {
        Self { key, session, cancel }
    }

    pub fn key(&self) -> &ProbeKey {
        &self.key
    }

    /// The run's shared HTTP client
    pub fn client(&self) -> &Client {
        self.session.client()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A single network check
#[async_trait]
pub trait Probe: Send + Sync {
    /// Perform the check
    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload>;

    /// Run the check under `timeout`, returning exactly one result.
    ///
    /// Cancellation wins over a simultaneously finished check; dropping the
    /// `execute` future drops any request it had in flight.
    async fn invoke(&self, ctx: &ProbeContext, timeout: Duration) -> ProbeResult {
        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => ProbeResult::Failure(FailureKind::Cancelled),
            outcome = tokio::time::timeout(timeout, self.execute(ctx)) => match outcome {
                Ok(Ok(payload)) => ProbeResult::Success(payload),
                Ok(Err(error)) => ProbeResult::from_error(&error),
                Err(_) => ProbeResult::Failure(FailureKind::Timeout),
            },
        }
    }
}

/// Builds a fresh probe for each launch
pub trait ProbeFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Probe>>;
}

impl<F> ProbeFactory for F
where
    F: Fn() -> Result<Box<dyn Probe>> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn Probe>> {
        self()
    }
}

/// Factory handing out clones of a prototype probe
pub fn cloning_factory<P>(prototype: P) -> Arc<dyn ProbeFactory>
where
    P: Probe + Clone + 'static,
{
    Arc::new(move || -> Result<Box<dyn Probe>> { Ok(Box::new(prototype.clone())) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::session::Session;

    #[derive(Clone)]
    struct Sleeper {
        delay: Duration,
        outcome: std::result::Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl Probe for Sleeper {
        async fn execute(&self, _ctx: &ProbeContext) -> Result<ProbePayload> {
            tokio::time::sleep(self.delay).await;
            match self.outcome {
                Ok(text) => Ok(ProbePayload::text(text)),
                Err(message) => Err(AppError::network(message)),
            }
        }
    }

    fn context(session: &Session) -> ProbeContext {
        ProbeContext::new(ProbeKey::new("sleeper"), session.lease(), CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_success() {
        let session = Session::with_client(Client::new());
        let probe = Sleeper { delay: Duration::from_millis(10), outcome: Ok("pong") };
        let result = probe.invoke(&context(&session), Duration::from_secs(1)).await;
        assert_eq!(result, ProbeResult::text("pong"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_timeout() {
        let session = Session::with_client(Client::new());
        let probe = Sleeper { delay: Duration::from_secs(5), outcome: Ok("late") };
        let result = probe.invoke(&context(&session), Duration::from_millis(100)).await;
        assert_eq!(result, ProbeResult::Failure(FailureKind::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_transport_error() {
        let session = Session::with_client(Client::new());
        let probe = Sleeper { delay: Duration::from_millis(1), outcome: Err("connection refused") };
        let result = probe.invoke(&context(&session), Duration::from_secs(1)).await;
        assert!(matches!(result, ProbeResult::Failure(FailureKind::TransportError(ref m)) if m.contains("connection refused")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_cancelled() {
        let session = Session::with_client(Client::new());
        let ctx = context(&session);
        let token = ctx.cancellation().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let probe = Sleeper { delay: Duration::from_secs(5), outcome: Ok("late") };
        let result = probe.invoke(&ctx, Duration::from_secs(10)).await;
        assert_eq!(result, ProbeResult::Failure(FailureKind::Cancelled));
    }

    #[test]
    fn test_cloning_factory() {
        let factory = cloning_factory(Sleeper { delay: Duration::ZERO, outcome: Ok("x") });
        assert!(factory.create().is_ok());
        assert!(factory.create().is_ok());
    }
}
