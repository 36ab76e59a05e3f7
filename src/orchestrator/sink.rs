//! Consumers of streamed probe results

use crate::error::{AppError, Result};
use crate::types::{ProbeKey, ProbeResult};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Receives each probe result as soon as it is available
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, key: &ProbeKey, result: &ProbeResult) -> Result<()>;
}

#[async_trait]
impl<S: ResultSink + ?Sized> ResultSink for std::sync::Arc<S> {
    async fn deliver(&self, key: &ProbeKey, result: &ProbeResult) -> Result<()> {
        (**self).deliver(key, result).await
    }
}

/// Sink backed by a synchronous closure
pub struct FnSink<F> {
    callback: F,
}

impl<F> FnSink<F>
where
    F: Fn(&ProbeKey, &ProbeResult) -> Result<()> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> ResultSink for FnSink<F>
where
    F: Fn(&ProbeKey, &ProbeResult) -> Result<()> + Send + Sync,
{
    async fn deliver(&self, key: &ProbeKey, result: &ProbeResult) -> Result<()> {
        (self.callback)(key, result)
    }
}

/// Sink forwarding results into a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<(ProbeKey, ProbeResult)>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<(ProbeKey, ProbeResult)>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn deliver(&self, key: &ProbeKey, result: &ProbeResult) -> Result<()> {
        self.sender
            .send((key.clone(), result.clone()))
            .await
            .map_err(|_| AppError::sink("result receiver was dropped"))
    }
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl ResultSink for NullSink {
    async fn deliver(&self, _key: &ProbeKey, _result: &ProbeResult) -> Result<()> {
        Ok(())
    }
}

/// Deliver one result, bounded by `limit` and the run's cancellation
pub(crate) async fn deliver_bounded(
    sink: &dyn ResultSink,
    key: &ProbeKey,
    result: &ProbeResult,
    limit: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::cancelled(format!("delivery of '{}' interrupted", key))),
        delivered = tokio::time::timeout(limit, AssertUnwindSafe(sink.deliver(key, result)).catch_unwind()) => match delivered {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => Err(AppError::sink(format!(
                "sink panicked on '{}': {}", key, panic_message(panic.as_ref())
            ))),
            Err(_) => Err(AppError::sink(format!(
                "delivery of '{}' exceeded {}ms", key, limit.as_millis()
            ))),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
