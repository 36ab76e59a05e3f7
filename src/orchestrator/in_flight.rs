//! The set of running probes
//!
//! Wraps a `JoinSet` so that every task is known by its [`ProbeKey`]. The
//! set is the only place probe tasks are spawned, joined or aborted.

use crate::error::{AppError, Result};
use crate::probe::{Probe, ProbeContext};
use crate::types::{ProbeKey, ProbeResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;

/// A probe that reached a terminal result
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub key: ProbeKey,
    pub result: ProbeResult,
    /// Time between launch and completion
    pub latency: Duration,
}

#[derive(Default)]
pub struct InFlightSet {
    tasks: JoinSet<ProbeResult>,
    keys: HashMap<Id, (ProbeKey, Instant)>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.tasks.is_empty()
    }

    pub fn contains(&self, key: &ProbeKey) -> bool {
        self.keys.values().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> Vec<ProbeKey> {
        let mut keys: Vec<ProbeKey> = self.keys.values().map(|(k, _)| k.clone()).collect();
        keys.sort();
        keys
    }

    /// Spawn `probe` under `key`; a key may only be in flight once
    pub fn launch(&mut self, probe: Box<dyn Probe>, ctx: ProbeContext, timeout: Duration) -> Result<()> {
        let key = ctx.key().clone();
        if self.contains(&key) {
            return Err(AppError::orchestration(format!(
                "Probe '{}' launched while already in flight", key
            )));
        }

        let handle = self.tasks.spawn(async move { probe.invoke(&ctx, timeout).await });
        self.keys.insert(handle.id(), (key, Instant::now()));
        Ok(())
    }

    /// Wait for the first task to finish; `None` when nothing is running
    pub async fn join_next(&mut self) -> Option<Result<Completion>> {
        let joined = self.tasks.join_next_with_id().await?;
        Some(self.settle(joined))
    }

    /// Collect a task that has already finished, without waiting
    pub fn try_join_next(&mut self) -> Option<Result<Completion>> {
        let joined = self.tasks.try_join_next_with_id()?;
        Some(self.settle(joined))
    }

    fn settle(&mut self, joined: std::result::Result<(Id, ProbeResult), JoinError>) -> Result<Completion> {
        match joined {
            Ok((id, result)) => {
                let (key, launched_at) = self.keys.remove(&id).ok_or_else(|| {
                    AppError::orchestration(format!("Completion for task {} which is not in flight", id))
                })?;
                Ok(Completion { key, result, latency: launched_at.elapsed() })
            }
            Err(error) => {
                let name = match self.keys.remove(&error.id()) {
                    Some((key, _)) => format!("Probe '{}'", key),
                    None => format!("Task {}", error.id()),
                };
                let what = if error.is_panic() { "panicked" } else { "was aborted" };
                Err(AppError::orchestration(format!("{} {}", name, what)))
            }
        }
    }

    /// Wait up to `grace` for every task to stop, then abort the rest.
    ///
    /// Callers cancel the probes' token first. Returns the keys that were
    /// still in flight and whether any task had to be aborted. The set is
    /// empty afterwards.
    pub async fn shutdown(&mut self, grace: Duration) -> (Vec<ProbeKey>, bool) {
        let pending = self.keys();

        let drained = tokio::time::timeout(grace, async {
            while self.tasks.join_next().await.is_some() {}
        })
        .await;

        let aborted = drained.is_err();
        if aborted {
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }

        self.keys.clear();
        (pending, aborted)
    }
}
