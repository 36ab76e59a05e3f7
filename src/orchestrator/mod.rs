//! Result-streaming probe orchestrator
//!
//! The orchestrator resolves a plan's gate probe, launches the initial wave,
//! and then drains the growing set of in-flight probes one wake-up at a
//! time. Every completion is recorded and handed to the [`ResultSink`] in
//! real completion order, after which the plan's conditional waves are
//! re-evaluated. Whatever way a run ends, the in-flight set is empty and the
//! session is closed exactly once before [`Orchestrator::run`] returns.

pub mod in_flight;
pub mod sink;

pub use in_flight::{Completion, InFlightSet};
pub use sink::{ChannelSink, FnSink, NullSink, ResultSink};

use crate::error::{AppError, Result};
use crate::logging::RunLogger;
use crate::models::Config;
use crate::plan::{Plan, PlanEntry};
use crate::probe::ProbeContext;
use crate::session::{Session, SessionConfig, SessionSummary};
use crate::types::{FailureKind, ProbeKey, ProbeResult, RunStatus};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Opens the per-run session
pub type SessionFactory = Arc<dyn Fn() -> Result<Session> + Send + Sync>;

/// Cancellation and time limits of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    cancel: CancellationToken,
    overall_timeout: Duration,
    grace_period: Duration,
    sink_timeout: Duration,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            overall_timeout: crate::defaults::DEFAULT_OVERALL_TIMEOUT,
            grace_period: crate::defaults::DEFAULT_GRACE_PERIOD,
            sink_timeout: crate::defaults::DEFAULT_SINK_TIMEOUT,
        }
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            cancel: CancellationToken::new(),
            overall_timeout: config.overall_timeout(),
            grace_period: config.grace_period(),
            sink_timeout: config.sink_timeout(),
        }
    }

    /// Use an externally owned token; cancelling it stops the run
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn overall_timeout(&self) -> Duration {
        self.overall_timeout
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn sink_timeout(&self) -> Duration {
        self.sink_timeout
    }
}

/// One entry of the outcome, in delivery order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedResult {
    pub key: ProbeKey,
    pub result: ProbeResult,
    /// Offset from run start at which the result was recorded
    #[serde(rename = "at_ms", serialize_with = "crate::types::serialize_millis")]
    pub at: Duration,
    /// Whether the result was handed to the sink
    pub delivered: bool,
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub results: Vec<RecordedResult>,
    /// Conditional waves that fired, in firing order
    pub fired_waves: Vec<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "crate::types::serialize_millis")]
    pub elapsed: Duration,
    pub session: Option<SessionSummary>,
}

impl RunOutcome {
    pub fn get(&self, key: &ProbeKey) -> Option<&ProbeResult> {
        self.results.iter().find(|r| &r.key == key).map(|r| &r.result)
    }

    /// Keys in the order they were recorded
    pub fn keys(&self) -> Vec<&ProbeKey> {
        self.results.iter().map(|r| &r.key).collect()
    }

    pub fn delivered_count(&self) -> usize {
        self.results.iter().filter(|r| r.delivered).count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn wave_fired(&self, name: &str) -> bool {
        self.fired_waves.iter().any(|w| w == name)
    }
}

/// Drives plans to completion
pub struct Orchestrator {
    session_factory: SessionFactory,
    logger: RunLogger,
}

impl Orchestrator {
    pub fn new(logger: RunLogger) -> Self {
        Self::with_session_config(logger, SessionConfig::default())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(RunLogger::new(config))
    }

    pub fn with_session_config(logger: RunLogger, session_config: SessionConfig) -> Self {
        Self {
            session_factory: Arc::new(move || Session::open(&session_config)),
            logger,
        }
    }

    /// Replace the way sessions are opened
    pub fn with_session_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<Session> + Send + Sync + 'static,
    {
        self.session_factory = Arc::new(factory);
        self
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    /// Execute `plan`, streaming every result to `sink`.
    ///
    /// Probe failures, sink failures and the restricted short-circuit are
    /// part of a successful outcome. Only broken orchestration invariants
    /// (duplicate launch, unknown completion, a panicking probe) are
    /// returned as errors, after every probe has been stopped.
    pub async fn run(&self, plan: &Plan, sink: &dyn ResultSink, context: &RunContext) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        self.logger.run_started(&run_id, plan.len()).await;

        let session = match (self.session_factory)() {
            Ok(session) => session,
            Err(error) => {
                report_gate_unavailable(&self.logger, plan, sink, context, &error).await;
                let outcome = RunOutcome {
                    run_id,
                    status: RunStatus::GateUnavailable,
                    results: Vec::new(),
                    fired_waves: Vec::new(),
                    elapsed: started.elapsed(),
                    session: None,
                };
                self.logger.run_finished(outcome.status, 0, outcome.elapsed).await;
                return Ok(outcome);
            }
        };
        self.logger.session_opened(session.id()).await;

        let mut run = Run::new(plan, sink, context, &self.logger, &session, started);
        let driven = run.drive().await;
        let (results, fired_waves) = run.into_parts();

        let summary = session.close();
        self.logger
            .session_closed(&summary.session_id, summary.lifetime, summary.outstanding_leases)
            .await;

        let status = match driven {
            Ok(status) => status,
            Err(error) => {
                self.logger.run_failed(&error, started.elapsed()).await;
                return Err(error);
            }
        };

        let results = if status == RunStatus::GateUnavailable { Vec::new() } else { results };
        let outcome = RunOutcome {
            run_id,
            status,
            results,
            fired_waves,
            elapsed: started.elapsed(),
            session: Some(summary),
        };
        self.logger.run_finished(status, outcome.delivered_count(), outcome.elapsed).await;
        Ok(outcome)
    }
}

/// Tell the sink the gate could not be attempted at all
async fn report_gate_unavailable(
    logger: &RunLogger,
    plan: &Plan,
    sink: &dyn ResultSink,
    context: &RunContext,
    error: &AppError,
) {
    let key = &plan.gate().key;
    logger.gate_unavailable(key, error).await;
    let result = ProbeResult::from_error(error);
    if let Err(sink_error) = sink::deliver_bounded(sink, key, &result, context.sink_timeout, &context.cancel).await {
        logger.sink_failed(key, &sink_error).await;
    }
}

enum Wake {
    Completed(Vec<Completion>),
    Interrupted(RunStatus),
}

/// State of one run between session open and close
struct Run<'a> {
    plan: &'a Plan,
    sink: &'a dyn ResultSink,
    context: &'a RunContext,
    logger: &'a RunLogger,
    session: &'a Session,
    /// Parent of every probe token; cancelled on shutdown without touching the caller's token
    probes_token: CancellationToken,
    started: Instant,
    deadline: Instant,
    in_flight: InFlightSet,
    /// Completions synthesized without a task (probe factory failures)
    ready: VecDeque<Completion>,
    results: Vec<RecordedResult>,
    fired: Vec<bool>,
    fired_names: Vec<String>,
}

impl<'a> Run<'a> {
    fn new(
        plan: &'a Plan,
        sink: &'a dyn ResultSink,
        context: &'a RunContext,
        logger: &'a RunLogger,
        session: &'a Session,
        started: Instant,
    ) -> Self {
        let deadline = started
            .checked_add(context.overall_timeout)
            .unwrap_or_else(|| started + Duration::from_secs(86_400));

        Self {
            plan,
            sink,
            context,
            logger,
            session,
            probes_token: context.cancel.child_token(),
            started,
            deadline,
            in_flight: InFlightSet::new(),
            ready: VecDeque::new(),
            results: Vec::new(),
            fired: vec![false; plan.waves().len()],
            fired_names: Vec::new(),
        }
    }

    fn into_parts(self) -> (Vec<RecordedResult>, Vec<String>) {
        (self.results, self.fired_names)
    }

    async fn drive(&mut self) -> Result<RunStatus> {
        let plan = self.plan;
        let gate = plan.gate();

        let gate_probe = match gate.factory.create() {
            Ok(probe) => probe,
            Err(error) => {
                report_gate_unavailable(self.logger, plan, self.sink, self.context, &error).await;
                return Ok(RunStatus::GateUnavailable);
            }
        };
        let ctx = ProbeContext::new(gate.key.clone(), self.session.lease(), self.probes_token.child_token());
        if let Err(error) = self.in_flight.launch(gate_probe, ctx, gate.timeout) {
            return self.fail(error).await;
        }
        self.logger.probe_launched(&gate.key, "gate").await;

        let mut gate_pending = true;
        loop {
            let batch: Vec<Completion> = if !self.ready.is_empty() {
                self.ready.drain(..).collect()
            } else if self.in_flight.is_empty() {
                break;
            } else {
                match self.next_wake().await {
                    Ok(Wake::Completed(batch)) => batch,
                    Ok(Wake::Interrupted(status)) => return Ok(self.interrupt(status, Vec::new()).await),
                    Err(error) => return self.fail(error).await,
                }
            };

            let mut batch = batch.into_iter();
            while let Some(completion) = batch.next() {
                if let Some(status) = self.interruption() {
                    let undelivered = std::iter::once(completion.key)
                        .chain(batch.map(|c| c.key))
                        .collect();
                    return Ok(self.interrupt(status, undelivered).await);
                }

                self.logger
                    .probe_completed(&completion.key, &completion.result, completion.latency)
                    .await;
                let is_gate = gate_pending && completion.key == gate.key;
                let restricted = completion.result.restricted_country().map(str::to_string);
                self.deliver(completion.key, completion.result).await;

                if is_gate {
                    gate_pending = false;
                    if let Some(country_code) = restricted {
                        return Ok(self.terminate_initial_wave(&country_code).await);
                    }
                }

                // The sink may have cancelled the run while it held the result
                if let Some(status) = self.interruption() {
                    let undelivered = batch.map(|c| c.key).collect();
                    return Ok(self.interrupt(status, undelivered).await);
                }

                if is_gate {
                    for entry in plan.initial() {
                        if let Err(error) = self.launch(entry, "initial").await {
                            return self.fail(error).await;
                        }
                    }
                }

                if let Err(error) = self.evaluate_waves().await {
                    return self.fail(error).await;
                }
            }
        }

        Ok(RunStatus::Completed)
    }

    /// Suspend until the next completion, cancellation or the overall deadline
    async fn next_wake(&mut self) -> Result<Wake> {
        let first = tokio::select! {
            biased;
            _ = self.context.cancel.cancelled() => return Ok(Wake::Interrupted(RunStatus::Cancelled)),
            _ = tokio::time::sleep_until(self.deadline) => return Ok(Wake::Interrupted(RunStatus::TimedOut)),
            joined = self.in_flight.join_next() => joined,
        };

        let mut batch = Vec::new();
        if let Some(first) = first {
            batch.push(first?);
            while let Some(next) = self.in_flight.try_join_next() {
                batch.push(next?);
            }
        }
        Ok(Wake::Completed(batch))
    }

    fn interruption(&self) -> Option<RunStatus> {
        if self.context.cancel.is_cancelled() {
            Some(RunStatus::Cancelled)
        } else if Instant::now() >= self.deadline {
            Some(RunStatus::TimedOut)
        } else {
            None
        }
    }

    /// Launch one entry; does nothing once the run is interrupted
    async fn launch(&mut self, entry: &PlanEntry, wave: &str) -> Result<()> {
        if self.interruption().is_some() {
            return Ok(());
        }

        let probe = match entry.factory.create() {
            Ok(probe) => probe,
            Err(error) => {
                self.logger.factory_failed(&entry.key, &error).await;
                self.ready.push_back(Completion {
                    key: entry.key.clone(),
                    result: ProbeResult::transport_error(format!("could not build probe: {}", error)),
                    latency: Duration::ZERO,
                });
                return Ok(());
            }
        };

        let ctx = ProbeContext::new(entry.key.clone(), self.session.lease(), self.probes_token.child_token());
        self.in_flight.launch(probe, ctx, entry.timeout)?;
        self.logger.probe_launched(&entry.key, wave).await;
        Ok(())
    }

    /// Record a result and hand it to the sink; sink failures stop here
    async fn deliver(&mut self, key: ProbeKey, result: ProbeResult) {
        let at = self.started.elapsed();
        let delivered = match sink::deliver_bounded(
            self.sink,
            &key,
            &result,
            self.context.sink_timeout,
            &self.context.cancel,
        )
        .await
        {
            Ok(()) => true,
            Err(AppError::Cancelled(_)) => false,
            Err(error) => {
                self.logger.sink_failed(&key, &error).await;
                true
            }
        };
        self.results.push(RecordedResult { key, result, at, delivered });
    }

    /// Fire every unfired wave whose trigger result is now accepted
    async fn evaluate_waves(&mut self) -> Result<()> {
        let plan = self.plan;
        for (index, wave) in plan.waves().iter().enumerate() {
            if self.interruption().is_some() {
                return Ok(());
            }
            if self.fired[index] {
                continue;
            }
            if !self.results.iter().any(|r| wave.accepts(&r.key, &r.result)) {
                continue;
            }

            self.fired[index] = true;
            self.fired_names.push(wave.name().to_string());
            self.logger.wave_fired(wave.name(), wave.trigger(), wave.entries().len()).await;
            for entry in wave.entries() {
                self.launch(entry, wave.name()).await?;
            }
        }
        Ok(())
    }

    /// Deliver `Terminated` for every initial-wave key after a restricted gate
    async fn terminate_initial_wave(&mut self, country_code: &str) -> RunStatus {
        let plan = self.plan;
        let gate_key = &plan.gate().key;
        let keys: Vec<ProbeKey> = plan
            .initial()
            .iter()
            .map(|entry| entry.key.clone())
            .filter(|key| key != gate_key)
            .collect();
        self.logger.restricted(country_code, keys.len()).await;

        for key in keys {
            if self.interruption().is_some() {
                self.results.push(RecordedResult {
                    key,
                    result: ProbeResult::Failure(FailureKind::Terminated),
                    at: self.started.elapsed(),
                    delivered: false,
                });
                continue;
            }
            self.deliver(key, ProbeResult::Failure(FailureKind::Terminated)).await;
        }
        RunStatus::Restricted
    }

    /// Stop every probe; returns the keys that were still in flight
    async fn shutdown(&mut self) -> Vec<ProbeKey> {
        self.probes_token.cancel();
        let in_flight = self.in_flight.len();
        let (pending, aborted) = self.in_flight.shutdown(self.context.grace_period).await;
        if aborted {
            self.logger.aborted_after_grace(in_flight, self.context.grace_period).await;
        }
        pending
    }

    /// External cancellation or overall timeout: stop without further deliveries
    async fn interrupt(&mut self, status: RunStatus, undelivered: Vec<ProbeKey>) -> RunStatus {
        let reason = match status {
            RunStatus::TimedOut => "overall timeout elapsed",
            _ => "run cancelled",
        };
        self.logger.cancelling(reason, self.in_flight.len() + undelivered.len()).await;

        let pending = self.shutdown().await;
        let at = self.started.elapsed();
        for key in undelivered.into_iter().chain(pending) {
            self.results.push(RecordedResult {
                key,
                result: ProbeResult::Failure(FailureKind::Cancelled),
                at,
                delivered: false,
            });
        }
        status
    }

    /// Broken invariant: stop every probe and surface the error
    async fn fail(&mut self, error: AppError) -> Result<RunStatus> {
        self.logger.cancelling("orchestration failure", self.in_flight.len()).await;
        self.shutdown().await;
        self.ready.clear();
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Logger;
    use crate::probe::{Probe, ProbeFactory};
    use crate::types::ProbePayload;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Fixed {
        delay: Duration,
        result: ProbeResult,
    }

    #[async_trait]
    impl Probe for Fixed {
        async fn execute(&self, _ctx: &ProbeContext) -> Result<ProbePayload> {
            Ok(ProbePayload::Empty)
        }

        async fn invoke(&self, ctx: &ProbeContext, _timeout: Duration) -> ProbeResult {
            tokio::select! {
                _ = ctx.cancellation().cancelled() => ProbeResult::Failure(FailureKind::Cancelled),
                _ = tokio::time::sleep(self.delay) => self.result.clone(),
            }
        }
    }

    fn fixed(millis: u64, result: ProbeResult) -> Arc<dyn ProbeFactory> {
        Arc::new(move || -> Result<Box<dyn Probe>> {
            Ok(Box::new(Fixed { delay: Duration::from_millis(millis), result: result.clone() }))
        })
    }

    fn quiet_orchestrator() -> Orchestrator {
        let (logger, _) = Logger::capturing("RUN".to_string());
        Orchestrator::new(RunLogger::from_logger(logger))
    }

    type Seen = Arc<Mutex<Vec<String>>>;

    fn recording_sink() -> (FnSink<impl Fn(&ProbeKey, &ProbeResult) -> Result<()> + Send + Sync>, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let sink = FnSink::new(move |key: &ProbeKey, _result: &ProbeResult| {
            captured.lock().unwrap().push(key.to_string());
            Ok(())
        });
        (sink, seen)
    }

    const T: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn test_factory_failure_is_delivered_as_transport_error() {
        let failing: Arc<dyn ProbeFactory> =
            Arc::new(|| -> Result<Box<dyn Probe>> { Err(AppError::config("no endpoint")) });
        let plan = Plan::builder()
            .gate(ProbeKey::new("gate"), T, fixed(10, ProbeResult::text("ok")))
            .probe(ProbeKey::new("broken"), T, failing)
            .probe(ProbeKey::new("fine"), T, fixed(5, ProbeResult::text("ok")))
            .build()
            .unwrap();

        let (sink, seen) = recording_sink();
        let outcome = quiet_orchestrator().run(&plan, &sink, &RunContext::new()).await.unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(*seen.lock().unwrap(), vec!["gate", "broken", "fine"]);
        assert!(matches!(
            outcome.get(&ProbeKey::new("broken")),
            Some(ProbeResult::Failure(FailureKind::TransportError(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wave_triggered_by_gate() {
        let plan = Plan::builder()
            .gate(ProbeKey::new("gate"), T, fixed(10, ProbeResult::text("ok")))
            .wave(crate::plan::Wave::new("after-gate", ProbeKey::new("gate"), |_, r| r.is_success())
                .probe(ProbeKey::new("extra"), T, fixed(10, ProbeResult::text("ok"))))
            .build()
            .unwrap();

        let (sink, seen) = recording_sink();
        let outcome = quiet_orchestrator().run(&plan, &sink, &RunContext::new()).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["gate", "extra"]);
        assert_eq!(outcome.fired_waves, vec!["after-gate"]);
        assert_eq!(outcome.session.as_ref().map(|s| s.outstanding_leases), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_timeout_interrupts_run() {
        let plan = Plan::builder()
            .gate(ProbeKey::new("gate"), T, fixed(10, ProbeResult::text("ok")))
            .probe(ProbeKey::new("slow"), Duration::from_secs(60), fixed(30_000, ProbeResult::text("late")))
            .build()
            .unwrap();

        let (sink, seen) = recording_sink();
        let context = RunContext::new().with_overall_timeout(Duration::from_secs(1));
        let outcome = quiet_orchestrator().run(&plan, &sink, &context).await.unwrap();

        assert_eq!(outcome.status, RunStatus::TimedOut);
        assert_eq!(*seen.lock().unwrap(), vec!["gate"]);
        let slow = outcome.results.iter().find(|r| r.key == ProbeKey::new("slow")).unwrap();
        assert_eq!(slow.result, ProbeResult::Failure(FailureKind::Cancelled));
        assert!(!slow.delivered);
        assert_eq!(outcome.elapsed, Duration::from_secs(1));
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = RunOutcome {
            run_id: "r".to_string(),
            status: RunStatus::Completed,
            results: vec![RecordedResult {
                key: ProbeKey::GITHUB_SPEED,
                result: ProbeResult::Success(ProbePayload::Latency { millis: 12.5 }),
                at: Duration::from_millis(40),
                delivered: true,
            }],
            fired_waves: vec![],
            elapsed: Duration::from_millis(41),
            session: None,
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["results"][0]["key"], "github_speed");
        assert_eq!(json["results"][0]["at_ms"], 40.0);
        assert_eq!(json["results"][0]["result"]["value"]["millis"], 12.5);
    }
}
