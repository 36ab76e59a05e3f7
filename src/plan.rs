//! Declarative run plans
//!
//! A [`Plan`] names a gate probe, an initial wave launched once the gate has
//! resolved, and any number of conditional [`Wave`]s. Each wave watches one
//! trigger key and fires the first time its predicate accepts that key's
//! result. Plans are immutable once built.

use crate::error::{AppError, Result};
use crate::probe::ProbeFactory;
use crate::types::{ProbeKey, ProbeResult};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a wave fires
pub type WavePredicate = Arc<dyn Fn(&ProbeKey, &ProbeResult) -> bool + Send + Sync>;

/// One probe registration
#[derive(Clone)]
pub struct PlanEntry {
    pub key: ProbeKey,
    pub factory: Arc<dyn ProbeFactory>,
    pub timeout: Duration,
}

impl PlanEntry {
    pub fn new(key: ProbeKey, timeout: Duration, factory: Arc<dyn ProbeFactory>) -> Self {
        Self { key, factory, timeout }
    }
}

impl fmt::Debug for PlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanEntry")
            .field("key", &self.key)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Probes launched together once `trigger` produced an accepted result
#[derive(Clone)]
pub struct Wave {
    name: String,
    trigger: ProbeKey,
    predicate: WavePredicate,
    entries: Vec<PlanEntry>,
}

impl Wave {
    pub fn new<F>(name: impl Into<String>, trigger: ProbeKey, predicate: F) -> Self
    where
        F: Fn(&ProbeKey, &ProbeResult) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            trigger,
            predicate: Arc::new(predicate),
            entries: Vec::new(),
        }
    }

    /// Add a probe to this wave
    pub fn probe(mut self, key: ProbeKey, timeout: Duration, factory: Arc<dyn ProbeFactory>) -> Self {
        self.entries.push(PlanEntry::new(key, timeout, factory));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger(&self) -> &ProbeKey {
        &self.trigger
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Whether `result` (recorded for `key`) fires this wave
    pub fn accepts(&self, key: &ProbeKey, result: &ProbeResult) -> bool {
        key == &self.trigger && (self.predicate)(key, result)
    }
}

impl fmt::Debug for Wave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wave")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

/// Immutable description of one run
#[derive(Debug, Clone)]
pub struct Plan {
    gate: PlanEntry,
    initial: Vec<PlanEntry>,
    waves: Vec<Wave>,
}

impl Plan {
    pub fn builder() -> PlanBuilder {
        PlanBuilder::new()
    }

    pub fn gate(&self) -> &PlanEntry {
        &self.gate
    }

    pub fn initial(&self) -> &[PlanEntry] {
        &self.initial
    }

    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Every key the plan can ever launch
    pub fn keys(&self) -> Vec<&ProbeKey> {
        std::iter::once(&self.gate.key)
            .chain(self.initial.iter().map(|e| &e.key))
            .chain(self.waves.iter().flat_map(|w| w.entries.iter().map(|e| &e.key)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// A plan always has its gate
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Builder for [`Plan`]
#[derive(Default)]
pub struct PlanBuilder {
    gate: Option<PlanEntry>,
    initial: Vec<PlanEntry>,
    waves: Vec<Wave>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(mut self, key: ProbeKey, timeout: Duration, factory: Arc<dyn ProbeFactory>) -> Self {
        self.gate = Some(PlanEntry::new(key, timeout, factory));
        self
    }

    /// Add a probe to the initial wave
    pub fn probe(mut self, key: ProbeKey, timeout: Duration, factory: Arc<dyn ProbeFactory>) -> Self {
        self.initial.push(PlanEntry::new(key, timeout, factory));
        self
    }

    pub fn wave(mut self, wave: Wave) -> Self {
        self.waves.push(wave);
        self
    }

    /// Validate and freeze the plan
    pub fn build(self) -> Result<Plan> {
        let gate = self.gate
            .ok_or_else(|| AppError::validation("Plan requires a gate probe"))?;

        let mut seen = HashSet::new();
        let all_entries = std::iter::once(&gate)
            .chain(self.initial.iter())
            .chain(self.waves.iter().flat_map(|w| w.entries.iter()));
        for entry in all_entries {
            if entry.timeout.is_zero() {
                return Err(AppError::validation(format!(
                    "Probe '{}' has a zero timeout", entry.key
                )));
            }
            if !seen.insert(entry.key.clone()) {
                return Err(AppError::validation(format!(
                    "Probe '{}' is registered more than once", entry.key
                )));
            }
        }

        let mut wave_names = HashSet::new();
        for wave in &self.waves {
            if wave.name.trim().is_empty() {
                return Err(AppError::validation("Wave name cannot be empty"));
            }
            if !wave_names.insert(wave.name.as_str()) {
                return Err(AppError::validation(format!("Wave '{}' is defined twice", wave.name)));
            }
            if !seen.contains(&wave.trigger) {
                return Err(AppError::validation(format!(
                    "Wave '{}' is triggered by unknown probe '{}'", wave.name, wave.trigger
                )));
            }
            if wave.entries.iter().any(|e| e.key == wave.trigger) {
                return Err(AppError::validation(format!(
                    "Wave '{}' cannot be triggered by its own probe '{}'", wave.name, wave.trigger
                )));
            }
        }

        Ok(Plan {
            gate,
            initial: self.initial,
            waves: self.waves,
        })
    }
}
