//! Probe registry and scan execution
//!
//! The ComplianceEngine owns the probe catalog and the most recent scan's
//! outcomes:
//! - Keeps probes in registration order with a per-probe enabled flag
//! - Runs all enabled probes, or an enabled subset selected by name
//! - Optionally fans probes out over a rayon pool
//! - Recomputes the overall score and records it in the score history
//!
//! # Scan lifecycle
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    ComplianceEngine                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  1. Discard the previous outcome set                     │
//! │  2. Pick enabled (and selected) probes, registry order   │
//! │  3. Run them: sequentially, or on a pool (join barrier)  │
//! │  4. Swap in the new outcome set as one Arc<[_]>          │
//! │  5. Recompute overall score, push onto history           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Probes are expected never to fail. A probe that panics anyway is caught
//! and its slot filled with a zero-score `Fail` outcome.

use crate::history::ScoreHistory;
use crate::models::{CheckOutcome, CheckStatus, Severity};
use crate::probes::{default_probes, Probe, StatusPolicy, SystemQuery};
use crate::scoring::overall_score;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Called after each probe with `(module_name, done, total)`
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("a module named '{0}' is already registered")]
    DuplicateModule(String),
}

struct ProbeEntry {
    probe: Arc<dyn Probe>,
    enabled: bool,
}

/// Registry of compliance probes plus the latest scan's results
pub struct ComplianceEngine {
    entries: Vec<ProbeEntry>,
    /// Replaced wholesale on every scan
    results: Arc<[CheckOutcome]>,
    overall_score: u8,
    history: ScoreHistory,
    /// 1 = sequential
    workers: usize,
    progress_callback: Option<ProgressCallback>,
}

impl ComplianceEngine {
    /// Empty registry; add probes with [`register`](Self::register)
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            results: Arc::from(Vec::new()),
            overall_score: 0,
            history: ScoreHistory::new(),
            workers: 1,
            progress_callback: None,
        }
    }

    /// Registry holding the nine built-in probes, all enabled
    pub fn with_default_probes(query: Arc<dyn SystemQuery>, policy: StatusPolicy) -> Self {
        let mut engine = Self::new();
        for probe in default_probes(query, policy) {
            engine.push(probe);
        }
        engine
    }

    /// Number of worker threads (values <= 1 run probes sequentially)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Add a probe at the end of the registration order, enabled
    pub fn register(&mut self, probe: Arc<dyn Probe>) -> Result<(), EngineError> {
        if self.position(probe.name()).is_some() {
            return Err(EngineError::DuplicateModule(probe.name().to_string()));
        }
        self.push(probe);
        Ok(())
    }

    fn push(&mut self, probe: Arc<dyn Probe>) {
        debug!("Registered probe: {}", probe.name());
        self.entries.push(ProbeEntry {
            probe,
            enabled: true,
        });
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.probe.name() == name)
    }

    /// Run every enabled probe
    pub fn run_full_scan(&mut self) {
        self.scan(|_| true);
    }

    /// Run enabled probes whose name is in `selected`; unknown names are ignored
    pub fn run_selected_scan<I, S>(&mut self, selected: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected: HashSet<String> = selected
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        self.scan(|name| selected.contains(name));
    }

    fn scan(&mut self, include: impl Fn(&str) -> bool) {
        self.results = Arc::from(Vec::new());

        let probes: Vec<Arc<dyn Probe>> = self
            .entries
            .iter()
            .filter(|e| e.enabled && include(e.probe.name()))
            .map(|e| Arc::clone(&e.probe))
            .collect();

        let start = Instant::now();
        info!(
            "Starting scan with {} of {} probes on {} workers",
            probes.len(),
            self.entries.len(),
            self.workers
        );

        let outcomes = self.execute(&probes);

        self.overall_score = overall_score(&outcomes);
        self.results = Arc::from(outcomes);
        self.history.push(self.overall_score);

        info!(
            "Scan complete: {} outcomes, overall score {} in {:?}",
            self.results.len(),
            self.overall_score,
            start.elapsed()
        );
    }

    /// Run probes and return their outcomes in the order given
    fn execute(&self, probes: &[Arc<dyn Probe>]) -> Vec<CheckOutcome> {
        let completed = AtomicUsize::new(0);
        let total = probes.len();

        let run_one = |probe: &Arc<dyn Probe>| {
            let outcome = run_probe(probe.as_ref());
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(ref callback) = self.progress_callback {
                callback(probe.name(), done, total);
            }
            outcome
        };

        if self.workers <= 1 || total <= 1 {
            return probes.iter().map(run_one).collect();
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            // Indexed collect keeps input order regardless of completion order
            Ok(pool) => pool.install(|| probes.par_iter().map(run_one).collect()),
            Err(e) => {
                warn!("Failed to start worker pool ({}), scanning sequentially", e);
                probes.iter().map(run_one).collect()
            }
        }
    }

    /// Set a probe's enabled flag; unknown names are ignored
    pub fn set_module_enabled(&mut self, name: &str, enabled: bool) {
        match self.position(name) {
            Some(idx) => self.entries[idx].enabled = enabled,
            None => debug!("Ignoring enable/disable for unknown module '{}'", name),
        }
    }

    /// `None` when no probe has that name
    pub fn is_module_enabled(&self, name: &str) -> Option<bool> {
        self.position(name).map(|idx| self.entries[idx].enabled)
    }

    /// Module names in registration order, enabled or not
    pub fn available_modules(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.probe.name()).collect()
    }

    /// Description of a registered module
    pub fn module_description(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|idx| self.entries[idx].probe.description())
    }

    pub fn overall_score(&self) -> u8 {
        self.overall_score
    }

    /// Latest outcomes in registration order
    pub fn results(&self) -> &[CheckOutcome] {
        &self.results
    }

    /// Shared handle to the latest outcome set, unaffected by later scans
    pub fn results_snapshot(&self) -> Arc<[CheckOutcome]> {
        Arc::clone(&self.results)
    }

    pub fn score_history(&self) -> &ScoreHistory {
        &self.history
    }
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one probe, containing panics and enforcing the registered name
fn run_probe(probe: &dyn Probe) -> CheckOutcome {
    let name = probe.name();
    let start = Instant::now();
    debug!("Running probe: {}", name);

    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| probe.run())) {
        Ok(outcome) => {
            debug!(
                "Probe {} finished: {} ({}%) in {}ms",
                name,
                outcome.status(),
                outcome.score(),
                start.elapsed().as_millis()
            );
            if outcome.module_name() != name {
                warn!(
                    "Probe {} reported module name '{}'; re-keying",
                    name,
                    outcome.module_name()
                );
                return outcome.rekeyed(name);
            }
            outcome
        }
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            error!("Probe {} panicked: {}", name, panic_msg);
            CheckOutcome::builder(name, probe.description())
                .status(CheckStatus::Fail)
                .severity(Severity::High)
                .score(0)
                .recommendation("The check crashed before producing a verdict. Re-run the audit and report the failure.")
                .detail(format!("Check panicked: {panic_msg}"))
                .build()
        }
    }
}
