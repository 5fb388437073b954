//! Terminal progress for a sync run.
//!
//! One bar per matched card, advanced per file set. Bars draw on stderr and indicatif hides
//! them when stderr is not a terminal, so piped output and logs stay clean.

use camera_sync_core::filter_disks::SyncPair;
use camera_sync_core::operation::OperationResult;
use camera_sync_core::synchronise::{PairReport, SyncObserver};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner:.green} {prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

pub struct ProgressObserver {
    multi: MultiProgress,
    current: Option<ProgressBar>,
    failures: u64,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Draws nowhere. Used by tests and `--json-logs` runs.
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            current: None,
            failures: 0,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncObserver for ProgressObserver {
    fn pair_started(&mut self, pair: &SyncPair, file_sets: usize) {
        let bar = self.multi.add(ProgressBar::new(file_sets as u64));
        bar.set_style(Self::style());
        bar.set_prefix(pair.sync.source.source_type.to_string());
        bar.set_message(pair.volume.mount_path.display().to_string());
        self.failures = 0;
        self.current = Some(bar);
    }

    fn file_set_finished(&mut self, _pair: &SyncPair) {
        if let Some(bar) = &self.current {
            bar.inc(1);
        }
    }

    fn operation_finished(&mut self, result: &OperationResult) {
        if !result.success {
            self.failures += 1;
            if let Some(bar) = &self.current {
                bar.set_message(format!("{} failed", self.failures));
            }
        }
    }

    fn pair_finished(&mut self, report: &PairReport) {
        let Some(bar) = self.current.take() else {
            return;
        };
        let c = &report.counters;
        match &report.error {
            Some(error) => bar.abandon_with_message(format!("error: {error}")),
            None => bar.finish_with_message(format!(
                "copy {} identical {} unknown {} failed {}",
                c.copy, c.identical, c.unknown, c.failure
            )),
        }
    }
}
