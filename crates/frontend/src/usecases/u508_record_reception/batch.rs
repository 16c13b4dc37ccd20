//! Batch commit of staged receptions.
//!
//! `confirm_all` commits the per-row ledger with one request per row, issued
//! concurrently and reconciled in completion order. `apply_collective` commits
//! a collective plan with a single bulk request, or a single group-correction
//! request for a correction plan. Both ask for confirmation first and leave
//! every row either server-confirmed or rolled back.

use super::api::{BulkOutcome, ReceptionApi};
use super::collective::{CollectivePlan, SkippedRow};
use super::ledger::{LedgerError, PendingChange, PendingLedger, RowSurface, SummaryLine};
use async_trait::async_trait;
use contracts::usecases::u508_record_reception::{OrderProgress, ReceptionTotals};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;

/// What the collective confirmation dialog shows
#[derive(Debug, Clone, PartialEq)]
pub struct CollectivePreview {
    pub label: String,
    pub selected: usize,
    pub eligible: usize,
    pub skipped: usize,
    pub lines: Vec<SummaryLine>,
}

impl CollectivePreview {
    pub fn from_plan(plan: &CollectivePlan) -> Self {
        Self {
            label: plan.mode.label(),
            selected: plan.selected,
            eligible: plan.updates.len(),
            skipped: plan.skipped.len(),
            lines: plan
                .updates
                .iter()
                .map(|p| SummaryLine {
                    row: p.row.clone(),
                    increment: p.increment,
                    resulting_total: p.resulting_total(),
                })
                .collect(),
        }
    }
}

/// UI callbacks around a batch commit
#[async_trait(?Send)]
pub trait BatchHooks {
    /// Show the pending summary; `true` means commit
    async fn confirm_summary(&self, summary: &[SummaryLine]) -> bool;

    async fn confirm_collective(&self, preview: &CollectivePreview) -> bool;

    /// Fired once every request of a confirmed batch has settled
    fn on_batch_settled(&self, _result: &BatchResult) {}

    fn page_unloading(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row: String,
    pub error: LedgerError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchResult {
    /// Nothing was staged
    Empty,
    /// Confirmation declined; every staged row was restored
    Cancelled { restored: usize },
    Succeeded { committed: Vec<String> },
    PartiallySucceeded {
        committed: Vec<String>,
        failed: Vec<RowFailure>,
    },
    Failed { failed: Vec<RowFailure> },
}

impl BatchResult {
    fn settle(committed: Vec<String>, failed: Vec<RowFailure>) -> Self {
        match (committed.is_empty(), failed.is_empty()) {
            (_, true) => BatchResult::Succeeded { committed },
            (true, false) => BatchResult::Failed { failed },
            (false, false) => BatchResult::PartiallySucceeded { committed, failed },
        }
    }

    pub fn committed(&self) -> &[String] {
        match self {
            BatchResult::Succeeded { committed }
            | BatchResult::PartiallySucceeded { committed, .. } => committed.as_slice(),
            _ => &[],
        }
    }

    pub fn failed(&self) -> &[RowFailure] {
        match self {
            BatchResult::PartiallySucceeded { failed, .. } | BatchResult::Failed { failed } => {
                failed.as_slice()
            }
            _ => &[],
        }
    }

    /// One-line user notice, `None` when there is nothing to report
    pub fn notice(&self) -> Option<String> {
        match self {
            BatchResult::Empty | BatchResult::Cancelled { .. } => None,
            BatchResult::Succeeded { committed } => {
                Some(format!("{} line(s) updated", committed.len()))
            }
            BatchResult::PartiallySucceeded { committed, failed } => Some(format!(
                "{} line(s) updated, {} failed: {}",
                committed.len(),
                failed.len(),
                describe_failures(failed)
            )),
            BatchResult::Failed { failed } => Some(format!(
                "No line updated: {}",
                describe_failures(failed)
            )),
        }
    }
}

fn describe_failures(failed: &[RowFailure]) -> String {
    failed
        .iter()
        .map(|f| format!("{} ({})", f.row, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectiveResult {
    pub batch: BatchResult,
    pub skipped: Vec<SkippedRow>,
}

fn commit_row<S: RowSurface + ?Sized>(
    surface: &mut S,
    change: &PendingChange,
    totals: &ReceptionTotals,
    progress: &OrderProgress,
) {
    change.commit_on(surface, totals);
    if !progress.is_empty() {
        surface.apply_order_progress(progress);
    }
}

fn reject_row<S, H>(
    surface: &mut S,
    hooks: &H,
    change: &PendingChange,
    error: LedgerError,
) -> RowFailure
where
    S: RowSurface + ?Sized,
    H: BatchHooks + ?Sized,
{
    if error.is_network() && hooks.page_unloading() {
        log::debug!("row {}: request dropped by page unload", change.row);
    } else {
        log::warn!("row {}: commit failed: {}", change.row, error);
    }
    change.restore_on(surface);
    RowFailure {
        row: change.row.clone(),
        error,
    }
}

/// Per-line errors of a processed bulk request name their line first
fn names_row(message: &str, row: &str) -> bool {
    message
        .strip_prefix("Business ID ")
        .and_then(|rest| rest.strip_prefix(row))
        .is_some_and(|rest| rest.starts_with(':'))
}

fn line_error_for(line_errors: &[String], row: &str) -> Option<String> {
    line_errors
        .iter()
        .find(|message| names_row(message, row))
        .cloned()
}

fn finish<H: BatchHooks + ?Sized>(hooks: &H, result: BatchResult) -> BatchResult {
    if hooks.page_unloading() {
        log::debug!("batch settled during page unload, notification skipped");
    } else {
        hooks.on_batch_settled(&result);
    }
    result
}

/// Commit every pending row after confirmation.
///
/// The ledger is empty when this returns, whatever the outcome.
pub async fn confirm_all<A, S, H>(
    ledger: &mut PendingLedger,
    api: &A,
    surface: &mut S,
    hooks: &H,
) -> BatchResult
where
    A: ReceptionApi + ?Sized,
    S: RowSurface + ?Sized,
    H: BatchHooks + ?Sized,
{
    if ledger.is_empty() {
        return BatchResult::Empty;
    }

    let summary = ledger.summary();
    if !hooks.confirm_summary(&summary).await {
        let restored = ledger.cancel_all(surface);
        log::info!("batch declined, {} row(s) restored", restored);
        return BatchResult::Cancelled { restored };
    }

    let changes = ledger.drain();
    log::info!("committing {} pending row(s)", changes.len());

    let mut inflight: FuturesUnordered<_> = changes
        .iter()
        .map(|change| async move { (change, api.update_delivered(change).await) })
        .collect();

    let mut committed = Vec::new();
    let mut failed = Vec::new();
    while let Some((change, outcome)) = inflight.next().await {
        match outcome {
            Ok((totals, progress)) => {
                log::debug!(
                    "row {}: committed, total {}",
                    change.row,
                    totals.quantity_delivered
                );
                commit_row(surface, change, &totals, &progress);
                committed.push(change.row.clone());
            }
            Err(e) => failed.push(reject_row(surface, hooks, change, e)),
        }
    }

    finish(hooks, BatchResult::settle(committed, failed))
}

/// Stage a collective plan, confirm it, then commit it in one bulk request.
pub async fn apply_collective<A, S, H>(
    plan: CollectivePlan,
    api: &A,
    surface: &mut S,
    hooks: &H,
) -> CollectiveResult
where
    A: ReceptionApi + ?Sized,
    S: RowSurface + ?Sized,
    H: BatchHooks + ?Sized,
{
    if plan.is_empty() {
        return CollectiveResult {
            batch: BatchResult::Empty,
            skipped: plan.skipped,
        };
    }

    let staged: Vec<PendingChange> = plan
        .updates
        .iter()
        .map(|p| p.to_pending_change())
        .collect();
    for change in &staged {
        change.stage_on(surface);
    }

    let preview = CollectivePreview::from_plan(&plan);
    if !hooks.confirm_collective(&preview).await {
        for change in &staged {
            change.restore_on(surface);
        }
        return CollectiveResult {
            batch: BatchResult::Cancelled {
                restored: staged.len(),
            },
            skipped: plan.skipped,
        };
    }

    log::info!("{}: committing {} row(s)", preview.label, staged.len());

    let reply = if plan.mode.is_correction() {
        api.bulk_correction(&plan.correction_lines()).await
    } else {
        api.bulk_update(&plan.bulk_lines()).await
    };

    let mut committed = Vec::new();
    let mut failed = Vec::new();
    match reply {
        Ok(BulkOutcome {
            updated,
            line_errors,
            progress,
        }) => {
            let mut by_row: HashMap<String, ReceptionTotals> = updated
                .into_iter()
                .map(|u| (u.business_id, u.totals))
                .collect();
            for change in &staged {
                match by_row.remove(&change.row) {
                    Some(totals) => {
                        change.commit_on(surface, &totals);
                        committed.push(change.row.clone());
                    }
                    None => {
                        let message = line_error_for(&line_errors, &change.row)
                            .unwrap_or_else(|| "Line missing from bulk response".to_string());
                        let error = LedgerError::ServerRejected { message };
                        failed.push(reject_row(surface, hooks, change, error));
                    }
                }
            }
            for message in &line_errors {
                if !staged.iter().any(|c| names_row(message, &c.row)) {
                    log::warn!("bulk error not matched to a line: {}", message);
                }
            }
            if !progress.is_empty() {
                surface.apply_order_progress(&progress);
            }
        }
        Err(e) => {
            for change in &staged {
                failed.push(reject_row(surface, hooks, change, e.clone()));
            }
        }
    }

    CollectiveResult {
        batch: finish(hooks, BatchResult::settle(committed, failed)),
        skipped: plan.skipped,
    }
}
