//! Pending delivery ledger.
//!
//! Holds the unsaved quantity-delivered increments of the reception table,
//! one entry per row. Every state transition is validated against the
//! server-known cumulative total before it touches the row display, and every
//! rejected or abandoned edit puts the row back to its last confirmed state.
//!
//! The ledger never talks to the DOM directly: it drives a [`RowSurface`],
//! which the reception view implements on reactive signals and the tests
//! implement on a plain map.

use contracts::shared::number::{display_quantity, parse_or_zero};
use contracts::usecases::u508_record_reception::{OrderProgress, ReceptionTotals};
use thiserror::Error;

/// Slack for bound checks on decimal quantities (`0.1 + 0.2` vs `0.3`)
pub const QUANTITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Correction of {increment} would make the delivered total negative (current total {current_total})")]
    InvalidCorrection { increment: f64, current_total: f64 },

    #[error("Delivered total would exceed the ordered quantity {ordered_quantity} (current total {current_total}, requested {increment})")]
    QuantityExceeded {
        increment: f64,
        current_total: f64,
        ordered_quantity: f64,
    },

    #[error("Server rejected the update: {message}")]
    ServerRejected { message: String },

    #[error("Network error: {message}")]
    NetworkFailure { message: String },
}

impl LedgerError {
    pub fn is_network(&self) -> bool {
        matches!(self, LedgerError::NetworkFailure { .. })
    }
}

/// Colour coding of the "quantity not delivered" cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingTone {
    /// Everything delivered
    Complete,
    /// Quantity still outstanding
    Outstanding,
}

impl RemainingTone {
    pub fn for_quantity(not_delivered: f64) -> Self {
        if not_delivered <= QUANTITY_EPSILON {
            RemainingTone::Complete
        } else {
            RemainingTone::Outstanding
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            RemainingTone::Complete => "reception__remaining--complete",
            RemainingTone::Outstanding => "reception__remaining--outstanding",
        }
    }
}

/// Row-level display hooks driven by the ledger
pub trait RowSurface {
    fn set_input_text(&mut self, row: &str, text: &str);
    /// Also re-evaluates the cell's [`RemainingTone`]
    fn set_not_delivered(&mut self, row: &str, not_delivered: f64);
    fn set_pending(&mut self, row: &str, pending: bool);
    fn apply_server_totals(&mut self, row: &str, totals: &ReceptionTotals);
    fn apply_order_progress(&mut self, _progress: &OrderProgress) {}
}

/// `ordered - total`, never negative
pub fn not_delivered(ordered_quantity: f64, cumulative_total: f64) -> f64 {
    (ordered_quantity - cumulative_total).max(0.0)
}

/// Check `current_total + increment` against `[0, ordered_quantity]`.
///
/// Returns the resulting cumulative total.
pub fn validate_increment(
    ordered_quantity: f64,
    current_total: f64,
    increment: f64,
) -> Result<f64, LedgerError> {
    let new_total = current_total + increment;
    if increment < 0.0 && new_total < -QUANTITY_EPSILON {
        return Err(LedgerError::InvalidCorrection {
            increment,
            current_total,
        });
    }
    if increment > 0.0 && new_total > ordered_quantity + QUANTITY_EPSILON {
        return Err(LedgerError::QuantityExceeded {
            increment,
            current_total,
            ordered_quantity,
        });
    }
    Ok(new_total)
}

/// An uncommitted increment for one row
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub row: String,
    pub ordered_quantity: f64,
    /// Signed increment; negative values are corrections
    pub quantity_delivered: f64,
    /// Cumulative total known from the server before this increment
    pub original_value: f64,
    /// Input text to put back on rollback
    pub input_before_edit: String,
}

impl PendingChange {
    pub fn resulting_total(&self) -> f64 {
        self.original_value + self.quantity_delivered
    }

    pub fn projected_not_delivered(&self) -> f64 {
        not_delivered(self.ordered_quantity, self.resulting_total())
    }

    pub fn pre_edit_not_delivered(&self) -> f64 {
        not_delivered(self.ordered_quantity, self.original_value)
    }

    /// Show the increment optimistically and mark the row pending
    pub fn stage_on<S: RowSurface + ?Sized>(&self, surface: &mut S) {
        surface.set_not_delivered(&self.row, self.projected_not_delivered());
        surface.set_pending(&self.row, true);
    }

    /// Put the row back to its state before this change
    pub fn restore_on<S: RowSurface + ?Sized>(&self, surface: &mut S) {
        surface.set_input_text(&self.row, &self.input_before_edit);
        surface.set_pending(&self.row, false);
        surface.set_not_delivered(&self.row, self.pre_edit_not_delivered());
    }

    /// Overwrite the optimistic display with server-confirmed totals
    pub fn commit_on<S: RowSurface + ?Sized>(
        &self,
        surface: &mut S,
        totals: &ReceptionTotals,
    ) {
        surface.set_input_text(&self.row, &display_quantity(totals.quantity_delivered));
        surface.set_not_delivered(&self.row, totals.quantity_not_delivered);
        surface.apply_server_totals(&self.row, totals);
        surface.set_pending(&self.row, false);
    }
}

/// Input captured when a quantity field loses focus
#[derive(Debug, Clone, Copy)]
pub struct RowEdit<'a> {
    pub row: &'a str,
    /// Text currently in the input (the increment being typed)
    pub raw_input: &'a str,
    pub ordered_quantity: f64,
    /// Server-known cumulative total
    pub current_total: f64,
    /// Input text when the field gained focus
    pub text_before_edit: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditOutcome {
    /// Zero increment: nothing pending for the row any more
    Cleared,
    Staged { increment: f64, new_total: f64 },
}

/// One line of the confirmation summary
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLine {
    pub row: String,
    pub increment: f64,
    pub resulting_total: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PendingLedger {
    // insertion order is the order shown in the summary
    changes: Vec<PendingChange>,
}

impl PendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn get(&self, row: &str) -> Option<&PendingChange> {
        self.changes.iter().find(|c| c.row == row)
    }

    pub fn contains(&self, row: &str) -> bool {
        self.get(row).is_some()
    }

    fn remove(&mut self, row: &str) -> Option<PendingChange> {
        let idx = self.changes.iter().position(|c| c.row == row)?;
        Some(self.changes.remove(idx))
    }

    fn upsert(&mut self, change: PendingChange) {
        match self.changes.iter_mut().find(|c| c.row == change.row) {
            Some(existing) => *existing = change,
            None => self.changes.push(change),
        }
    }

    /// Stage (or clear) the increment typed into a row.
    ///
    /// On a validation error the row is restored to its pre-edit text and
    /// remaining quantity and any earlier pending entry for it is dropped.
    pub fn record_edit<S: RowSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        edit: RowEdit<'_>,
    ) -> Result<EditOutcome, LedgerError> {
        let increment = parse_or_zero(edit.raw_input);

        // A re-edit of a pending row rolls back to the text of the first edit
        let input_before_edit = self
            .get(edit.row)
            .map(|c| c.input_before_edit.clone())
            .unwrap_or_else(|| edit.text_before_edit.to_string());

        let change = PendingChange {
            row: edit.row.to_string(),
            ordered_quantity: edit.ordered_quantity,
            quantity_delivered: increment,
            original_value: edit.current_total,
            input_before_edit,
        };

        if increment == 0.0 {
            self.remove(edit.row);
            change.restore_on(surface);
            return Ok(EditOutcome::Cleared);
        }

        match validate_increment(edit.ordered_quantity, edit.current_total, increment) {
            Ok(new_total) => {
                log::debug!(
                    "row {}: staged {:+} (total {} -> {})",
                    edit.row,
                    increment,
                    edit.current_total,
                    new_total
                );
                surface.set_input_text(edit.row, edit.raw_input.trim());
                change.stage_on(surface);
                self.upsert(change);
                Ok(EditOutcome::Staged {
                    increment,
                    new_total,
                })
            }
            Err(e) => {
                log::warn!("row {}: edit rejected: {}", edit.row, e);
                self.remove(edit.row);
                change.restore_on(surface);
                Err(e)
            }
        }
    }

    /// Drop the pending entry of one row and restore its display.
    ///
    /// Returns `false` (and touches nothing) when the row has no entry.
    pub fn cancel_edit<S: RowSurface + ?Sized>(&mut self, surface: &mut S, row: &str) -> bool {
        match self.remove(row) {
            Some(change) => {
                change.restore_on(surface);
                true
            }
            None => false,
        }
    }

    /// Restore every pending row and empty the ledger; returns how many rows were restored.
    pub fn cancel_all<S: RowSurface + ?Sized>(&mut self, surface: &mut S) -> usize {
        let changes = self.drain();
        for change in &changes {
            change.restore_on(surface);
        }
        changes.len()
    }

    pub fn summary(&self) -> Vec<SummaryLine> {
        self.changes
            .iter()
            .map(|c| SummaryLine {
                row: c.row.clone(),
                increment: c.quantity_delivered,
                resulting_total: c.resulting_total(),
            })
            .collect()
    }

    /// Take every entry out, leaving the ledger empty
    pub fn drain(&mut self) -> Vec<PendingChange> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct RowDisplay {
        pub input_text: String,
        pub not_delivered: f64,
        pub pending: bool,
        pub totals: Option<ReceptionTotals>,
    }

    impl RowDisplay {
        pub fn cumulative(&self) -> f64 {
            parse_or_zero(&self.input_text)
        }
    }

    /// In-memory stand-in for the reception table
    #[derive(Debug, Default)]
    pub struct FakeTable {
        pub rows: HashMap<String, RowDisplay>,
        pub progress: Option<OrderProgress>,
    }

    impl FakeTable {
        pub fn with_row(mut self, row: &str, ordered: f64, total: f64) -> Self {
            self.rows.insert(
                row.to_string(),
                RowDisplay {
                    input_text: display_quantity(total),
                    not_delivered: not_delivered(ordered, total),
                    pending: false,
                    totals: None,
                },
            );
            self
        }

        pub fn display(&self, row: &str) -> RowDisplay {
            self.rows.get(row).cloned().unwrap_or_default()
        }
    }

    impl RowSurface for FakeTable {
        fn set_input_text(&mut self, row: &str, text: &str) {
            self.rows.entry(row.to_string()).or_default().input_text = text.to_string();
        }

        fn set_not_delivered(&mut self, row: &str, not_delivered: f64) {
            self.rows.entry(row.to_string()).or_default().not_delivered = not_delivered;
        }

        fn set_pending(&mut self, row: &str, pending: bool) {
            self.rows.entry(row.to_string()).or_default().pending = pending;
        }

        fn apply_server_totals(&mut self, row: &str, totals: &ReceptionTotals) {
            self.rows.entry(row.to_string()).or_default().totals = Some(totals.clone());
        }

        fn apply_order_progress(&mut self, progress: &OrderProgress) {
            self.progress = Some(*progress);
        }
    }

    fn edit<'a>(row: &'a str, raw: &'a str, ordered: f64, total: f64, before: &'a str) -> RowEdit<'a> {
        RowEdit {
            row,
            raw_input: raw,
            ordered_quantity: ordered,
            current_total: total,
            text_before_edit: before,
        }
    }

    #[test]
    fn test_exact_bound_is_accepted() {
        let mut table = FakeTable::default().with_row("r", 10.0, 3.0);
        let mut ledger = PendingLedger::new();

        let outcome = ledger.record_edit(&mut table, edit("r", "7", 10.0, 3.0, "3"));

        assert_eq!(
            outcome,
            Ok(EditOutcome::Staged {
                increment: 7.0,
                new_total: 10.0
            })
        );
        let shown = table.display("r");
        assert!(shown.pending);
        assert_eq!(shown.not_delivered, 0.0);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_exceeding_ordered_quantity_restores_row() {
        let mut table = FakeTable::default().with_row("r", 10.0, 3.0);
        let before = table.display("r");
        let mut ledger = PendingLedger::new();

        let outcome = ledger.record_edit(&mut table, edit("r", "8", 10.0, 3.0, "3"));

        assert!(matches!(outcome, Err(LedgerError::QuantityExceeded { .. })));
        assert_eq!(table.display("r"), before);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_negative_total_is_an_invalid_correction() {
        let mut table = FakeTable::default().with_row("r", 10.0, 3.0);
        let before = table.display("r");
        let mut ledger = PendingLedger::new();

        let outcome = ledger.record_edit(&mut table, edit("r", "-5", 10.0, 3.0, "3"));

        assert_eq!(
            outcome,
            Err(LedgerError::InvalidCorrection {
                increment: -5.0,
                current_total: 3.0
            })
        );
        assert_eq!(table.display("r"), before);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_correction_within_bounds_is_staged() {
        let mut table = FakeTable::default().with_row("r", 10.0, 3.0);
        let mut ledger = PendingLedger::new();

        let outcome = ledger.record_edit(&mut table, edit("r", "-3", 10.0, 3.0, "3"));

        assert_eq!(
            outcome,
            Ok(EditOutcome::Staged {
                increment: -3.0,
                new_total: 0.0
            })
        );
        assert_eq!(table.display("r").not_delivered, 10.0);
    }

    #[test]
    fn test_zero_or_garbage_clears_existing_entry() {
        let mut table = FakeTable::default().with_row("r", 10.0, 3.0);
        let mut ledger = PendingLedger::new();
        ledger
            .record_edit(&mut table, edit("r", "2", 10.0, 3.0, "3"))
            .unwrap();

        let outcome = ledger.record_edit(&mut table, edit("r", "abc", 10.0, 3.0, "2"));

        assert_eq!(outcome, Ok(EditOutcome::Cleared));
        assert!(ledger.is_empty());
        let shown = table.display("r");
        assert_eq!(shown.input_text, "3");
        assert_eq!(shown.not_delivered, 7.0);
        assert!(!shown.pending);
    }

    #[test]
    fn test_re_edit_replaces_entry_and_keeps_first_text() {
        let mut table = FakeTable::default().with_row("r", 10.0, 3.0);
        let mut ledger = PendingLedger::new();
        ledger
            .record_edit(&mut table, edit("r", "2", 10.0, 3.0, "3"))
            .unwrap();

        // the input now shows "2", which is what focus captured
        ledger
            .record_edit(&mut table, edit("r", "4", 10.0, 3.0, "2"))
            .unwrap();

        assert_eq!(ledger.len(), 1);
        let change = ledger.get("r").unwrap();
        assert_eq!(change.quantity_delivered, 4.0);
        assert_eq!(change.input_before_edit, "3");
        assert_eq!(table.display("r").not_delivered, 3.0);
    }

    #[test]
    fn test_failed_re_edit_drops_earlier_entry() {
        let mut table = FakeTable::default().with_row("r", 10.0, 3.0);
        let mut ledger = PendingLedger::new();
        ledger
            .record_edit(&mut table, edit("r", "2", 10.0, 3.0, "3"))
            .unwrap();

        let outcome = ledger.record_edit(&mut table, edit("r", "9", 10.0, 3.0, "2"));

        assert!(outcome.is_err());
        assert!(!ledger.contains("r"));
        let shown = table.display("r");
        assert_eq!(shown.input_text, "3");
        assert_eq!(shown.not_delivered, 7.0);
        assert!(!shown.pending);
    }

    #[test]
    fn test_decimal_noise_at_bound() {
        let mut table = FakeTable::default().with_row("r", 0.3, 0.1);
        let mut ledger = PendingLedger::new();

        let outcome = ledger.record_edit(&mut table, edit("r", "0.2", 0.3, 0.1, "0.1"));

        assert!(outcome.is_ok());
    }

    #[test]
    fn test_cancel_edit_restores_and_is_idempotent() {
        let mut table = FakeTable::default().with_row("r", 10.0, 3.0);
        let before = table.display("r");
        let mut ledger = PendingLedger::new();
        ledger
            .record_edit(&mut table, edit("r", "5", 10.0, 3.0, "3"))
            .unwrap();

        assert!(ledger.cancel_edit(&mut table, "r"));
        assert_eq!(table.display("r"), before);

        assert!(!ledger.cancel_edit(&mut table, "r"));
        assert_eq!(table.display("r"), before);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_cancel_edit_leaves_other_rows_pending() {
        let mut table = FakeTable::default()
            .with_row("a", 10.0, 0.0)
            .with_row("b", 10.0, 0.0);
        let mut ledger = PendingLedger::new();
        ledger
            .record_edit(&mut table, edit("a", "1", 10.0, 0.0, "0"))
            .unwrap();
        ledger
            .record_edit(&mut table, edit("b", "2", 10.0, 0.0, "0"))
            .unwrap();

        ledger.cancel_edit(&mut table, "a");

        assert!(!table.display("a").pending);
        assert!(table.display("b").pending);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_summary_in_edit_order() {
        let mut table = FakeTable::default();
        let mut ledger = PendingLedger::new();
        ledger
            .record_edit(&mut table, edit("z", "1", 10.0, 4.0, "4"))
            .unwrap();
        ledger
            .record_edit(&mut table, edit("a", "-2", 10.0, 4.0, "4"))
            .unwrap();

        let summary = ledger.summary();

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].row, "z");
        assert_eq!(summary[0].resulting_total, 5.0);
        assert_eq!(summary[1].row, "a");
        assert_eq!(summary[1].increment, -2.0);
        assert_eq!(summary[1].resulting_total, 2.0);
    }

    #[test]
    fn test_remaining_tone() {
        assert_eq!(RemainingTone::for_quantity(0.0), RemainingTone::Complete);
        assert_eq!(RemainingTone::for_quantity(0.5), RemainingTone::Outstanding);
    }
}
