//! Collective reception planner.
//!
//! Turns a batch mode and the selected rows into per-row increments. Pure:
//! staging, confirmation and the bulk request live in `batch`.
//!
//! The receiving modes only ever add quantity. A group correction adds one
//! signed value to every selected row and is sent to its own endpoint.

use super::ledger::{not_delivered, validate_increment, PendingChange, QUANTITY_EPSILON};
use contracts::shared::number::{display_quantity, parse_opt};
use contracts::usecases::u508_record_reception::{BulkCorrectionLine, BulkUpdateLine};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectiveError {
    #[error("Partial quantity must be a positive number (got {quantity})")]
    InvalidPartialQuantity { quantity: f64 },

    #[error("Target rate must be between 0 and 100 (got {percent})")]
    InvalidTargetRate { percent: f64 },

    #[error("Correction value must be a non-zero number (got {value})")]
    InvalidCorrectionValue { value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollectiveMode {
    /// Fill every row up to its ordered quantity
    Full,
    /// Same increment on every row, clamped to what remains
    Partial { quantity: f64 },
    /// Bring every row up to `percent` of its ordered quantity
    TargetRate { percent: f64 },
    /// Add `value` (negative removes) to every row's recorded total
    Correction { value: f64 },
}

impl CollectiveMode {
    pub fn validate(&self) -> Result<(), CollectiveError> {
        match *self {
            CollectiveMode::Full => Ok(()),
            CollectiveMode::Partial { quantity } => {
                if quantity.is_finite() && quantity > 0.0 {
                    Ok(())
                } else {
                    Err(CollectiveError::InvalidPartialQuantity { quantity })
                }
            }
            CollectiveMode::TargetRate { percent } => {
                if percent.is_finite() && percent > 0.0 && percent <= 100.0 {
                    Ok(())
                } else {
                    Err(CollectiveError::InvalidTargetRate { percent })
                }
            }
            CollectiveMode::Correction { value } => {
                if value.is_finite() && value != 0.0 {
                    Ok(())
                } else {
                    Err(CollectiveError::InvalidCorrectionValue { value })
                }
            }
        }
    }

    pub fn is_correction(&self) -> bool {
        matches!(self, CollectiveMode::Correction { .. })
    }

    /// Build a mode from the toolbar: `kind` is `full`, `partial`, `rate` or `correction`.
    ///
    /// Unparseable parameter text is treated as 0 and fails validation.
    pub fn from_form(kind: &str, parameter: &str) -> Option<Result<Self, CollectiveError>> {
        let value = parse_opt(parameter).unwrap_or(0.0);
        let mode = match kind {
            "full" => CollectiveMode::Full,
            "partial" => CollectiveMode::Partial { quantity: value },
            "rate" => CollectiveMode::TargetRate { percent: value },
            "correction" => CollectiveMode::Correction { value },
            _ => return None,
        };
        Some(mode.validate().map(|_| mode))
    }

    pub fn label(&self) -> String {
        match self {
            CollectiveMode::Full => "Full reception".to_string(),
            CollectiveMode::Partial { quantity } => {
                format!("Partial reception (+{} per line)", display_quantity(*quantity))
            }
            CollectiveMode::TargetRate { percent } => {
                format!("Reception up to {}%", display_quantity(*percent))
            }
            CollectiveMode::Correction { value } => {
                let sign = if *value > 0.0 { "+" } else { "" };
                format!("Group correction ({}{} per line)", sign, display_quantity(*value))
            }
        }
    }

    fn increment_for(&self, ordered_quantity: f64, current_total: f64) -> f64 {
        let remaining = not_delivered(ordered_quantity, current_total);
        let raw = match *self {
            CollectiveMode::Full => remaining,
            CollectiveMode::Partial { quantity } => quantity,
            CollectiveMode::TargetRate { percent } => {
                ordered_quantity * percent / 100.0 - current_total
            }
            CollectiveMode::Correction { value } => return value,
        };
        raw.clamp(0.0, remaining)
    }
}

/// A checked row as the planner sees it
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedRow {
    pub row: String,
    pub ordered_quantity: f64,
    pub current_total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedIncrement {
    pub row: String,
    pub ordered_quantity: f64,
    pub current_total: f64,
    pub increment: f64,
}

impl PlannedIncrement {
    pub fn resulting_total(&self) -> f64 {
        self.current_total + self.increment
    }

    pub fn to_bulk_line(&self) -> BulkUpdateLine {
        BulkUpdateLine {
            business_id: self.row.clone(),
            quantity_delivered: self.increment,
            ordered_quantity: self.ordered_quantity,
        }
    }

    pub fn to_correction_line(&self) -> BulkCorrectionLine {
        BulkCorrectionLine {
            business_id: self.row.clone(),
            correction_value: self.increment,
            original_quantity: self.ordered_quantity,
        }
    }

    /// Staging entry; rollback shows the server-known total again
    pub fn to_pending_change(&self) -> PendingChange {
        PendingChange {
            row: self.row.clone(),
            ordered_quantity: self.ordered_quantity,
            quantity_delivered: self.increment,
            original_value: self.current_total,
            input_before_edit: display_quantity(self.current_total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyComplete,
    NothingToAdd,
    /// The correction would take the total below 0 or above the ordered quantity
    CorrectionOutOfRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub row: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectivePlan {
    pub mode: CollectiveMode,
    pub selected: usize,
    pub updates: Vec<PlannedIncrement>,
    pub skipped: Vec<SkippedRow>,
}

impl CollectivePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn bulk_lines(&self) -> Vec<BulkUpdateLine> {
        self.updates.iter().map(PlannedIncrement::to_bulk_line).collect()
    }

    pub fn correction_lines(&self) -> Vec<BulkCorrectionLine> {
        self.updates
            .iter()
            .map(PlannedIncrement::to_correction_line)
            .collect()
    }
}

pub fn plan_collective(
    mode: CollectiveMode,
    selection: &[SelectedRow],
) -> Result<CollectivePlan, CollectiveError> {
    mode.validate()?;

    let mut updates = Vec::new();
    let mut skipped = Vec::new();

    for selected in selection {
        if mode.is_correction() {
            let increment = mode.increment_for(selected.ordered_quantity, selected.current_total);
            match validate_increment(selected.ordered_quantity, selected.current_total, increment) {
                Ok(_) => updates.push(PlannedIncrement {
                    row: selected.row.clone(),
                    ordered_quantity: selected.ordered_quantity,
                    current_total: selected.current_total,
                    increment,
                }),
                Err(_) => skipped.push(SkippedRow {
                    row: selected.row.clone(),
                    reason: SkipReason::CorrectionOutOfRange,
                }),
            }
            continue;
        }

        if selected.current_total >= selected.ordered_quantity - QUANTITY_EPSILON {
            skipped.push(SkippedRow {
                row: selected.row.clone(),
                reason: SkipReason::AlreadyComplete,
            });
            continue;
        }

        let increment = mode.increment_for(selected.ordered_quantity, selected.current_total);
        if increment <= QUANTITY_EPSILON {
            skipped.push(SkippedRow {
                row: selected.row.clone(),
                reason: SkipReason::NothingToAdd,
            });
            continue;
        }

        updates.push(PlannedIncrement {
            row: selected.row.clone(),
            ordered_quantity: selected.ordered_quantity,
            current_total: selected.current_total,
            increment,
        });
    }

    log::debug!(
        "collective plan {:?}: {} selected, {} eligible, {} skipped",
        mode,
        selection.len(),
        updates.len(),
        skipped.len()
    );

    Ok(CollectivePlan {
        mode,
        selected: selection.len(),
        updates,
        skipped,
    })
}
