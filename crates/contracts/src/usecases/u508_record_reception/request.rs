use crate::shared::number::fixed2;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Single-row commit of a delivered increment.
///
/// `quantity_delivered` is a delta: the server adds it to the stored
/// cumulative total. Quantities travel as fixed two-decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateDeliveredRequest {
    pub business_id: String,
    /// Ordered quantity of the line
    pub original_quantity: String,
    pub quantity_delivered: String,
    pub bon_number: String,
    /// ISO-8601, set when the request is built
    pub timestamp: String,
}

impl UpdateDeliveredRequest {
    pub fn new(
        business_id: impl Into<String>,
        ordered_quantity: f64,
        increment: f64,
        bon_number: impl Into<String>,
    ) -> Self {
        Self {
            business_id: business_id.into(),
            original_quantity: fixed2(ordered_quantity),
            quantity_delivered: fixed2(increment),
            bon_number: bon_number.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// One line of a collective reception; `quantity_delivered` is a delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkUpdateLine {
    pub business_id: String,
    pub quantity_delivered: f64,
    pub ordered_quantity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkUpdateRequest {
    pub bon_number: String,
    pub updates: Vec<BulkUpdateLine>,
}

/// One line of a group correction: a signed amount added to the recorded total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkCorrectionLine {
    pub business_id: String,
    pub correction_value: f64,
    /// Ordered quantity of the line
    pub original_quantity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkCorrectionRequest {
    pub bon_number: String,
    pub corrections: Vec<BulkCorrectionLine>,
}
