use crate::shared::number::{lenient_f64, lenient_opt_f64};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `status` discriminator shared by every reception endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// Authoritative per-line totals as computed by the server
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReceptionTotals {
    /// Cumulative delivered quantity
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity_delivered: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity_not_delivered: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ordered_quantity: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount_delivered: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount_not_delivered: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity_payable: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount_payable: f64,
}

/// Order-level aggregates returned alongside line totals
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderProgress {
    /// Overall progress, percent
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub taux_avancement: Option<f64>,
    /// Overall received amount
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub montant_total_recu: Option<f64>,
}

impl OrderProgress {
    pub fn is_empty(&self) -> bool {
        self.taux_avancement.is_none() && self.montant_total_recu.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDeliveredResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub totals: ReceptionTotals,
    #[serde(flatten)]
    pub progress: OrderProgress,
}

impl UpdateDeliveredResponse {
    /// Split into totals on success, the server message otherwise
    pub fn into_result(self) -> Result<(ReceptionTotals, OrderProgress), String> {
        match self.status {
            ResponseStatus::Success => Ok((self.totals, self.progress)),
            _ => Err(self
                .message
                .unwrap_or_else(|| "Server rejected the update".to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdatedReception {
    pub business_id: String,
    #[serde(flatten)]
    pub totals: ReceptionTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdateResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub updated_receptions: Vec<UpdatedReception>,
    #[serde(flatten)]
    pub progress: OrderProgress,
}

impl BulkUpdateResponse {
    pub fn into_result(self) -> Result<(Vec<UpdatedReception>, OrderProgress), String> {
        match self.status {
            ResponseStatus::Success => Ok((self.updated_receptions, self.progress)),
            _ => Err(self
                .message
                .unwrap_or_else(|| "Error processing bulk update".to_string())),
        }
    }
}

/// Per-line outcome of a group correction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrectionResult {
    pub business_id: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub correction_applied: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub previous_total: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub new_total: f64,
    #[serde(flatten)]
    pub totals: ReceptionTotals,
}

/// Group correction reply.
///
/// `status: "success"` only means the request was processed: lines the server
/// refused are absent from `results` and described in `errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCorrectionResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Vec<CorrectionResult>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(flatten)]
    pub progress: OrderProgress,
}

impl BulkCorrectionResponse {
    pub fn into_result(
        self,
    ) -> Result<(Vec<CorrectionResult>, Vec<String>, OrderProgress), String> {
        match self.status {
            ResponseStatus::Success => Ok((self.results, self.errors, self.progress)),
            _ => Err(self
                .message
                .unwrap_or_else(|| "Error applying corrections".to_string())),
        }
    }
}

/// `GET` snapshot of every recorded reception of an order, keyed by business id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceptionSnapshotResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub receptions: HashMap<String, ReceptionTotals>,
}

/// Order line as embedded by the host page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceptionLine {
    pub business_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub unit_price: f64,
    #[serde(flatten)]
    pub totals: ReceptionTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_success() {
        let body = r#"{
            "status": "success",
            "quantity_delivered": 8.0,
            "quantity_not_delivered": 2,
            "ordered_quantity": 10,
            "amount_delivered": 80.0,
            "amount_not_delivered": 20.0,
            "quantity_payable": 7.6,
            "amount_payable": 76.0,
            "taux_avancement": 62.5,
            "montant_total_recu": 1250.0,
            "msrn_report_id": null
        }"#;
        let resp: UpdateDeliveredResponse = serde_json::from_str(body).unwrap();
        let (totals, progress) = resp.into_result().unwrap();

        assert_eq!(totals.quantity_delivered, 8.0);
        assert_eq!(totals.quantity_not_delivered, 2.0);
        assert_eq!(totals.amount_payable, 76.0);
        assert_eq!(progress.taux_avancement, Some(62.5));
        assert_eq!(progress.montant_total_recu, Some(1250.0));
    }

    #[test]
    fn test_update_error() {
        let body = r#"{"status": "error", "message": "Quantity exceeds ordered quantity"}"#;
        let resp: UpdateDeliveredResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            resp.into_result().unwrap_err(),
            "Quantity exceeds ordered quantity"
        );
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let resp: UpdateDeliveredResponse =
            serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
        assert_eq!(resp.status, ResponseStatus::Unknown);
        assert!(resp.into_result().is_err());
    }

    #[test]
    fn test_bulk_success_without_aggregates() {
        let body = r#"{
            "status": "success",
            "updated_receptions": [
                {"business_id": "A", "quantity_delivered": 10, "quantity_not_delivered": 0,
                 "amount_delivered": 100, "amount_not_delivered": 0,
                 "quantity_payable": 10, "amount_payable": 100}
            ]
        }"#;
        let resp: BulkUpdateResponse = serde_json::from_str(body).unwrap();
        let (rows, progress) = resp.into_result().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].business_id, "A");
        assert_eq!(rows[0].totals.quantity_delivered, 10.0);
        assert!(progress.is_empty());
    }

    #[test]
    fn test_bulk_correction_with_line_errors() {
        let body = r#"{
            "status": "success",
            "message": "1 corrections appliquées avec succès",
            "results": [
                {"business_id": "A", "correction_applied": -2.0, "new_total": 3.0,
                 "previous_total": 5.0, "quantity_delivered": 3.0, "quantity_not_delivered": 7.0,
                 "amount_delivered": 30.0, "amount_not_delivered": 70.0,
                 "quantity_payable": 3.0, "amount_payable": 30.0}
            ],
            "errors": ["Business ID B: La correction rendrait le total négatif"],
            "taux_avancement": 30.0,
            "montant_total_recu": 30.0,
            "montant_total": 100.0
        }"#;
        let resp: BulkCorrectionResponse = serde_json::from_str(body).unwrap();
        let (results, errors, progress) = resp.into_result().unwrap();

        assert_eq!(results[0].business_id, "A");
        assert_eq!(results[0].previous_total, 5.0);
        assert_eq!(results[0].totals.quantity_delivered, 3.0);
        assert_eq!(results[0].totals.amount_not_delivered, 70.0);
        assert_eq!(errors.len(), 1);
        assert_eq!(progress.taux_avancement, Some(30.0));
    }

    #[test]
    fn test_bulk_correction_error() {
        let resp: BulkCorrectionResponse =
            serde_json::from_str(r#"{"status": "error", "message": "Aucune correction spécifiée"}"#)
                .unwrap();
        assert_eq!(resp.into_result().unwrap_err(), "Aucune correction spécifiée");
    }

    #[test]
    fn test_snapshot_with_string_numbers() {
        let body = r#"{
            "status": "success",
            "receptions": {
                "L1": {"quantity_delivered": "3.00", "ordered_quantity": "10", "supplier": "ACME"}
            }
        }"#;
        let resp: ReceptionSnapshotResponse = serde_json::from_str(body).unwrap();
        let l1 = &resp.receptions["L1"];
        assert_eq!(l1.quantity_delivered, 3.0);
        assert_eq!(l1.ordered_quantity, 10.0);
        assert_eq!(l1.amount_payable, 0.0);
    }

    #[test]
    fn test_reception_line_from_host_page() {
        let body = r#"[{"business_id": "L7", "description": "Cable 3x2.5", "unit_price": "12.5",
                        "ordered_quantity": 20, "quantity_delivered": 5}]"#;
        let lines: Vec<ReceptionLine> = serde_json::from_str(body).unwrap();
        assert_eq!(lines[0].unit_price, 12.5);
        assert_eq!(lines[0].totals.ordered_quantity, 20.0);
        assert_eq!(lines[0].totals.quantity_delivered, 5.0);
    }
}
