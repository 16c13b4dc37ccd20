use super::ledger::{LedgerError, PendingChange};
use crate::shared::api_utils::{api_url, csrf_token};
use crate::shared::page_unload::UnloadGuard;
use async_trait::async_trait;
use contracts::usecases::u508_record_reception::{
    BulkCorrectionLine, BulkCorrectionRequest, BulkCorrectionResponse, BulkUpdateLine,
    BulkUpdateRequest, BulkUpdateResponse, OrderProgress, ReceptionSnapshotResponse,
    ReceptionTotals, ResponseStatus, UpdateDeliveredRequest, UpdateDeliveredResponse,
    UpdatedReception,
};
use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// Transport failure, as opposed to a `status: "error"` reply
const NETWORK_PREFIX: &str = "Failed to send request";

/// Reply of a processed bulk request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    /// Lines the server applied, with their new totals
    pub updated: Vec<UpdatedReception>,
    /// Messages for lines the server refused
    pub line_errors: Vec<String>,
    pub progress: OrderProgress,
}

/// Commit seam used by the batch flows
#[async_trait(?Send)]
pub trait ReceptionApi {
    async fn update_delivered(
        &self,
        change: &PendingChange,
    ) -> Result<(ReceptionTotals, OrderProgress), LedgerError>;

    async fn bulk_update(&self, updates: &[BulkUpdateLine]) -> Result<BulkOutcome, LedgerError>;

    async fn bulk_correction(
        &self,
        corrections: &[BulkCorrectionLine],
    ) -> Result<BulkOutcome, LedgerError>;
}

/// Same-origin client for one purchase order
#[derive(Debug, Clone)]
pub struct HttpReceptionApi {
    pub bon_id: String,
    pub bon_number: String,
}

impl HttpReceptionApi {
    pub fn new(bon_id: impl Into<String>, bon_number: impl Into<String>) -> Self {
        Self {
            bon_id: bon_id.into(),
            bon_number: bon_number.into(),
        }
    }
}

fn into_ledger_error(message: String) -> LedgerError {
    if message.starts_with(NETWORK_PREFIX) {
        LedgerError::NetworkFailure { message }
    } else {
        LedgerError::ServerRejected { message }
    }
}

#[async_trait(?Send)]
impl ReceptionApi for HttpReceptionApi {
    async fn update_delivered(
        &self,
        change: &PendingChange,
    ) -> Result<(ReceptionTotals, OrderProgress), LedgerError> {
        let request = UpdateDeliveredRequest::new(
            change.row.clone(),
            change.ordered_quantity,
            change.quantity_delivered,
            self.bon_number.clone(),
        );
        post_json::<_, UpdateDeliveredResponse>(&update_endpoint(&self.bon_id), &request)
            .await
            .and_then(UpdateDeliveredResponse::into_result)
            .map_err(into_ledger_error)
    }

    async fn bulk_update(&self, updates: &[BulkUpdateLine]) -> Result<BulkOutcome, LedgerError> {
        let request = BulkUpdateRequest {
            bon_number: self.bon_number.clone(),
            updates: updates.to_vec(),
        };
        let (updated, progress) =
            post_json::<_, BulkUpdateResponse>(&bulk_endpoint(&self.bon_id), &request)
                .await
                .and_then(BulkUpdateResponse::into_result)
                .map_err(into_ledger_error)?;
        Ok(BulkOutcome {
            updated,
            line_errors: Vec::new(),
            progress,
        })
    }

    async fn bulk_correction(
        &self,
        corrections: &[BulkCorrectionLine],
    ) -> Result<BulkOutcome, LedgerError> {
        let request = BulkCorrectionRequest {
            bon_number: self.bon_number.clone(),
            corrections: corrections.to_vec(),
        };
        let (results, line_errors, progress) =
            post_json::<_, BulkCorrectionResponse>(&correction_endpoint(&self.bon_id), &request)
                .await
                .and_then(BulkCorrectionResponse::into_result)
                .map_err(into_ledger_error)?;
        Ok(BulkOutcome {
            updated: results
                .into_iter()
                .map(|r| UpdatedReception {
                    business_id: r.business_id,
                    totals: r.totals,
                })
                .collect(),
            line_errors,
            progress,
        })
    }
}

fn update_endpoint(bon_id: &str) -> String {
    api_url(&format!("/orders/api/update-quantity-delivered/{}/", bon_id))
}

fn bulk_endpoint(bon_id: &str) -> String {
    api_url(&format!("/orders/api/receptions/{}/bulk_update/", bon_id))
}

fn correction_endpoint(bon_id: &str) -> String {
    api_url(&format!("/orders/api/bulk-correction/{}/", bon_id))
}

/// Error replies carry a JSON body too, so the body is read before the HTTP status.
async fn read_reply<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    let status = response.status();
    match response.json::<T>().await {
        Ok(body) => Ok(body),
        Err(_) if !response.ok() => Err(format!("HTTP error: {}", status)),
        Err(e) => Err(format!("Failed to parse response: {}", e)),
    }
}

/// POST a JSON body with the CSRF header and decode the JSON reply
pub async fn post_json<B: Serialize, T: DeserializeOwned>(url: &str, body: &B) -> Result<T, String> {
    let csrf = csrf_token().unwrap_or_default();

    let response = Request::post(url)
        .header("X-CSRFToken", &csrf)
        .json(body)
        .map_err(|e| format!("Failed to serialize request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("{}: {}", NETWORK_PREFIX, e))?;

    read_reply(response).await
}

/// Load the recorded receptions of an order, keyed by business id.
///
/// The request is tracked by `guard` so navigating away aborts it.
pub async fn fetch_snapshot(
    bon_id: &str,
    bon_number: &str,
    guard: &UnloadGuard,
) -> Result<HashMap<String, ReceptionTotals>, String> {
    let url = format!(
        "{}?bon_number={}",
        update_endpoint(bon_id),
        urlencoding::encode(bon_number)
    );
    let signal = guard.track();

    let result = Request::get(&url)
        .abort_signal(signal.as_ref())
        .send()
        .await
        .map_err(|e| format!("{}: {}", NETWORK_PREFIX, e));
    guard.release();

    let body: ReceptionSnapshotResponse = read_reply(result?).await?;
    match body.status {
        ResponseStatus::Success => Ok(body.receptions),
        _ => Err(body
            .message
            .unwrap_or_else(|| "Failed to load receptions".to_string())),
    }
}
