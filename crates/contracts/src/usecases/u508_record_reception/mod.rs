pub mod request;
pub mod response;

pub use request::{
    BulkCorrectionLine, BulkCorrectionRequest, BulkUpdateLine, BulkUpdateRequest,
    UpdateDeliveredRequest,
};
pub use response::{
    BulkCorrectionResponse, BulkUpdateResponse, CorrectionResult, OrderProgress, ReceptionLine,
    ReceptionSnapshotResponse, ReceptionTotals, ResponseStatus, UpdateDeliveredResponse,
    UpdatedReception,
};

use crate::usecases::common::UseCaseMetadata;

pub struct RecordReception;

impl UseCaseMetadata for RecordReception {
    fn usecase_index() -> &'static str {
        "u508"
    }

    fn usecase_name() -> &'static str {
        "record_reception"
    }

    fn display_name() -> &'static str {
        "Reception"
    }

    fn description() -> &'static str {
        "Record delivered quantities against purchase order lines"
    }
}
