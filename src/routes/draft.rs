use rocket::serde::json::Json;
use rocket_okapi::openapi;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::utils::{ApiError, ApiResponse};
use crate::wizard::{Advance, DraftFields, DraftSession, DraftStage};

#[derive(Debug, serde::Deserialize, JsonSchema)]
pub struct ValidateDraftDto {
    /// 1-based stage index, matching the wizard's step indicator.
    pub stage: u8,
    pub fields: DraftFields,
}

/// Server-side check of one wizard stage. The browser runs the same
/// rules for instant feedback; this endpoint is the authoritative answer
/// when the client advances.
#[openapi(tag = "Listing")]
#[post("/listings/draft/validate", data = "<dto>")]
pub async fn validate_draft_stage(
    dto: Json<ValidateDraftDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let dto = dto.into_inner();

    let stage = DraftStage::from_index(dto.stage)
        .ok_or_else(|| ApiError::bad_request("Stage must be between 1 and 6"))?;

    let mut session = DraftSession::resume(dto.fields, stage);

    match session.advance() {
        Ok(Advance::Moved(next)) => Ok(Json(ApiResponse::success(serde_json::json!({
            "valid": true,
            "stage": stage.index(),
            "next_stage": next.index(),
            "ready_to_submit": false,
        })))),
        Ok(Advance::ReadyToSubmit) => Ok(Json(ApiResponse::success(serde_json::json!({
            "valid": true,
            "stage": stage.index(),
            "next_stage": serde_json::Value::Null,
            "ready_to_submit": true,
        })))),
        Err(errors) => Ok(Json(ApiResponse::success(serde_json::json!({
            "valid": false,
            "stage": stage.index(),
            "errors": errors,
        })))),
    }
}
