use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::media::UploadAuth;
use crate::services::ImageKitService;
use crate::utils::ApiError;

/// Short-lived upload credential for browser-direct uploads. Returned
/// bare (not wrapped) so upload clients can consume it as-is; the
/// submission workflow's own batch authorization hits this same shape.
#[openapi(tag = "Media")]
#[get("/media/auth")]
pub async fn upload_auth() -> Result<Json<UploadAuth>, ApiError> {
    ImageKitService::mint_auth_params()
        .map(Json)
        .map_err(|e| ApiError::internal_error(e.to_string()))
}
