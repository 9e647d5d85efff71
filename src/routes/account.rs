use mongodb::bson::{doc, DateTime};
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use validator::Validate;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{UpdateProfileDto, User, UserResponse};
use crate::utils::{validate_pincode, ApiError, ApiResponse};

#[openapi(tag = "Account")]
#[get("/account/profile")]
pub async fn get_profile(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let has_premium_plan = user.has_premium_plan();
    let is_verified = user.is_verified_now();
    let user_response: UserResponse = user.into();

    let mut response_data = serde_json::to_value(&user_response)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
    response_data["has_premium_plan"] = serde_json::json!(has_premium_plan);
    response_data["is_verified"] = serde_json::json!(is_verified);

    Ok(Json(ApiResponse::success(response_data)))
}

#[openapi(tag = "Account")]
#[put("/account/profile", data = "<dto>")]
pub async fn update_profile(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<UpdateProfileDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    dto.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if let Some(ref pincode) = dto.pincode {
        if !validate_pincode(pincode) {
            return Err(ApiError::bad_request("Invalid pincode"));
        }
    }

    let mut update_doc = doc! {
        "updated_at": DateTime::now()
    };

    if let Some(ref name) = dto.name {
        update_doc.insert("name", name);
    }
    if let Some(ref email) = dto.email {
        update_doc.insert("email", email);
    }
    if let Some(ref city) = dto.city {
        update_doc.insert("city", city);
    }
    if let Some(ref pincode) = dto.pincode {
        update_doc.insert("pincode", pincode);
    }
    if let Some(ref profile_photo) = dto.profile_photo {
        update_doc.insert("profile_photo", profile_photo);
    }

    db.collection::<User>("users")
        .update_one(
            doc! { "_id": auth.user_id },
            doc! { "$set": update_doc },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update profile: {}", e)))?;

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Profile updated successfully".to_string(),
        serde_json::json!(UserResponse::from(user)),
    )))
}

/// Credit balance, verification window and purchase history in one
/// payload. The client decides from this whether the submission wizard
/// is reachable at all.
#[openapi(tag = "Account")]
#[get("/account/credits")]
pub async fn get_credits(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "listing_credits": user.listing_credits,
        "can_create_listing": user.can_create_listing(),
        "has_premium_plan": user.has_premium_plan(),
        "is_verified": user.is_verified_now(),
        "verified_until": user.verified_until,
        "transactions": user.transactions,
    }))))
}

/// Accounts are never hard-deleted; contact data is cleared and the
/// mobile number is released for re-registration.
#[openapi(tag = "Account")]
#[delete("/account")]
pub async fn delete_account(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    db.collection::<User>("users")
        .update_one(
            doc! { "_id": auth.user_id },
            doc! {
                "$set": {
                    "mobile": format!("deleted-{}", auth.user_id.to_hex()),
                    "is_active": false,
                    "updated_at": DateTime::now()
                },
                "$unset": {
                    "email": "",
                    "name": "",
                    "profile_photo": "",
                    "city": "",
                    "pincode": ""
                }
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete account: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Account deleted"
    }))))
}
