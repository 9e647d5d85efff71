use rocket::serde::json::Json;
use rocket::State;
use mongodb::bson::{doc, DateTime, oid::ObjectId};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::config::Config;
use crate::db::DbConn;
use crate::models::{Role, User, UserResponse};
use crate::services::{EmailService, JwtService, msg91::Msg91Service};
use crate::utils::{validate_email, validate_mobile, ApiError, ApiResponse};

const OTP_WINDOW_MS: i64 = 10 * 60 * 1000;
const OTP_LIMIT: i32 = 3;
const REFRESH_LIMIT: i32 = 10;
const REFRESH_WINDOW_MS: i64 = 60 * 1000;

/// Every fresh account starts with one free listing credit.
const SIGNUP_FREE_CREDITS: i64 = 1;

#[derive(serde::Deserialize, JsonSchema)]
pub struct SendOtpDto {
    pub mobile: String,
}

#[derive(serde::Deserialize, JsonSchema)]
pub struct VerifyOtpDto {
    pub mobile: String,
    pub otp: String,
    pub email: Option<String>,
}

#[derive(serde::Deserialize, JsonSchema)]
pub struct RefreshTokenDto {
    pub refresh_token: String,
}

/// --------------------
/// Rate limiter helper
/// --------------------
async fn rate_limit(
    db: &DbConn,
    key: &str,
    limit: i32,
    window_ms: i64,
) -> Result<(), ApiError> {
    let collection = db.collection::<mongodb::bson::Document>("rate_limits");

    let now = DateTime::now();
    let window_expires = DateTime::from_millis(now.timestamp_millis() + window_ms);

    // Drop a lapsed window so the upsert below starts a fresh one.
    collection
        .delete_one(doc! { "key": key, "expires_at": { "$lt": now } }, None)
        .await
        .map_err(|_| ApiError::internal_error("Rate limiter reset failed"))?;

    let options = mongodb::options::FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(mongodb::options::ReturnDocument::After)
        .build();

    let entry = collection
        .find_one_and_update(
            doc! { "key": key },
            doc! {
                "$inc": { "count": 1 },
                "$setOnInsert": { "expires_at": window_expires }
            },
            options,
        )
        .await
        .map_err(|_| ApiError::internal_error("Rate limiter update failed"))?;

    let count = entry.and_then(|d| d.get_i32("count").ok()).unwrap_or(1);
    if count > limit {
        return Err(ApiError::too_many_requests(
            "Too many requests. Please try later.",
        ));
    }

    Ok(())
}

/// Admin capability is resolved once here, from the configured address,
/// and minted into the token claims. Route handlers only ever look at the
/// claim.
fn resolve_role(email: Option<&str>) -> Role {
    match (email, Config::admin_email()) {
        (Some(email), Some(admin)) if email.eq_ignore_ascii_case(&admin) => Role::Admin,
        _ => Role::User,
    }
}

/// --------------------
/// Send OTP
/// --------------------
#[post("/auth/send-otp", data = "<dto>")]
pub async fn send_otp(
    db: &State<DbConn>,
    dto: Json<SendOtpDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_mobile(&dto.mobile) {
        return Err(ApiError::bad_request("Invalid mobile number"));
    }

    rate_limit(
        db,
        &format!("send_otp:{}", dto.mobile),
        OTP_LIMIT,
        OTP_WINDOW_MS,
    ).await?;

    Msg91Service::send_login_otp(&dto.mobile)
        .await
        .map_err(|_| ApiError::internal_error("Failed to send OTP"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "OTP sent successfully"
    }))))
}

/// --------------------
/// Resend OTP
/// --------------------
#[post("/auth/resend-otp", data = "<dto>")]
pub async fn resend_otp(
    db: &State<DbConn>,
    dto: Json<SendOtpDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !validate_mobile(&dto.mobile) {
        return Err(ApiError::bad_request("Invalid mobile number"));
    }

    rate_limit(
        db,
        &format!("resend_otp:{}", dto.mobile),
        OTP_LIMIT,
        OTP_WINDOW_MS,
    ).await?;

    Msg91Service::send_login_otp(&dto.mobile)
        .await
        .map_err(|_| ApiError::internal_error("Failed to resend OTP"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "OTP resent successfully"
    }))))
}

/// --------------------
/// Verify OTP + Login
/// --------------------
#[post("/auth/verify-otp", data = "<dto>")]
pub async fn verify_otp(
    db: &State<DbConn>,
    dto: Json<VerifyOtpDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if let Some(ref email) = dto.email {
        if !validate_email(email) {
            return Err(ApiError::bad_request("Invalid email"));
        }
    }

    Msg91Service::verify_login_otp(&dto.mobile, &dto.otp)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid OTP"))?;

    let existing = db
        .collection::<User>("users")
        .find_one(doc! { "mobile": &dto.mobile }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let (user, is_new_user) = match existing {
        Some(mut u) => {
            let role = resolve_role(u.email.as_deref());
            let mut update = doc! { "last_login_at": DateTime::now() };
            if role != u.role {
                update.insert("role", role.as_str());
            }
            db.collection::<User>("users")
                .update_one(
                    doc! { "_id": u.id },
                    doc! { "$set": update },
                    None,
                ).await.ok();
            u.role = role;
            u.last_login_at = DateTime::now();
            (u, false)
        }
        None => {
            let role = resolve_role(dto.email.as_deref());
            let user = User {
                id: None,
                mobile: dto.mobile.clone(),
                email: dto.email.clone(),
                name: None,
                profile_photo: None,
                city: None,
                pincode: None,
                role,
                listing_credits: SIGNUP_FREE_CREDITS,
                verified_until: None,
                transactions: Vec::new(),
                is_active: true,
                last_login_at: DateTime::now(),
                created_at: DateTime::now(),
                updated_at: DateTime::now(),
            };

            let res = db.collection::<User>("users")
                .insert_one(&user, None)
                .await
                .map_err(|e| ApiError::internal_error(e.to_string()))?;

            let mut u = user;
            u.id = res.inserted_id.as_object_id();

            if let Some(ref email) = u.email {
                EmailService::send_welcome_email(email, "").await;
            }

            (u, true)
        }
    };

    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User has no id"))?;

    let access_token = JwtService::generate_access_token(&user_id, &user.mobile, user.role)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let refresh_token = JwtService::generate_refresh_token(&user_id, &user.mobile, user.role)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": if is_new_user { "Registration successful" } else { "Login successful" },
        "isNewUser": is_new_user,
        "user": UserResponse::from(user),
        "accessToken": access_token,
        "refreshToken": refresh_token
    }))))
}

/// --------------------
/// Silent Refresh Token
/// --------------------
#[post("/auth/refresh", data = "<dto>")]
pub async fn refresh_token(
    db: &State<DbConn>,
    dto: Json<RefreshTokenDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    rate_limit(
        db,
        "refresh_token",
        REFRESH_LIMIT,
        REFRESH_WINDOW_MS,
    ).await?;

    let claims = JwtService::verify_token(&dto.refresh_token, true)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid user id in token"))?;

    let access = JwtService::generate_access_token(&user_id, &claims.mobile, claims.role)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "accessToken": access
    }))))
}
