use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOptions;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::config::Config;
use crate::db::DbConn;
use crate::guards::AdminGuard;
use crate::models::{Listing, ListingStatus, User, UserResponse};
use crate::services::EmailService;
use crate::utils::{ApiError, ApiResponse};

// ==================== LISTING MODERATION ====================

#[derive(FromForm, serde::Deserialize, JsonSchema)]
pub struct ListingListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Admin - Listings")]
#[get("/admin/listings?<query..>")]
pub async fn get_all_listings(
    db: &State<DbConn>,
    _admin: AdminGuard,
    query: ListingListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let mut filter = doc! {};
    if let Some(ref status) = query.status {
        match ListingStatus::from_form(status) {
            Some(parsed) => filter.insert("status", parsed.as_form()),
            None => return Err(ApiError::bad_request("Invalid status filter")),
        };
    }

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(limit)
        .sort(doc! { "date_listed": -1 })
        .build();

    let mut cursor = db
        .collection::<Listing>("listings")
        .find(filter.clone(), find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut listings = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let listing = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        listings.push(listing);
    }

    let total = db
        .collection::<Listing>("listings")
        .count_documents(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "listings": listings,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}

#[derive(serde::Deserialize, JsonSchema)]
pub struct UpdateListingStatusDto {
    pub status: String,
    pub reason: Option<String>,
}

#[openapi(tag = "Admin - Listings")]
#[put("/admin/listings/<listing_id>/status", data = "<dto>")]
pub async fn update_listing_status(
    db: &State<DbConn>,
    _admin: AdminGuard,
    listing_id: String,
    dto: Json<UpdateListingStatusDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&listing_id)
        .map_err(|_| ApiError::bad_request("Invalid listing ID"))?;

    let status = ListingStatus::from_form(&dto.status)
        .ok_or_else(|| ApiError::bad_request("Status must be pending, approved or rejected"))?;

    let reason = dto.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    if status == ListingStatus::Rejected && reason.is_none() {
        return Err(ApiError::bad_request("A rejection reason is required"));
    }

    let mut update = doc! {
        "$set": {
            "status": status.as_form(),
            "updated_at": DateTime::now()
        }
    };
    match reason {
        Some(reason) if status == ListingStatus::Rejected => {
            update
                .get_document_mut("$set")
                .map_err(|e| ApiError::internal_error(e.to_string()))?
                .insert("rejection_reason", reason);
        }
        _ => {
            update.insert("$unset", doc! { "rejection_reason": "" });
        }
    }

    let listing = db
        .collection::<Listing>("listings")
        .find_one_and_update(doc! { "_id": object_id }, update, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;

    // Notify the owner; moderation succeeds even if the email does not.
    let owner = db
        .collection::<User>("users")
        .find_one(doc! { "_id": listing.owner_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    if let Some(email) = owner.and_then(|o| o.email) {
        match status {
            ListingStatus::Approved => {
                let listing_url =
                    format!("{}/listings/{}", Config::base_url(), object_id.to_hex());
                EmailService::send_listing_approved(&email, &listing.title, &listing_url).await;
            }
            ListingStatus::Rejected => {
                EmailService::send_listing_rejected(
                    &email,
                    &listing.title,
                    reason.unwrap_or("Not specified"),
                )
                .await;
            }
            ListingStatus::Pending => {}
        }
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Listing status updated",
        "listing_id": listing_id,
        "status": status.as_form()
    }))))
}

#[derive(serde::Deserialize, JsonSchema)]
pub struct RevisePriceDto {
    pub price: f64,
}

/// Price revision is an admin capability; owner edits never write price.
#[openapi(tag = "Admin - Listings")]
#[put("/admin/listings/<listing_id>/price", data = "<dto>")]
pub async fn revise_listing_price(
    db: &State<DbConn>,
    _admin: AdminGuard,
    listing_id: String,
    dto: Json<RevisePriceDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&listing_id)
        .map_err(|_| ApiError::bad_request("Invalid listing ID"))?;

    if !(dto.price.is_finite() && dto.price > 0.0) {
        return Err(ApiError::bad_request("Price must be a positive number"));
    }

    let result = db
        .collection::<Listing>("listings")
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": { "price": dto.price, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Listing not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Price revised",
        "listing_id": listing_id,
        "price": dto.price
    }))))
}

#[derive(serde::Deserialize, JsonSchema)]
pub struct SetFeaturedDto {
    pub is_featured: bool,
}

#[openapi(tag = "Admin - Listings")]
#[put("/admin/listings/<listing_id>/featured", data = "<dto>")]
pub async fn set_listing_featured(
    db: &State<DbConn>,
    _admin: AdminGuard,
    listing_id: String,
    dto: Json<SetFeaturedDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&listing_id)
        .map_err(|_| ApiError::bad_request("Invalid listing ID"))?;

    let result = db
        .collection::<Listing>("listings")
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": { "is_featured": dto.is_featured, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Listing not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Featured flag updated",
        "listing_id": listing_id,
        "is_featured": dto.is_featured
    }))))
}

// ==================== USER ADMINISTRATION ====================

#[derive(FromForm, serde::Deserialize, JsonSchema)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Admin - Users")]
#[get("/admin/users?<query..>")]
pub async fn get_all_users(
    db: &State<DbConn>,
    _admin: AdminGuard,
    query: UserListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(limit)
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = db
        .collection::<User>("users")
        .find(doc! {}, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut users: Vec<UserResponse> = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let user = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        users.push(UserResponse::from(user));
    }

    let total = db
        .collection::<User>("users")
        .count_documents(doc! {}, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Count error: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "users": users,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total as f64 / limit as f64).ceil() as i64,
        }
    }))))
}

#[derive(serde::Deserialize, JsonSchema)]
pub struct GrantCreditsDto {
    pub credits: i64,
}

#[openapi(tag = "Admin - Users")]
#[put("/admin/users/<user_id>/credits", data = "<dto>")]
pub async fn grant_credits(
    db: &State<DbConn>,
    _admin: AdminGuard,
    user_id: String,
    dto: Json<GrantCreditsDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    if dto.credits <= 0 {
        return Err(ApiError::bad_request("Credits must be a positive number"));
    }

    let user = db
        .collection::<User>("users")
        .find_one_and_update(
            doc! { "_id": object_id },
            doc! {
                "$inc": { "listing_credits": dto.credits },
                "$set": { "updated_at": DateTime::now() }
            },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Credits granted",
        "user_id": user_id,
        "listing_credits": user.listing_credits + dto.credits
    }))))
}
