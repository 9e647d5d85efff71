use mongodb::bson::{doc, DateTime};
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::{PlanTier, Transaction, User};
use crate::services::{EmailService, RazorpayService};
use crate::utils::{ApiError, ApiResponse};

/// Credit top-up packs: (price in rupees, credits granted, description).
fn credit_pack(pack: &str) -> Option<(i64, i64, &'static str)> {
    match pack {
        "single" => Some((99, 1, "Single listing credit")),
        "bundle" => Some((399, 5, "Listing credit bundle (5)")),
        _ => None,
    }
}

/// Verification plans: (price, verified days, bundled credits, tier,
/// description). The description keywords stay stable because legacy
/// tier inference matches on them.
fn verification_plan(plan: &str) -> Option<(i64, i64, i64, PlanTier, &'static str)> {
    match plan {
        "basic" => Some((499, 30, 2, PlanTier::Basic, "Basic Plan")),
        "pro" => Some((999, 90, 5, PlanTier::Pro, "Pro Plan")),
        "business" => Some((2499, 365, 12, PlanTier::Business, "Business Plan")),
        _ => None,
    }
}

#[openapi(tag = "Payment")]
#[post("/payments/credits/<pack_name>")]
pub async fn create_credit_order(
    _auth: AuthGuard,
    pack_name: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (price, credits, description) = credit_pack(&pack_name.to_lowercase())
        .ok_or_else(|| ApiError::bad_request("Invalid pack. Choose 'single' or 'bundle'"))?;

    let order = RazorpayService::create_order(price)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create payment order: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "order": order,
        "pack": pack_name,
        "price": price,
        "credits": credits,
        "description": description
    }))))
}

#[openapi(tag = "Payment")]
#[post("/payments/verification/<plan_name>")]
pub async fn create_verification_order(
    _auth: AuthGuard,
    plan_name: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (price, days, credits, _tier, description) = verification_plan(&plan_name.to_lowercase())
        .ok_or_else(|| ApiError::bad_request("Invalid plan. Choose 'basic', 'pro' or 'business'"))?;

    let order = RazorpayService::create_order(price)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create payment order: {}", e)))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "order": order,
        "plan": plan_name,
        "price": price,
        "verified_days": days,
        "credits": credits,
        "description": description
    }))))
}

#[derive(serde::Deserialize, JsonSchema)]
pub struct VerifyPaymentDto {
    /// Pack or plan key the order was created for.
    pub purchase: String,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Confirm a checkout callback. On a valid signature the purchase is
/// applied and recorded as an append-only transaction carrying the
/// explicit plan tier (None for plain credit packs).
#[openapi(tag = "Payment")]
#[post("/payments/verify", data = "<dto>")]
pub async fn verify_payment(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<VerifyPaymentDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let valid = RazorpayService::verify_signature(
        &dto.razorpay_order_id,
        &dto.razorpay_payment_id,
        &dto.razorpay_signature,
    )
    .map_err(ApiError::internal_error)?;

    if !valid {
        return Err(ApiError::bad_request("Invalid payment signature"));
    }

    let purchase = dto.purchase.to_lowercase();
    let (amount, credits, verified_days, plan_tier, description) =
        if let Some((price, credits, description)) = credit_pack(&purchase) {
            (price, credits, None, None, description)
        } else if let Some((price, days, credits, tier, description)) =
            verification_plan(&purchase)
        {
            (price, credits, Some(days), Some(tier), description)
        } else {
            return Err(ApiError::bad_request("Unknown purchase"));
        };

    let now = DateTime::now();
    let transaction = Transaction {
        payment_id: dto.razorpay_payment_id.clone(),
        amount: amount as f64,
        date: now,
        description: format!("{} Purchase", description),
        plan_tier,
    };
    let transaction_bson = mongodb::bson::to_bson(&transaction)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let mut update = doc! {
        "$inc": { "listing_credits": credits },
        "$push": { "transactions": transaction_bson },
        "$set": { "updated_at": now },
    };

    if let Some(days) = verified_days {
        let verified_until = DateTime::from_millis(
            chrono::Utc::now().timestamp_millis() + days * 24 * 60 * 60 * 1000,
        );
        update
            .get_document_mut("$set")
            .map_err(|e| ApiError::internal_error(e.to_string()))?
            .insert("verified_until", verified_until);
    }

    let result = db
        .collection::<User>("users")
        .update_one(doc! { "_id": auth.user_id }, update, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(ref email) = user.email {
        EmailService::send_payment_receipt(email, &transaction.description, transaction.amount)
            .await;
    }

    Ok(Json(ApiResponse::success_with_message(
        "Payment verified successfully".to_string(),
        serde_json::json!({
            "listing_credits": user.listing_credits,
            "verified_until": user.verified_until,
            "has_premium_plan": user.has_premium_plan(),
        }),
    )))
}
