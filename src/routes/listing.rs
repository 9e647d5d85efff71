use std::sync::Arc;

use log::error;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::FindOptions;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::media::{
    self, Attachment, AttachmentDto, DecodedAttachment, LocalFile, UploadBackend, UploadError,
    UploadedImage,
};
use crate::models::{
    consume_credit_query, expires_after, parse_amenities, refund_credit_update, Furnishing,
    Listing, ListingStatus, ListingTier, ListingType, PropertyType, User,
};
use crate::services::{EmailService, ImageKitService};
use crate::utils::{validate_mobile, validate_pincode, ApiError, ApiResponse};
use crate::wizard::{DraftFields, DraftSession, FieldError};

/// Where the client should navigate after a successful submission.
fn redirect_target(is_admin: bool) -> &'static str {
    if is_admin {
        "/admin/listings"
    } else {
        "/account/listings"
    }
}

fn field_errors_message(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn upload_failure(err: UploadError) -> ApiError {
    ApiError::bad_gateway(err.to_string())
}

/// Decode the attachment payload, run it through media intake, and
/// resolve everything to durable URLs. Attachment order is preserved
/// end to end.
async fn resolve_attachment_images(
    dtos: Vec<AttachmentDto>,
) -> Result<Vec<UploadedImage>, ApiError> {
    let mut decoded = Vec::with_capacity(dtos.len());
    for dto in dtos {
        decoded.push(dto.decode().map_err(ApiError::bad_request)?);
    }

    let remote_count = decoded
        .iter()
        .filter(|d| matches!(d, DecodedAttachment::Remote { .. }))
        .count();
    let locals: Vec<LocalFile> = decoded
        .iter()
        .filter_map(|d| match d {
            DecodedAttachment::Local(file) => Some(file.clone()),
            DecodedAttachment::Remote { .. } => None,
        })
        .collect();

    let (accepted, rejected) = media::add_files(locals, remote_count);
    if !rejected.is_empty() {
        let reasons = rejected
            .iter()
            .map(|r| format!("{} ({})", r.file_name, r.reason))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ApiError::bad_request(format!(
            "Attachments rejected: {}",
            reasons
        )));
    }

    let mut accepted_iter = accepted.into_iter();
    let mut ordered = Vec::with_capacity(decoded.len());
    for d in decoded {
        match d {
            DecodedAttachment::Remote { url } => ordered.push(Attachment::remote(url)),
            DecodedAttachment::Local(_) => {
                let attachment = accepted_iter
                    .next()
                    .ok_or_else(|| ApiError::internal_error("Attachment accounting mismatch"))?;
                ordered.push(attachment);
            }
        }
    }

    media::finalize_uploads(Arc::new(ImageKitService), ordered)
        .await
        .map_err(upload_failure)
}

/// Best-effort removal of files uploaded during a submission that then
/// failed to persist. Pre-existing remote URLs carry no file id and are
/// never touched.
async fn cleanup_uploaded(images: &[UploadedImage]) {
    for image in images {
        if let Some(ref file_id) = image.file_id {
            if let Err(e) = ImageKitService.delete(file_id).await {
                error!("Failed to delete orphaned upload {}: {}", file_id, e);
            }
        }
    }
}

// ============================================================================
// SUBMISSION
// ============================================================================

#[derive(Debug, serde::Deserialize, JsonSchema)]
pub struct CreateListingDto {
    #[serde(flatten)]
    pub fields: DraftFields,
    #[serde(default)]
    pub attachments: Vec<AttachmentDto>,
}

#[openapi(tag = "Listing")]
#[post("/listings", data = "<dto>")]
pub async fn create_listing(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<CreateListingDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let dto = dto.into_inner();

    // The server re-runs every stage rule; the client wizard is advisory.
    let mut session = DraftSession::new();
    session.fields = dto.fields;
    let submission = session
        .into_submission()
        .map_err(|errors| ApiError::bad_request(field_errors_message(&errors)))?;

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !user.can_create_listing() {
        return Err(ApiError::payment_required(
            "No listing credits left. Purchase a credit or plan to post a new listing.",
        ));
    }

    // Any upload failure aborts before anything is written; the draft
    // stays editable on the client.
    let images = resolve_attachment_images(dto.attachments).await?;

    let lifetime_days = user.listing_lifetime_days();
    let tier = if user.has_premium_plan() {
        ListingTier::Premium
    } else {
        ListingTier::Free
    };
    let is_featured = user.is_verified_now();
    let now = DateTime::now();

    // Conditional decrement: consumes the credit only while the balance
    // is still positive.
    let (filter, update) = consume_credit_query(auth.user_id);
    let consumed = db
        .collection::<User>("users")
        .find_one_and_update(filter, update, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    if consumed.is_none() {
        cleanup_uploaded(&images).await;
        return Err(ApiError::payment_required(
            "No listing credits left. Purchase a credit or plan to post a new listing.",
        ));
    }

    let listing = Listing {
        id: None,
        owner_id: auth.user_id,
        title: submission.title.clone(),
        description: submission.description,
        price: submission.price,
        listing_type: submission.listing_type,
        location: submission.location,
        contact_primary: submission.contact_primary,
        contact_secondary: submission.contact_secondary,
        property_type: submission.property_type,
        bedrooms: submission.bedrooms,
        bathrooms: submission.bathrooms,
        area_sqft: submission.area_sqft,
        furnishing: submission.furnishing,
        overlooking: submission.overlooking,
        age_of_construction: submission.age_of_construction,
        amenities: submission.amenities,
        images: images.iter().map(|i| i.url.clone()).collect(),
        tier,
        is_featured,
        status: ListingStatus::Pending,
        rejection_reason: None,
        date_listed: now,
        expires_at: expires_after(now, lifetime_days),
        updated_at: now,
    };

    let inserted = db
        .collection::<Listing>("listings")
        .insert_one(&listing, None)
        .await;

    let result = match inserted {
        Ok(res) => res,
        Err(e) => {
            // The credit is already gone; put it back and drop what we
            // uploaded. If even the refund fails, the ledger and the
            // listings collection have diverged — say so loudly.
            if let Err(refund_err) = db
                .collection::<User>("users")
                .update_one(doc! { "_id": auth.user_id }, refund_credit_update(), None)
                .await
            {
                error!(
                    "Credit ledger divergence for user {}: listing insert failed ({}) and refund failed ({})",
                    auth.user_id.to_hex(),
                    e,
                    refund_err
                );
            }
            cleanup_uploaded(&images).await;
            return Err(ApiError::internal_error("Failed to save listing"));
        }
    };

    let listing_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal_error("Invalid listing ID"))?;

    if let Some(ref email) = user.email {
        EmailService::send_listing_submitted(email, &submission.title).await;
    }

    Ok(Json(ApiResponse::success_with_message(
        "Listing submitted for review".to_string(),
        serde_json::json!({
            "listing_id": listing_id.to_hex(),
            "status": "pending",
            "tier": tier,
            "is_featured": is_featured,
            "expires_at": listing.expires_at,
            "redirect": redirect_target(auth.is_admin())
        }),
    )))
}

// ============================================================================
// EDIT / DELETE
// ============================================================================

#[derive(Debug, serde::Deserialize, JsonSchema)]
pub struct UpdateListingDto {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Revisable only by an administrator identity; silently ignored for
    /// the owner.
    pub price: Option<f64>,
    pub listing_type: Option<ListingType>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub state: Option<String>,
    pub contact_primary: Option<String>,
    pub contact_secondary: Option<String>,
    pub property_type: Option<PropertyType>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub area_sqft: Option<f64>,
    pub furnishing: Option<Furnishing>,
    /// An empty string clears the stored value.
    pub overlooking: Option<String>,
    pub age_of_construction: Option<String>,
    /// Comma-separated, same as the wizard field.
    pub amenities: Option<String>,
    pub attachments: Option<Vec<AttachmentDto>>,
}

fn validate_update(dto: &UpdateListingDto) -> Result<(), ApiError> {
    if let Some(ref title) = dto.title {
        if title.trim().chars().count() < 5 {
            return Err(ApiError::bad_request("Title must be at least 5 characters"));
        }
    }
    if let Some(ref description) = dto.description {
        if description.trim().chars().count() < 10 {
            return Err(ApiError::bad_request(
                "Description must be at least 10 characters",
            ));
        }
    }
    if let Some(price) = dto.price {
        if !(price.is_finite() && price > 0.0) {
            return Err(ApiError::bad_request("Price must be a positive number"));
        }
    }
    if let Some(area) = dto.area_sqft {
        if !(area.is_finite() && area > 0.0) {
            return Err(ApiError::bad_request(
                "Built-up area must be a positive number",
            ));
        }
    }
    if let Some(ref pincode) = dto.pincode {
        if !validate_pincode(pincode.trim()) {
            return Err(ApiError::bad_request("Pincode must be 6 digits"));
        }
    }
    for contact in [&dto.contact_primary, &dto.contact_secondary].into_iter().flatten() {
        if !validate_mobile(contact.trim()) {
            return Err(ApiError::bad_request("Enter a valid 10-digit mobile number"));
        }
    }
    Ok(())
}

/// Shallow merge of the provided fields onto the stored record. Price is
/// written only for an administrator; optional fields cleared by the user
/// are unset rather than stored empty. Credits, `date_listed`, tier and
/// moderation status are never part of an edit.
fn build_update_document(dto: &UpdateListingDto, is_admin: bool) -> (Document, Document) {
    let mut set = Document::new();
    let mut unset = Document::new();

    if let Some(ref title) = dto.title {
        set.insert("title", title.trim());
    }
    if let Some(ref description) = dto.description {
        set.insert("description", description.trim());
    }
    if is_admin {
        if let Some(price) = dto.price {
            set.insert("price", price);
        }
    }
    if let Some(listing_type) = dto.listing_type {
        set.insert("listing_type", listing_type.as_form());
    }
    if let Some(ref address) = dto.address {
        set.insert("location.address", address.trim());
    }
    if let Some(ref pincode) = dto.pincode {
        set.insert("location.pincode", pincode.trim());
    }
    if let Some(ref state) = dto.state {
        set.insert("location.state", state.trim());
    }
    if let Some(ref contact) = dto.contact_primary {
        set.insert("contact_primary", contact.trim());
    }
    if let Some(ref contact) = dto.contact_secondary {
        set.insert("contact_secondary", contact.trim());
    }
    if let Some(property_type) = dto.property_type {
        set.insert("property_type", property_type.as_form());
    }
    if let Some(bedrooms) = dto.bedrooms {
        set.insert("bedrooms", bedrooms as i64);
    }
    if let Some(bathrooms) = dto.bathrooms {
        set.insert("bathrooms", bathrooms as i64);
    }
    if let Some(area) = dto.area_sqft {
        set.insert("area_sqft", area);
    }
    if let Some(furnishing) = dto.furnishing {
        set.insert("furnishing", furnishing.as_form());
    }
    if let Some(ref overlooking) = dto.overlooking {
        if overlooking.trim().is_empty() {
            unset.insert("overlooking", "");
        } else {
            set.insert("overlooking", overlooking.trim());
        }
    }
    if let Some(ref age) = dto.age_of_construction {
        if age.trim().is_empty() {
            unset.insert("age_of_construction", "");
        } else {
            set.insert("age_of_construction", age.trim());
        }
    }
    if let Some(ref amenities) = dto.amenities {
        set.insert("amenities", parse_amenities(amenities));
    }

    (set, unset)
}

#[openapi(tag = "Listing")]
#[put("/listings/<listing_id>", data = "<dto>")]
pub async fn update_listing(
    db: &State<DbConn>,
    auth: AuthGuard,
    listing_id: String,
    dto: Json<UpdateListingDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&listing_id)
        .map_err(|_| ApiError::bad_request("Invalid listing ID"))?;

    let listing = db
        .collection::<Listing>("listings")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;

    if listing.owner_id != auth.user_id && !auth.is_admin() {
        return Err(ApiError::forbidden("You can only edit your own listings"));
    }

    let dto = dto.into_inner();
    validate_update(&dto)?;

    // Untouched remote URLs pass through unchanged; only new local files
    // are uploaded.
    let new_images = match dto.attachments.clone() {
        Some(attachments) => Some(resolve_attachment_images(attachments).await?),
        None => None,
    };

    let (mut set, unset) = build_update_document(&dto, auth.is_admin());
    if let Some(ref images) = new_images {
        set.insert(
            "images",
            images.iter().map(|i| i.url.clone()).collect::<Vec<_>>(),
        );
    }
    set.insert("updated_at", DateTime::now());

    let mut update = doc! { "$set": set };
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }

    let result = db
        .collection::<Listing>("listings")
        .update_one(doc! { "_id": object_id }, update, None)
        .await;

    match result {
        Ok(res) if res.matched_count > 0 => Ok(Json(ApiResponse::success_with_message(
            "Listing updated successfully".to_string(),
            serde_json::json!({
                "listing_id": listing_id,
                "redirect": redirect_target(auth.is_admin())
            }),
        ))),
        Ok(_) => {
            if let Some(ref images) = new_images {
                cleanup_uploaded(images).await;
            }
            Err(ApiError::not_found("Listing not found"))
        }
        Err(e) => {
            if let Some(ref images) = new_images {
                cleanup_uploaded(images).await;
            }
            Err(ApiError::internal_error(format!("Failed to update listing: {}", e)))
        }
    }
}

#[openapi(tag = "Listing")]
#[delete("/listings/<listing_id>")]
pub async fn delete_listing(
    db: &State<DbConn>,
    auth: AuthGuard,
    listing_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&listing_id)
        .map_err(|_| ApiError::bad_request("Invalid listing ID"))?;

    let listing = db
        .collection::<Listing>("listings")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;

    if listing.owner_id != auth.user_id && !auth.is_admin() {
        return Err(ApiError::forbidden("You can only delete your own listings"));
    }

    db.collection::<Listing>("listings")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Listing deleted successfully"
    }))))
}

// ============================================================================
// READS
// ============================================================================

#[get("/listings/<listing_id>")]
pub async fn get_listing(
    db: &State<DbConn>,
    auth: Option<AuthGuard>,
    listing_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&listing_id)
        .map_err(|_| ApiError::bad_request("Invalid listing ID"))?;

    let listing = db
        .collection::<Listing>("listings")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;

    // Unapproved listings are visible only to their owner and to admins.
    if listing.status != ListingStatus::Approved {
        let allowed = auth
            .as_ref()
            .map(|a| a.user_id == listing.owner_id || a.is_admin())
            .unwrap_or(false);
        if !allowed {
            return Err(ApiError::not_found("Listing not found"));
        }
    }

    Ok(Json(ApiResponse::success(serde_json::json!(listing))))
}

#[openapi(tag = "Listing")]
#[get("/listings/mine")]
pub async fn get_my_listings(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let find_options = FindOptions::builder()
        .sort(doc! { "date_listed": -1 })
        .build();

    let mut cursor = db
        .collection::<Listing>("listings")
        .find(doc! { "owner_id": auth.user_id }, find_options)
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

    Ok(Json(ApiResponse::success(serde_json::json!({
        "listings": listings
    }))))
}

#[derive(FromForm, serde::Deserialize, JsonSchema)]
pub struct SearchListingsQuery {
    pub listing_type: Option<String>,
    pub property_type: Option<String>,
    pub pincode: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Listing")]
#[get("/listings/search?<query..>")]
pub async fn search_listings(
    db: &State<DbConn>,
    query: SearchListingsQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let skip = (page - 1) * limit;

    let mut filter = doc! {
        "status": "approved",
        "expires_at": { "$gt": DateTime::now() },
    };

    if let Some(ref listing_type) = query.listing_type {
        match ListingType::from_form(listing_type) {
            Some(t) => filter.insert("listing_type", t.as_form()),
            None => return Err(ApiError::bad_request("Invalid listing type")),
        };
    }

    if let Some(ref property_type) = query.property_type {
        match PropertyType::from_form(property_type) {
            Some(t) => filter.insert("property_type", t.as_form()),
            None => return Err(ApiError::bad_request("Invalid property type")),
        };
    }

    if let Some(ref pincode) = query.pincode {
        filter.insert("location.pincode", pincode);
    }

    if query.min_price.is_some() || query.max_price.is_some() {
        let mut range = Document::new();
        if let Some(min) = query.min_price {
            range.insert("$gte", min);
        }
        if let Some(max) = query.max_price {
            range.insert("$lte", max);
        }
        filter.insert("price", range);
    }

    if let Some(bedrooms) = query.bedrooms {
        filter.insert("bedrooms", bedrooms as i64);
    }

    let find_options = FindOptions::builder()
        .skip(skip as u64)
        .limit(limit)
        .sort(doc! {
            "is_featured": -1,
            "date_listed": -1
        })
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

#[openapi(tag = "Listing")]
#[get("/listings/<listing_id>/similar")]
pub async fn similar_listings(
    db: &State<DbConn>,
    listing_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&listing_id)
        .map_err(|_| ApiError::bad_request("Invalid listing ID"))?;

    let listing = db
        .collection::<Listing>("listings")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;

    let filter = doc! {
        "_id": { "$ne": object_id },
        "status": "approved",
        "expires_at": { "$gt": DateTime::now() },
        "$or": [
            { "location.pincode": &listing.location.pincode },
            { "property_type": listing.property_type.as_form() },
        ]
    };

    let find_options = FindOptions::builder()
        .limit(6)
        .sort(doc! { "is_featured": -1, "date_listed": -1 })
        .build();

    let mut cursor = db
        .collection::<Listing>("listings")
        .find(filter, find_options)
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

    Ok(Json(ApiResponse::success(serde_json::json!({
        "listings": listings
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_update() -> UpdateListingDto {
        UpdateListingDto {
            title: None,
            description: None,
            price: None,
            listing_type: None,
            address: None,
            pincode: None,
            state: None,
            contact_primary: None,
            contact_secondary: None,
            property_type: None,
            bedrooms: None,
            bathrooms: None,
            area_sqft: None,
            furnishing: None,
            overlooking: None,
            age_of_construction: None,
            amenities: None,
            attachments: None,
        }
    }

    #[test]
    fn owner_edits_never_write_the_price() {
        let dto = UpdateListingDto {
            price: Some(1.0),
            title: Some("Sea-facing 3BHK".to_string()),
            ..empty_update()
        };

        let (set, unset) = build_update_document(&dto, false);
        assert!(!set.contains_key("price"));
        assert_eq!(set.get_str("title").unwrap(), "Sea-facing 3BHK");
        assert!(unset.is_empty());
    }

    #[test]
    fn admin_edits_may_revise_the_price() {
        let dto = UpdateListingDto {
            price: Some(7_200_000.0),
            ..empty_update()
        };

        let (set, _) = build_update_document(&dto, true);
        assert_eq!(set.get_f64("price").unwrap(), 7_200_000.0);
    }

    #[test]
    fn cleared_optionals_are_unset_not_emptied() {
        let dto = UpdateListingDto {
            overlooking: Some("  ".to_string()),
            age_of_construction: Some("10+ years".to_string()),
            ..empty_update()
        };

        let (set, unset) = build_update_document(&dto, false);
        assert!(unset.contains_key("overlooking"));
        assert!(!set.contains_key("overlooking"));
        assert_eq!(set.get_str("age_of_construction").unwrap(), "10+ years");
    }

    #[test]
    fn edits_never_touch_credits_listing_date_or_moderation() {
        let dto = UpdateListingDto {
            title: Some("Updated title".to_string()),
            description: Some("Updated longer description".to_string()),
            price: Some(100.0),
            amenities: Some("Lift, Gym".to_string()),
            overlooking: Some(String::new()),
            ..empty_update()
        };

        for is_admin in [false, true] {
            let (set, unset) = build_update_document(&dto, is_admin);
            for key in ["date_listed", "listing_credits", "status", "tier", "owner_id"] {
                assert!(!set.contains_key(key), "set leaked {}", key);
                assert!(!unset.contains_key(key), "unset leaked {}", key);
            }
        }
    }

    #[test]
    fn location_fields_merge_shallowly_by_dotted_path() {
        let dto = UpdateListingDto {
            pincode: Some("400053".to_string()),
            ..empty_update()
        };

        let (set, _) = build_update_document(&dto, false);
        assert_eq!(set.get_str("location.pincode").unwrap(), "400053");
        assert!(!set.contains_key("location"));
    }

    #[test]
    fn amenity_edits_are_parsed_like_the_wizard_field() {
        let dto = UpdateListingDto {
            amenities: Some(" Lift ,, Gym ".to_string()),
            ..empty_update()
        };

        let (set, _) = build_update_document(&dto, false);
        let amenities = set.get_array("amenities").unwrap();
        assert_eq!(amenities.len(), 2);
    }

    #[test]
    fn update_validation_applies_the_stage_rules_to_changed_fields() {
        let bad_title = UpdateListingDto {
            title: Some("2BHK".to_string()),
            ..empty_update()
        };
        assert!(validate_update(&bad_title).is_err());

        let bad_contact = UpdateListingDto {
            contact_secondary: Some("1234567890".to_string()),
            ..empty_update()
        };
        assert!(validate_update(&bad_contact).is_err());

        let ok = UpdateListingDto {
            title: Some("Sea-facing 3BHK".to_string()),
            pincode: Some("400053".to_string()),
            ..empty_update()
        };
        assert!(validate_update(&ok).is_ok());
    }
}
