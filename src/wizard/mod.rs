//! Staged listing draft: an explicit state machine over the six form
//! stages. Advancing past a stage requires every rule bound to that
//! stage's fields to pass; retreating is unconditional. The machine knows
//! nothing about HTTP or rendering, so it is exercised directly by tests
//! and by the draft-validation endpoint.

use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::models::{Furnishing, Listing, ListingType, Location, PropertyType, Role};
use crate::models::parse_amenities;
use crate::utils::{parse_count, parse_positive_number, validate_mobile, validate_pincode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DraftStage {
    Basics,
    Details,
    Location,
    Features,
    Photos,
    Preview,
}

impl DraftStage {
    pub fn index(&self) -> u8 {
        match self {
            DraftStage::Basics => 1,
            DraftStage::Details => 2,
            DraftStage::Location => 3,
            DraftStage::Features => 4,
            DraftStage::Photos => 5,
            DraftStage::Preview => 6,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(DraftStage::Basics),
            2 => Some(DraftStage::Details),
            3 => Some(DraftStage::Location),
            4 => Some(DraftStage::Features),
            5 => Some(DraftStage::Photos),
            6 => Some(DraftStage::Preview),
            _ => None,
        }
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(&self) -> Option<Self> {
        match self.index() {
            i if i > 1 => Self::from_index(i - 1),
            _ => None,
        }
    }

    pub fn all() -> [DraftStage; 6] {
        [
            DraftStage::Basics,
            DraftStage::Details,
            DraftStage::Location,
            DraftStage::Features,
            DraftStage::Photos,
            DraftStage::Preview,
        ]
    }
}

/// Raw form values, exactly as entered. Parsing into typed values happens
/// only when the draft is converted into a submission.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DraftFields {
    pub title: String,
    pub description: String,
    pub price: String,
    pub listing_type: String,
    pub property_type: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub area_sqft: String,
    pub furnishing: String,
    pub address: String,
    pub pincode: String,
    pub state: String,
    pub contact_primary: String,
    pub contact_secondary: String,
    pub amenities: String,
    pub overlooking: String,
    pub age_of_construction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

pub fn validate_stage(stage: DraftStage, fields: &DraftFields) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match stage {
        DraftStage::Basics => {
            if fields.title.trim().chars().count() < 5 {
                errors.push(FieldError::new("title", "Title must be at least 5 characters"));
            }
            if fields.description.trim().chars().count() < 10 {
                errors.push(FieldError::new(
                    "description",
                    "Description must be at least 10 characters",
                ));
            }
            if parse_positive_number(&fields.price).is_none() {
                errors.push(FieldError::new("price", "Price must be a positive number"));
            }
            if ListingType::from_form(&fields.listing_type).is_none() {
                errors.push(FieldError::new("listing_type", "Select sale or rent"));
            }
        }
        DraftStage::Details => {
            if PropertyType::from_form(&fields.property_type).is_none() {
                errors.push(FieldError::new("property_type", "Select a property type"));
            }
            if parse_count(&fields.bedrooms).is_none() {
                errors.push(FieldError::new("bedrooms", "Bedrooms must be a whole number"));
            }
            if parse_count(&fields.bathrooms).is_none() {
                errors.push(FieldError::new(
                    "bathrooms",
                    "Bathrooms must be a whole number",
                ));
            }
            if parse_positive_number(&fields.area_sqft).is_none() {
                errors.push(FieldError::new(
                    "area_sqft",
                    "Built-up area must be a positive number",
                ));
            }
            if Furnishing::from_form(&fields.furnishing).is_none() {
                errors.push(FieldError::new("furnishing", "Select a furnishing state"));
            }
        }
        DraftStage::Location => {
            if fields.address.trim().is_empty() {
                errors.push(FieldError::new("address", "Address is required"));
            }
            if !validate_pincode(fields.pincode.trim()) {
                errors.push(FieldError::new("pincode", "Pincode must be 6 digits"));
            }
            if fields.state.trim().is_empty() {
                errors.push(FieldError::new("state", "State is required"));
            }
            if !validate_mobile(fields.contact_primary.trim()) {
                errors.push(FieldError::new(
                    "contact_primary",
                    "Enter a valid 10-digit mobile number",
                ));
            }
            if !validate_mobile(fields.contact_secondary.trim()) {
                errors.push(FieldError::new(
                    "contact_secondary",
                    "Enter a valid 10-digit mobile number",
                ));
            }
        }
        // Amenities, overlooking and construction age are free-form and
        // optional. Attachment limits are enforced by media intake when
        // files are added, not by the form.
        DraftStage::Features | DraftStage::Photos | DraftStage::Preview => {}
    }

    errors
}

/// Fully validated, typed submission handed to persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingSubmission {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub listing_type: ListingType,
    pub location: Location,
    pub contact_primary: String,
    pub contact_secondary: String,
    pub property_type: PropertyType,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area_sqft: f64,
    pub furnishing: Furnishing,
    pub overlooking: Option<String>,
    pub age_of_construction: Option<String>,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(DraftStage),
    ReadyToSubmit,
}

/// One editing session over a draft. Owns the current stage and, in edit
/// mode, pins the price for non-admin identities.
#[derive(Debug, Clone)]
pub struct DraftSession {
    pub fields: DraftFields,
    stage: DraftStage,
    locked_price: Option<String>,
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl DraftSession {
    pub fn new() -> Self {
        DraftSession {
            fields: DraftFields::default(),
            stage: DraftStage::Basics,
            locked_price: None,
        }
    }

    /// Rehydrate a client-held draft at its reported stage, for
    /// server-side validation of a single advance.
    pub fn resume(fields: DraftFields, stage: DraftStage) -> Self {
        DraftSession {
            fields,
            stage,
            locked_price: None,
        }
    }

    /// Edit mode: every stage pre-populated from the stored record. Price
    /// stays editable only for an administrator identity.
    pub fn edit(listing: &Listing, acting_role: Role) -> Self {
        let price = format_number(listing.price);
        let fields = DraftFields {
            title: listing.title.clone(),
            description: listing.description.clone(),
            price: price.clone(),
            listing_type: listing.listing_type.as_form().to_string(),
            property_type: listing.property_type.as_form().to_string(),
            bedrooms: listing.bedrooms.to_string(),
            bathrooms: listing.bathrooms.to_string(),
            area_sqft: format_number(listing.area_sqft),
            furnishing: listing.furnishing.as_form().to_string(),
            address: listing.location.address.clone(),
            pincode: listing.location.pincode.clone(),
            state: listing.location.state.clone(),
            contact_primary: listing.contact_primary.clone(),
            contact_secondary: listing.contact_secondary.clone(),
            amenities: listing.amenities.join(", "),
            overlooking: listing.overlooking.clone().unwrap_or_default(),
            age_of_construction: listing.age_of_construction.clone().unwrap_or_default(),
        };

        DraftSession {
            fields,
            stage: DraftStage::Basics,
            locked_price: match acting_role {
                Role::Admin => None,
                Role::User => Some(price),
            },
        }
    }

    pub fn stage(&self) -> DraftStage {
        self.stage
    }

    fn enforce_price_lock(&mut self) {
        if let Some(ref locked) = self.locked_price {
            self.fields.price = locked.clone();
        }
    }

    /// Runs the current stage's rules. On failure the stage index is
    /// unchanged and the field errors are returned for display.
    pub fn advance(&mut self) -> Result<Advance, Vec<FieldError>> {
        self.enforce_price_lock();

        let errors = validate_stage(self.stage, &self.fields);
        if !errors.is_empty() {
            return Err(errors);
        }

        match self.stage.next() {
            Some(next) => {
                self.stage = next;
                Ok(Advance::Moved(next))
            }
            None => Ok(Advance::ReadyToSubmit),
        }
    }

    /// Going back never validates; not available from the first stage.
    pub fn retreat(&mut self) -> DraftStage {
        if let Some(prev) = self.stage.prev() {
            self.stage = prev;
        }
        self.stage
    }

    pub fn validate_all(&self) -> Vec<FieldError> {
        DraftStage::all()
            .iter()
            .flat_map(|stage| validate_stage(*stage, &self.fields))
            .collect()
    }

    pub fn into_submission(mut self) -> Result<ListingSubmission, Vec<FieldError>> {
        self.enforce_price_lock();

        let errors = self.validate_all();
        if !errors.is_empty() {
            return Err(errors);
        }

        submission_from_fields(&self.fields).ok_or_else(|| {
            // Unreachable once validate_all has passed; surface as a
            // generic form error rather than panicking.
            vec![FieldError::new("form", "Draft could not be parsed")]
        })
    }
}

/// Parse validated form values into the typed submission. Returns `None`
/// if any field fails to parse, which `validate_stage` should have
/// already ruled out.
pub fn submission_from_fields(fields: &DraftFields) -> Option<ListingSubmission> {
    let overlooking = fields.overlooking.trim();
    let age = fields.age_of_construction.trim();

    Some(ListingSubmission {
        title: fields.title.trim().to_string(),
        description: fields.description.trim().to_string(),
        price: parse_positive_number(&fields.price)?,
        listing_type: ListingType::from_form(&fields.listing_type)?,
        location: Location {
            address: fields.address.trim().to_string(),
            pincode: fields.pincode.trim().to_string(),
            state: fields.state.trim().to_string(),
        },
        contact_primary: fields.contact_primary.trim().to_string(),
        contact_secondary: fields.contact_secondary.trim().to_string(),
        property_type: PropertyType::from_form(&fields.property_type)?,
        bedrooms: parse_count(&fields.bedrooms)?,
        bathrooms: parse_count(&fields.bathrooms)?,
        area_sqft: parse_positive_number(&fields.area_sqft)?,
        furnishing: Furnishing::from_form(&fields.furnishing)?,
        overlooking: (!overlooking.is_empty()).then(|| overlooking.to_string()),
        age_of_construction: (!age.is_empty()).then(|| age.to_string()),
        amenities: parse_amenities(&fields.amenities),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{oid::ObjectId, DateTime};
    use crate::models::{ListingStatus, ListingTier};

    fn valid_fields() -> DraftFields {
        DraftFields {
            title: "2BHK in Andheri West".to_string(),
            description: "Spacious 2BHK close to the metro station".to_string(),
            price: "8500000".to_string(),
            listing_type: "sale".to_string(),
            property_type: "apartment".to_string(),
            bedrooms: "2".to_string(),
            bathrooms: "2".to_string(),
            area_sqft: "950".to_string(),
            furnishing: "semi_furnished".to_string(),
            address: "14 Veera Desai Road".to_string(),
            pincode: "400053".to_string(),
            state: "Maharashtra".to_string(),
            contact_primary: "9876543210".to_string(),
            contact_secondary: "8765432109".to_string(),
            amenities: "Lift, Parking".to_string(),
            overlooking: "Garden".to_string(),
            age_of_construction: "5-10 years".to_string(),
        }
    }

    fn stored_listing() -> Listing {
        Listing {
            id: Some(ObjectId::new()),
            owner_id: ObjectId::new(),
            title: "2BHK in Andheri West".to_string(),
            description: "Spacious 2BHK close to the metro station".to_string(),
            price: 8_500_000.0,
            listing_type: ListingType::Sale,
            location: Location {
                address: "14 Veera Desai Road".to_string(),
                pincode: "400053".to_string(),
                state: "Maharashtra".to_string(),
            },
            contact_primary: "9876543210".to_string(),
            contact_secondary: "8765432109".to_string(),
            property_type: PropertyType::Apartment,
            bedrooms: 2,
            bathrooms: 2,
            area_sqft: 950.0,
            furnishing: Furnishing::SemiFurnished,
            overlooking: Some("Garden".to_string()),
            age_of_construction: None,
            amenities: vec!["Lift".to_string()],
            images: vec![],
            tier: ListingTier::Free,
            is_featured: false,
            status: ListingStatus::Approved,
            rejection_reason: None,
            date_listed: DateTime::now(),
            expires_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    #[test]
    fn failed_validation_keeps_the_stage() {
        let mut session = DraftSession::new();
        session.fields = valid_fields();
        session.fields.title = "2BHK".to_string(); // 4 chars

        let errors = session.advance().unwrap_err();
        assert_eq!(session.stage(), DraftStage::Basics);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "title");
    }

    #[test]
    fn valid_draft_walks_all_six_stages() {
        let mut session = DraftSession::new();
        session.fields = valid_fields();

        for expected in [
            DraftStage::Details,
            DraftStage::Location,
            DraftStage::Features,
            DraftStage::Photos,
            DraftStage::Preview,
        ] {
            assert_eq!(session.advance().unwrap(), Advance::Moved(expected));
        }
        assert_eq!(session.advance().unwrap(), Advance::ReadyToSubmit);
        assert_eq!(session.stage(), DraftStage::Preview);
    }

    #[test]
    fn retreat_is_unconditional_but_stops_at_the_first_stage() {
        let mut session = DraftSession::new();
        session.fields = valid_fields();
        session.advance().unwrap();
        assert_eq!(session.stage(), DraftStage::Details);

        // Break a details field; retreat must still work.
        session.fields.bedrooms = "many".to_string();
        assert_eq!(session.retreat(), DraftStage::Basics);
        assert_eq!(session.retreat(), DraftStage::Basics);
    }

    #[test]
    fn stage_rules_flag_each_invalid_field() {
        let mut fields = valid_fields();
        fields.pincode = "4000".to_string();
        fields.contact_primary = "1234567890".to_string();

        let errors = validate_stage(DraftStage::Location, &fields);
        let names: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(names, vec!["pincode", "contact_primary"]);
    }

    #[test]
    fn price_edits_are_ignored_for_non_admin_editors() {
        let listing = stored_listing();
        let mut session = DraftSession::edit(&listing, Role::User);

        session.fields.price = "1".to_string();
        let submission = session.into_submission().unwrap();
        assert_eq!(submission.price, 8_500_000.0);
    }

    #[test]
    fn admin_editors_may_revise_the_price() {
        let listing = stored_listing();
        let mut session = DraftSession::edit(&listing, Role::Admin);

        session.fields.price = "9000000".to_string();
        let submission = session.into_submission().unwrap();
        assert_eq!(submission.price, 9_000_000.0);
    }

    #[test]
    fn edit_seeding_prepopulates_every_stage() {
        let listing = stored_listing();
        let mut session = DraftSession::edit(&listing, Role::User);

        // All stages validate without touching a single field.
        for _ in 0..5 {
            session.advance().unwrap();
        }
        assert_eq!(session.advance().unwrap(), Advance::ReadyToSubmit);
    }

    #[test]
    fn submission_parses_typed_values_and_optionals() {
        let mut session = DraftSession::new();
        session.fields = valid_fields();
        session.fields.age_of_construction = "  ".to_string();

        let submission = session.into_submission().unwrap();
        assert_eq!(submission.listing_type, ListingType::Sale);
        assert_eq!(submission.bedrooms, 2);
        assert_eq!(submission.area_sqft, 950.0);
        assert_eq!(submission.amenities, vec!["Lift", "Parking"]);
        assert_eq!(submission.overlooking.as_deref(), Some("Garden"));
        assert_eq!(submission.age_of_construction, None);
    }

    #[test]
    fn blank_draft_reports_errors_for_every_required_stage() {
        let session = DraftSession::new();
        let errors = session.validate_all();

        assert!(errors.iter().any(|e| e.field == "title"));
        assert!(errors.iter().any(|e| e.field == "property_type"));
        assert!(errors.iter().any(|e| e.field == "pincode"));
    }
}
