use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
}

impl ListingType {
    pub fn from_form(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sale" => Some(ListingType::Sale),
            "rent" => Some(ListingType::Rent),
            _ => None,
        }
    }

    pub fn as_form(&self) -> &'static str {
        match self {
            ListingType::Sale => "sale",
            ListingType::Rent => "rent",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    IndependentHouse,
    Villa,
    Plot,
    BuilderFloor,
    Farmhouse,
}

impl PropertyType {
    pub fn from_form(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "apartment" => Some(PropertyType::Apartment),
            "independent_house" => Some(PropertyType::IndependentHouse),
            "villa" => Some(PropertyType::Villa),
            "plot" => Some(PropertyType::Plot),
            "builder_floor" => Some(PropertyType::BuilderFloor),
            "farmhouse" => Some(PropertyType::Farmhouse),
            _ => None,
        }
    }

    pub fn as_form(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::IndependentHouse => "independent_house",
            PropertyType::Villa => "villa",
            PropertyType::Plot => "plot",
            PropertyType::BuilderFloor => "builder_floor",
            PropertyType::Farmhouse => "farmhouse",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Furnishing {
    Unfurnished,
    SemiFurnished,
    Furnished,
}

impl Furnishing {
    pub fn from_form(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "unfurnished" => Some(Furnishing::Unfurnished),
            "semi_furnished" => Some(Furnishing::SemiFurnished),
            "furnished" => Some(Furnishing::Furnished),
            _ => None,
        }
    }

    pub fn as_form(&self) -> &'static str {
        match self {
            Furnishing::Unfurnished => "unfurnished",
            Furnishing::SemiFurnished => "semi_furnished",
            Furnishing::Furnished => "furnished",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingTier {
    Free,
    Premium,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
}

impl ListingStatus {
    pub fn from_form(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(ListingStatus::Pending),
            "approved" => Some(ListingStatus::Approved),
            "rejected" => Some(ListingStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_form(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, PartialEq)]
pub struct Location {
    pub address: String,
    pub pincode: String,
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Listing {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlooking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_of_construction: Option<String>,
    pub amenities: Vec<String>,
    /// Index 0 is treated as the cover image by every consumer.
    pub images: Vec<String>,
    pub tier: ListingTier,
    pub is_featured: bool,
    pub status: ListingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub date_listed: DateTime,
    pub expires_at: DateTime,
    pub updated_at: DateTime,
}

/// Comma-separated amenity input to a trimmed, non-empty list.
pub fn parse_amenities(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn expires_after(date_listed: DateTime, days: i64) -> DateTime {
    DateTime::from_millis(date_listed.timestamp_millis() + days * 24 * 60 * 60 * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FREE_LISTING_LIFETIME_DAYS, PREMIUM_LISTING_LIFETIME_DAYS};

    #[test]
    fn amenities_are_trimmed_and_empties_dropped() {
        assert_eq!(
            parse_amenities(" Lift , Parking ,, 24x7 Water ,"),
            vec!["Lift", "Parking", "24x7 Water"]
        );
        assert!(parse_amenities("  ,  ").is_empty());
        assert!(parse_amenities("").is_empty());
    }

    #[test]
    fn expiry_matches_account_tier_windows() {
        let listed = DateTime::from_millis(1_700_000_000_000);

        let premium = expires_after(listed, PREMIUM_LISTING_LIFETIME_DAYS);
        let free = expires_after(listed, FREE_LISTING_LIFETIME_DAYS);

        assert_eq!(
            premium.timestamp_millis() - listed.timestamp_millis(),
            30 * 86_400_000
        );
        assert_eq!(
            free.timestamp_millis() - listed.timestamp_millis(),
            90 * 86_400_000
        );
    }

    #[test]
    fn enum_form_values_round_trip() {
        assert_eq!(ListingType::from_form("Sale"), Some(ListingType::Sale));
        assert_eq!(ListingType::from_form("lease"), None);
        assert_eq!(
            PropertyType::from_form("builder_floor"),
            Some(PropertyType::BuilderFloor)
        );
        assert_eq!(PropertyType::from_form("castle"), None);
        assert_eq!(
            Furnishing::from_form("semi_furnished"),
            Some(Furnishing::SemiFurnished)
        );
        assert_eq!(Furnishing::from_form(""), None);
    }
}
