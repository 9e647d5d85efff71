use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Basic,
    Pro,
    Business,
}

/// Append-only purchase record embedded in the user document.
///
/// `plan_tier` is written when the payment is verified. Records created
/// before the field existed carry only the free-text description, so tier
/// classification falls back to a keyword scan for those.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct Transaction {
    pub payment_id: String,
    pub amount: f64,
    #[schemars(with = "String")]
    pub date: DateTime,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_tier: Option<PlanTier>,
}

const LEGACY_PLAN_KEYWORDS: [&str; 3] = ["basic", "pro", "business"];

impl Transaction {
    pub fn grants_premium(&self) -> bool {
        if self.plan_tier.is_some() {
            return true;
        }
        let description = self.description.to_lowercase();
        LEGACY_PLAN_KEYWORDS.iter().any(|k| description.contains(k))
    }
}

/// Listing lifetime by account tier. Premium accounts run shorter cycles.
pub const PREMIUM_LISTING_LIFETIME_DAYS: i64 = 30;
pub const FREE_LISTING_LIFETIME_DAYS: i64 = 90;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub mobile: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub profile_photo: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub role: Role,
    pub listing_credits: i64,
    pub verified_until: Option<DateTime>,
    pub transactions: Vec<Transaction>,
    pub is_active: bool,
    pub last_login_at: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    /// Quota check for the non-edit path. Edits of an owned listing never
    /// consume a credit and bypass this entirely.
    pub fn can_create_listing(&self) -> bool {
        self.listing_credits > 0
    }

    pub fn has_premium_plan(&self) -> bool {
        self.transactions.iter().any(Transaction::grants_premium)
    }

    pub fn listing_lifetime_days(&self) -> i64 {
        if self.has_premium_plan() {
            PREMIUM_LISTING_LIFETIME_DAYS
        } else {
            FREE_LISTING_LIFETIME_DAYS
        }
    }

    /// Active paid verification window, which makes new listings featured.
    pub fn is_verified_now(&self) -> bool {
        self.verified_until
            .map(|until| until > DateTime::now())
            .unwrap_or(false)
    }
}

/// Filter + update for consuming one listing credit. The `$gt: 0` filter
/// makes the check and the decrement one conditional server-side
/// operation, so concurrent submissions cannot drive the balance
/// negative.
pub fn consume_credit_query(user_id: ObjectId) -> (Document, Document) {
    (
        doc! { "_id": user_id, "listing_credits": { "$gt": 0 } },
        doc! { "$inc": { "listing_credits": -1 } },
    )
}

/// Compensating update when the listing write fails after the credit was
/// already consumed.
pub fn refund_credit_update() -> Document {
    doc! { "$inc": { "listing_credits": 1 } }
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct UpdateProfileDto {
    #[validate(length(min = 2, max = 80))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub profile_photo: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UserResponse {
    pub id: String,
    pub mobile: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub profile_photo: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub role: Role,
    pub listing_credits: i64,
    #[schemars(with = "Option<String>")]
    pub verified_until: Option<DateTime>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            mobile: user.mobile,
            email: user.email,
            name: user.name,
            profile_photo: user.profile_photo,
            city: user.city,
            pincode: user.pincode,
            role: user.role,
            listing_credits: user.listing_credits,
            verified_until: user.verified_until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(credits: i64, transactions: Vec<Transaction>) -> User {
        User {
            id: Some(ObjectId::new()),
            mobile: "9876543210".to_string(),
            email: None,
            name: None,
            profile_photo: None,
            city: None,
            pincode: None,
            role: Role::User,
            listing_credits: credits,
            verified_until: None,
            transactions,
            is_active: true,
            last_login_at: DateTime::now(),
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    fn legacy_txn(description: &str) -> Transaction {
        Transaction {
            payment_id: "pay_test".to_string(),
            amount: 499.0,
            date: DateTime::now(),
            description: description.to_string(),
            plan_tier: None,
        }
    }

    #[test]
    fn zero_credits_blocks_creation() {
        assert!(!account(0, vec![]).can_create_listing());
        assert!(account(5, vec![]).can_create_listing());
    }

    #[test]
    fn explicit_plan_tier_classifies_premium() {
        let txn = Transaction {
            plan_tier: Some(PlanTier::Pro),
            ..legacy_txn("Verification plan")
        };
        assert!(account(1, vec![txn]).has_premium_plan());
    }

    #[test]
    fn legacy_description_keywords_classify_premium() {
        let user = account(1, vec![legacy_txn("Business Plan Renewal")]);
        assert!(user.has_premium_plan());
        assert_eq!(user.listing_lifetime_days(), PREMIUM_LISTING_LIFETIME_DAYS);
    }

    #[test]
    fn unrelated_transactions_stay_free_tier() {
        let user = account(1, vec![legacy_txn("Single listing credit")]);
        assert!(!user.has_premium_plan());
        assert_eq!(user.listing_lifetime_days(), FREE_LISTING_LIFETIME_DAYS);
    }

    #[test]
    fn credit_consumption_is_guarded_by_a_positive_balance_filter() {
        let user_id = ObjectId::new();
        let (filter, update) = consume_credit_query(user_id);

        assert_eq!(filter.get_object_id("_id").unwrap(), user_id);
        assert_eq!(
            filter.get_document("listing_credits").unwrap(),
            &doc! { "$gt": 0 }
        );
        assert_eq!(update, doc! { "$inc": { "listing_credits": -1 } });
        assert_eq!(
            refund_credit_update(),
            doc! { "$inc": { "listing_credits": 1 } }
        );
    }

    #[test]
    fn verification_window_must_be_in_the_future() {
        let mut user = account(1, vec![]);
        assert!(!user.is_verified_now());

        user.verified_until = Some(DateTime::from_millis(
            chrono::Utc::now().timestamp_millis() + 86_400_000,
        ));
        assert!(user.is_verified_now());

        user.verified_until = Some(DateTime::from_millis(
            chrono::Utc::now().timestamp_millis() - 86_400_000,
        ));
        assert!(!user.is_verified_now());
    }
}
