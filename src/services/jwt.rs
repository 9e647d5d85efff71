use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

use crate::config::Config;
use crate::models::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub mobile: String,
    /// Capability claim minted at login; admin routes check this, never
    /// an email address.
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret(&self) -> String {
        match self {
            TokenKind::Access => Config::jwt_secret(),
            TokenKind::Refresh => Config::jwt_refresh_secret(),
        }
    }

    fn expiry(&self) -> i64 {
        match self {
            TokenKind::Access => Config::jwt_expiry(),
            TokenKind::Refresh => Config::jwt_refresh_expiry(),
        }
    }
}

pub struct JwtService;

impl JwtService {
    fn issue(
        user_id: &ObjectId,
        mobile: &str,
        role: Role,
        kind: TokenKind,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();

        let claims = Claims {
            sub: user_id.to_hex(),
            mobile: mobile.to_string(),
            role,
            exp: now + kind.expiry(),
            iat: now,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(kind.secret().as_bytes()),
        )
    }

    pub fn generate_access_token(
        user_id: &ObjectId,
        mobile: &str,
        role: Role,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        Self::issue(user_id, mobile, role, TokenKind::Access)
    }

    pub fn generate_refresh_token(
        user_id: &ObjectId,
        mobile: &str,
        role: Role,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        Self::issue(user_id, mobile, role, TokenKind::Refresh)
    }

    pub fn verify_token(token: &str, is_refresh: bool) -> Result<Claims, jsonwebtoken::errors::Error> {
        let kind = if is_refresh {
            TokenKind::Refresh
        } else {
            TokenKind::Access
        };

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(kind.secret().as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}
