use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::json;
use sha2::Sha256;

use crate::config::Config;

pub struct RazorpayService;

impl RazorpayService {
    fn key_id() -> Result<String, String> {
        Config::razorpay_key_id().ok_or_else(|| "RAZORPAY_KEY_ID not configured".to_string())
    }

    fn key_secret() -> Result<String, String> {
        Config::razorpay_key_secret().ok_or_else(|| "RAZORPAY_KEY_SECRET not configured".to_string())
    }

    /// Create an order for `amount` rupees.
    pub async fn create_order(amount: i64) -> Result<serde_json::Value, String> {
        let client = Client::new();
        let receipt = format!("rcpt_{:08x}", rand::random::<u32>());

        let res = client
            .post("https://api.razorpay.com/v1/orders")
            .basic_auth(Self::key_id()?, Some(Self::key_secret()?))
            .json(&json!({
                "amount": amount * 100,
                "currency": "INR",
                "receipt": receipt,
                "payment_capture": 1
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            return Err(res.text().await.unwrap_or_else(|_| "Razorpay error".to_string()));
        }

        res.json().await.map_err(|e| e.to_string())
    }

    /// Checkout-callback signature: HMAC-SHA256 over "order_id|payment_id".
    pub fn verify_signature(
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, String> {
        let secret = Self::key_secret()?;

        let payload = format!("{}|{}", order_id, payment_id);
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|_| "Invalid HMAC key".to_string())?;
        mac.update(payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        Ok(expected == signature)
    }
}
