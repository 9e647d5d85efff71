use reqwest::Client;
use serde_json::json;

use crate::config::Config;

const MSG91_BASE: &str = "https://control.msg91.com/api/v5/otp";

/// SMS OTP delivery for login. Thin wrapper over the MSG91 v5 OTP API;
/// OTP generation and matching happen on their side.
pub struct Msg91Service;

impl Msg91Service {
    fn auth_key() -> Result<String, String> {
        Config::msg91_auth_key().ok_or_else(|| "MSG91_AUTH_KEY not configured".to_string())
    }

    async fn check(res: reqwest::Response, context: &str) -> Result<(), String> {
        if res.status().is_success() {
            return Ok(());
        }
        let body = res.text().await.unwrap_or_default();
        Err(format!("{}: {}", context, body))
    }

    pub async fn send_login_otp(mobile: &str) -> Result<(), String> {
        if !Config::is_msg91_enabled() {
            return Err("MSG91 is not enabled".to_string());
        }

        let template_id = Config::msg91_template_id()
            .ok_or_else(|| "MSG91_TEMPLATE_ID not configured".to_string())?;

        let res = Client::new()
            .post(MSG91_BASE)
            .json(&json!({
                "template_id": template_id,
                "mobile": format!("91{}", mobile),
                "authkey": Self::auth_key()?,
            }))
            .send()
            .await
            .map_err(|e| format!("MSG91 request failed: {}", e))?;

        Self::check(res, "MSG91 send failed").await
    }

    pub async fn verify_login_otp(mobile: &str, otp: &str) -> Result<(), String> {
        if !Config::is_msg91_enabled() {
            return Err("MSG91 is not enabled".to_string());
        }

        let url = format!(
            "{}/verify?mobile=91{}&otp={}&authkey={}",
            MSG91_BASE,
            mobile,
            otp,
            Self::auth_key()?
        );

        let res = Client::new()
            .post(url)
            .send()
            .await
            .map_err(|e| format!("MSG91 request failed: {}", e))?;

        Self::check(res, "MSG91 verification failed").await
    }
}
