use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use sha1::Sha1;
use uuid::Uuid;

use async_trait::async_trait;
use data_encoding::BASE64;

use crate::config::Config;
use crate::media::{LocalFile, UploadAuth, UploadBackend, UploadError, UploadedImage};

const AUTH_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const DELETE_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials stay valid long enough for one submission batch.
const CREDENTIAL_TTL_SECS: i64 = 600;

pub struct ImageKitService;

impl ImageKitService {
    fn public_key() -> Result<String, UploadError> {
        Config::imagekit_public_key()
            .ok_or_else(|| UploadError::Auth("IMAGEKIT_PUBLIC_KEY not configured".to_string()))
    }

    fn private_key() -> Result<String, UploadError> {
        Config::imagekit_private_key()
            .ok_or_else(|| UploadError::Auth("IMAGEKIT_PRIVATE_KEY not configured".to_string()))
    }

    fn client(timeout: Duration) -> Result<Client, UploadError> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Auth(e.to_string()))
    }

    /// Mint a short-lived credential. ImageKit's scheme: the signature is
    /// HMAC-SHA1 of token + expire under the private key.
    pub fn mint_auth_params() -> Result<UploadAuth, UploadError> {
        let private_key = Self::private_key()?;

        let token = Uuid::new_v4().to_string();
        let expire = chrono::Utc::now().timestamp() + CREDENTIAL_TTL_SECS;

        let mut mac = Hmac::<Sha1>::new_from_slice(private_key.as_bytes())
            .map_err(|_| UploadError::Auth("Invalid HMAC key".to_string()))?;
        mac.update(format!("{}{}", token, expire).as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(UploadAuth {
            token,
            expire,
            signature,
        })
    }
}

#[async_trait]
impl UploadBackend for ImageKitService {
    /// Fetch a batch credential from the configured authority. A timeout
    /// counts as a credential failure, same as a non-200.
    async fn authorize(&self) -> Result<UploadAuth, UploadError> {
        let endpoint = Config::imagekit_auth_endpoint();

        let res = Self::client(AUTH_TIMEOUT)?
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| UploadError::Auth(e.to_string()))?;

        if !res.status().is_success() {
            return Err(UploadError::Auth(format!(
                "credential endpoint returned {}",
                res.status()
            )));
        }

        res.json::<UploadAuth>()
            .await
            .map_err(|e| UploadError::Auth(e.to_string()))
    }

    async fn upload(
        &self,
        auth: &UploadAuth,
        file: &LocalFile,
    ) -> Result<UploadedImage, UploadError> {
        let public_key = Self::public_key()?;
        let endpoint = Config::imagekit_upload_endpoint();

        let form = [
            ("file", BASE64.encode(&file.data)),
            ("fileName", file.file_name.clone()),
            ("publicKey", public_key),
            ("token", auth.token.clone()),
            ("expire", auth.expire.to_string()),
            ("signature", auth.signature.clone()),
            ("folder", "/listings".to_string()),
            ("useUniqueFileName", "true".to_string()),
        ];

        let res = Self::client(UPLOAD_TIMEOUT)?
            .post(&endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| UploadError::Transfer(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(UploadError::Transfer(format!(
                "upload returned {}: {}",
                status, body
            )));
        }

        let body: serde_json::Value = res
            .json()
            .await
            .map_err(|e| UploadError::Transfer(e.to_string()))?;

        let url = body
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| UploadError::Transfer("upload response missing url".to_string()))?
            .to_string();
        let file_id = body
            .get("fileId")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(UploadedImage { url, file_id })
    }

    async fn delete(&self, file_id: &str) -> Result<(), UploadError> {
        let private_key = Self::private_key()?;
        let url = format!("https://api.imagekit.io/v1/files/{}", file_id);

        let res = Self::client(DELETE_TIMEOUT)?
            .delete(&url)
            .basic_auth(private_key, Some(String::new()))
            .send()
            .await
            .map_err(|e| UploadError::Transfer(e.to_string()))?;

        if !res.status().is_success() {
            return Err(UploadError::Transfer(format!(
                "delete returned {}",
                res.status()
            )));
        }

        Ok(())
    }
}
