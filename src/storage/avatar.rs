//! Avatar storage using Cloudflare R2
//!
//! One object per account under `avatars/{account_id}/`, served through
//! the bucket's Custom Domain.

use aws_sdk_s3::Client as S3Client;

use super::build_r2_http_client;
use crate::config::{AvatarStorageConfig, CloudflareConfig};
use crate::error::AppError;

/// Accepted avatar content types and the extension stored for each
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Check an upload and return the file extension for its content type
///
/// # Errors
/// `Validation` for empty, oversized or non-image uploads.
pub fn validate_avatar(
    content_type: &str,
    len: usize,
    max_bytes: usize,
) -> Result<&'static str, AppError> {
    if len == 0 {
        return Err(AppError::Validation("Avatar file is empty".to_string()));
    }
    if len > max_bytes {
        return Err(AppError::Validation(format!(
            "Avatar must be at most {} bytes",
            max_bytes
        )));
    }

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| {
            AppError::Validation("Avatar must be a JPEG, PNG, GIF or WebP image".to_string())
        })
}

/// Object key for an account's avatar
pub fn avatar_key(account_id: &str, ext: &str) -> String {
    format!("avatars/{}/avatar.{}", account_id, ext)
}

/// Avatar storage service
pub struct AvatarStorage {
    client: S3Client,
    bucket: String,
    /// Public URL base (Custom Domain), no trailing slash
    public_url: String,
    max_bytes: usize,
}

impl AvatarStorage {
    /// Create new avatar storage client
    ///
    /// No request is made until the first upload.
    pub fn new(config: &AvatarStorageConfig, cloudflare: &CloudflareConfig) -> Self {
        use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

        // R2 endpoint: https://{account_id}.r2.cloudflarestorage.com
        let endpoint = format!("https://{}.r2.cloudflarestorage.com", cloudflare.account_id);

        let credentials = Credentials::new(
            &cloudflare.r2_access_key_id,
            &cloudflare.r2_secret_access_key,
            None,
            None,
            "mutuals-r2",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .http_client(build_r2_http_client())
            .region(Region::new("auto"))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .build();

        Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            max_bytes: config.max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Upload an avatar, replacing any object at the same key
    ///
    /// # Returns
    /// (object key, public URL)
    pub async fn upload(
        &self,
        account_id: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(String, String), AppError> {
        use aws_sdk_s3::primitives::ByteStream;

        let ext = validate_avatar(content_type, data.len(), self.max_bytes)?;
        let key = avatar_key(account_id, ext);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .cache_control("public, max-age=3600")
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;

        let url = self.public_url(&key);
        Ok((key, url))
    }

    /// Delete an avatar object
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("R2 delete failed: {}", e)))?;

        Ok(())
    }

    /// Public URL for a key
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}
