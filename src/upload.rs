//! Property image uploads to blob storage.
//!
//! The upload route only hands out a token for pathnames that follow the
//! listing convention, so the same rules are checked here before any bytes
//! leave the process.

use std::fmt;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::client::send_request;
use crate::api::{ApiClient, ApiError};
use crate::config::Config;

pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;
pub const DEFAULT_MAX_GALLERY_IMAGES: u32 = 12;

const ALLOWED_CONTENT_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid upload pathname: {0}")]
    InvalidPathname(String),
    #[error("Gallery index {index} is outside 1..={max}")]
    IndexOutOfRange { index: u32, max: u32 },
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("File is {size} bytes, the limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("File is empty")]
    Empty,
    #[error("Invalid upload URL {0}: {1}")]
    UploadUrl(String, String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Which image of a listing is being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Cover,
    Gallery(u32),
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSlot::Cover => f.write_str("cover"),
            ImageSlot::Gallery(index) => write!(f, "{}", index),
        }
    }
}

/// An authorized upload: where the file goes and what it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadGrant {
    pub property_id: String,
    pub slot: ImageSlot,
    pub pathname: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_gallery_images: u32,
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_gallery_images: DEFAULT_MAX_GALLERY_IMAGES,
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

/// File extension for an allowed image content type
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

fn valid_property_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl UploadPolicy {
    /// Build the pathname for a slot, checking the id and gallery bounds
    pub fn pathname(
        &self,
        property_id: &str,
        slot: ImageSlot,
        content_type: &str,
    ) -> Result<String, UploadError> {
        if !valid_property_id(property_id) {
            return Err(UploadError::InvalidPathname(format!(
                "properties/{}/{}",
                property_id, slot
            )));
        }
        if let ImageSlot::Gallery(index) = slot {
            self.check_index(index)?;
        }
        let ext = extension_for(content_type)
            .ok_or_else(|| UploadError::UnsupportedContentType(content_type.to_string()))?;
        Ok(format!("properties/{}/{}.{}", property_id, slot, ext))
    }

    /// Validate a requested upload the way the upload route does before
    /// issuing a token.
    pub fn authorize(
        &self,
        pathname: &str,
        content_type: &str,
        size: u64,
    ) -> Result<UploadGrant, UploadError> {
        let ext = extension_for(content_type)
            .ok_or_else(|| UploadError::UnsupportedContentType(content_type.to_string()))?;
        if size == 0 {
            return Err(UploadError::Empty);
        }
        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        let invalid = || UploadError::InvalidPathname(pathname.to_string());
        let parts: Vec<&str> = pathname.split('/').collect();
        let (property_id, file) = match parts.as_slice() {
            ["properties", id, file] if valid_property_id(id) => (*id, *file),
            _ => return Err(invalid()),
        };
        let (stem, file_ext) = file.rsplit_once('.').ok_or_else(invalid)?;
        if !file_ext.eq_ignore_ascii_case(ext)
            && !(ext == "jpg" && file_ext.eq_ignore_ascii_case("jpeg"))
        {
            return Err(invalid());
        }

        let slot = if stem == "cover" {
            ImageSlot::Cover
        } else {
            if stem.is_empty() || !stem.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            let index = stem.parse::<u32>().map_err(|_| invalid())?;
            self.check_index(index)?;
            ImageSlot::Gallery(index)
        };

        Ok(UploadGrant {
            property_id: property_id.to_string(),
            slot,
            pathname: pathname.to_string(),
            content_type: content_type.to_string(),
            size,
        })
    }

    fn check_index(&self, index: u32) -> Result<(), UploadError> {
        if index == 0 || index > self.max_gallery_images {
            return Err(UploadError::IndexOutOfRange {
                index,
                max: self.max_gallery_images,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    #[serde(default)]
    pub pathname: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Posts listing images to the web app's upload route
pub struct ImageUploader {
    http: Client,
    upload_url: Url,
    timeout: Duration,
    blob_token: Option<String>,
    policy: UploadPolicy,
}

impl ImageUploader {
    pub fn new(client: &ApiClient, config: &Config) -> Result<Self, UploadError> {
        let base = config.app_url.trim_end_matches('/');
        let upload_url = Url::parse(&format!("{}/api/upload", base))
            .map_err(|e| UploadError::UploadUrl(config.app_url.clone(), e.to_string()))?;
        Ok(Self {
            http: client.http().clone(),
            upload_url,
            timeout: client.timeout(),
            blob_token: config.blob_token.clone(),
            policy: UploadPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    pub async fn upload(
        &self,
        property_id: &str,
        slot: ImageSlot,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage, UploadError> {
        let pathname = self.policy.pathname(property_id, slot, content_type)?;
        let grant = self
            .policy
            .authorize(&pathname, content_type, bytes.len() as u64)?;
        debug!(pathname = %grant.pathname, size = grant.size, "Uploading image");

        let file_name = grant
            .pathname
            .rsplit('/')
            .next()
            .unwrap_or(grant.pathname.as_str())
            .to_string();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&grant.content_type)
            .map_err(|_| UploadError::UnsupportedContentType(grant.content_type.clone()))?;
        let form = Form::new()
            .text("pathname", grant.pathname.clone())
            .part("file", part);

        let mut request = self
            .http
            .post(self.upload_url.clone())
            .timeout(self.timeout)
            .multipart(form);
        if let Some(token) = &self.blob_token {
            request = request.bearer_auth(token);
        }

        let uploaded: UploadedImage = send_request(&self.http, request, self.timeout).await?;
        info!(pathname = %grant.pathname, url = %uploaded.url, "Image uploaded");
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_cover_and_gallery_paths() {
        let policy = UploadPolicy::default();
        let grant = policy
            .authorize("properties/abc-1/cover.jpg", "image/jpeg", 1024)
            .unwrap();
        assert_eq!(grant.slot, ImageSlot::Cover);
        assert_eq!(grant.property_id, "abc-1");

        let grant = policy
            .authorize("properties/42/12.webp", "image/webp", 10)
            .unwrap();
        assert_eq!(grant.slot, ImageSlot::Gallery(12));
    }

    #[test]
    fn rejects_paths_outside_the_convention() {
        let policy = UploadPolicy::default();
        for path in [
            "properties/42/13.png",
            "properties/42/0.png",
            "properties/../cover.png",
            "properties/42/banner.png",
            "uploads/42/cover.png",
            "properties/42/cover.jpg",
        ] {
            assert!(
                policy.authorize(path, "image/png", 10).is_err(),
                "{} should be rejected",
                path
            );
        }
        assert!(matches!(
            policy.authorize("properties/42/13.png", "image/png", 10),
            Err(UploadError::IndexOutOfRange { index: 13, max: 12 })
        ));
    }

    #[test]
    fn enforces_size_and_content_type() {
        let policy = UploadPolicy::default();
        assert!(policy
            .authorize("properties/1/cover.png", "image/png", MAX_UPLOAD_BYTES)
            .is_ok());
        assert!(matches!(
            policy.authorize("properties/1/cover.png", "image/png", MAX_UPLOAD_BYTES + 1),
            Err(UploadError::TooLarge { .. })
        ));
        assert!(matches!(
            policy.authorize("properties/1/cover.gif", "image/gif", 10),
            Err(UploadError::UnsupportedContentType(_))
        ));
    }

    #[test]
    fn pathname_uses_extension_of_content_type() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy
                .pathname("7", ImageSlot::Cover, "image/jpeg")
                .unwrap(),
            "properties/7/cover.jpg"
        );
        assert_eq!(
            policy
                .pathname("7", ImageSlot::Gallery(3), "image/avif")
                .unwrap(),
            "properties/7/3.avif"
        );
        assert!(policy
            .pathname("7/8", ImageSlot::Cover, "image/png")
            .is_err());
    }
}
