use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Owner, ValidationError};

/// Listing status. Backends disagree on spelling, so the common variants are accepted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyStatus {
    #[default]
    #[serde(alias = "for-sale", alias = "for_sale", alias = "available", alias = "Active")]
    Active,
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Sold")]
    Sold,
    #[serde(alias = "off_market", alias = "offmarket", alias = "OffMarket")]
    OffMarket,
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PropertyStatus::Active => "active",
            PropertyStatus::Pending => "pending",
            PropertyStatus::Sold => "sold",
            PropertyStatus::OffMarket => "off-market",
        };
        f.write_str(label)
    }
}

impl FromStr for PropertyStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "active" | "for-sale" | "available" => Ok(PropertyStatus::Active),
            "pending" => Ok(PropertyStatus::Pending),
            "sold" => Ok(PropertyStatus::Sold),
            "off-market" | "offmarket" => Ok(PropertyStatus::OffMarket),
            other => Err(ValidationError::Invalid {
                field: "status",
                reason: format!("unknown status '{}'", other),
            }),
        }
    }
}

/// Kind of dwelling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Villa,
    Penthouse,
    Townhouse,
    Studio,
    Condo,
}

impl PropertyType {
    pub const ALL: [PropertyType; 7] = [
        PropertyType::Apartment,
        PropertyType::House,
        PropertyType::Villa,
        PropertyType::Penthouse,
        PropertyType::Townhouse,
        PropertyType::Studio,
        PropertyType::Condo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Villa => "villa",
            PropertyType::Penthouse => "penthouse",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Studio => "studio",
            PropertyType::Condo => "condo",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PropertyType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ValidationError::Invalid {
                field: "property type",
                reason: format!("unknown type '{}'", s),
            })
    }
}

/// One listing image. The first image of a property is its cover unless
/// another one is flagged explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "ImageRepr")]
pub struct PropertyImage {
    pub url: String,
    #[serde(default)]
    pub is_cover: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl PropertyImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_cover: false,
            alt: None,
        }
    }
}

/// Some endpoints send bare URLs, others full image objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImageRepr {
    Url(String),
    #[serde(rename_all = "camelCase")]
    Full {
        #[serde(alias = "file")]
        url: String,
        #[serde(default)]
        is_cover: bool,
        #[serde(default)]
        alt: Option<String>,
    },
}

impl From<ImageRepr> for PropertyImage {
    fn from(repr: ImageRepr) -> Self {
        match repr {
            ImageRepr::Url(url) => PropertyImage::new(url),
            ImageRepr::Full { url, is_cover, alt } => PropertyImage { url, is_cover, alt },
        }
    }
}

/// Core property data model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(alias = "idProperty")]
    pub id: String,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    #[serde(default, alias = "location")]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default, alias = "area", alias = "size")]
    pub size_sqft: u32,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default, alias = "type")]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub images: Vec<PropertyImage>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default, alias = "idOwner", alias = "agentId")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Property {
    /// The flagged cover image, or the first image when none is flagged
    pub fn cover_image(&self) -> Option<&PropertyImage> {
        self.images
            .iter()
            .find(|img| img.is_cover)
            .or_else(|| self.images.first())
    }

    pub fn price_per_sqft(&self) -> Option<f64> {
        (self.size_sqft > 0).then(|| self.price as f64 / self.size_sqft as f64)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::Missing("id"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::Missing("name"));
        }
        validate_covers(&self.images)
    }
}

fn validate_covers(images: &[PropertyImage]) -> Result<(), ValidationError> {
    let covers = images.iter().filter(|img| img.is_cover).count();
    if covers > 1 {
        return Err(ValidationError::Invalid {
            field: "images",
            reason: format!("{} images flagged as cover, at most one allowed", covers),
        });
    }
    Ok(())
}

/// One entry of a property's sale history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTrace {
    #[serde(default, alias = "idPropertyTrace")]
    pub id: Option<String>,
    pub date_sale: DateTime<Utc>,
    #[serde(default)]
    pub name: String,
    pub value: u64,
    #[serde(default)]
    pub tax: u64,
}

/// A property together with its owner and sale timeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetail {
    #[serde(flatten)]
    pub property: Property,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default, alias = "propertyTraces")]
    pub traces: Vec<PropertyTrace>,
}

impl PropertyDetail {
    /// Sale history, oldest first
    pub fn timeline(&self) -> Vec<&PropertyTrace> {
        let mut entries: Vec<&PropertyTrace> = self.traces.iter().collect();
        entries.sort_by_key(|t| t.date_sale);
        entries
    }
}

/// Payload of the property creation form
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    pub name: String,
    pub description: String,
    pub price: u64,
    pub address: String,
    pub city: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub size_sqft: u32,
    pub status: PropertyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    pub images: Vec<PropertyImage>,
    pub features: Vec<String>,
    pub amenities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl NewProperty {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Missing("name"));
        }
        if self.address.trim().is_empty() {
            return Err(ValidationError::Missing("address"));
        }
        if self.price == 0 {
            return Err(ValidationError::Invalid {
                field: "price",
                reason: "must be greater than zero".to_string(),
            });
        }
        validate_covers(&self.images)
    }
}

/// Partial update; only the populated fields are sent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PropertyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<PropertyImage>>,
}

impl PropertyUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::Missing("name"));
            }
        }
        match &self.images {
            Some(images) => validate_covers(images),
            None => Ok(()),
        }
    }

    /// Apply the populated fields to a local copy
    pub fn apply_to(&self, property: &mut Property) {
        if let Some(name) = &self.name {
            property.name = name.clone();
        }
        if let Some(description) = &self.description {
            property.description = description.clone();
        }
        if let Some(price) = self.price {
            property.price = price;
        }
        if let Some(address) = &self.address {
            property.address = address.clone();
        }
        if let Some(status) = self.status {
            property.status = status;
        }
        if let Some(images) = &self.images {
            property.images = images.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_alternate_wire_spellings() {
        let property: Property = serde_json::from_value(json!({
            "idProperty": "42",
            "title": "Skyline Loft",
            "price": 1_250_000,
            "location": "Brickell Ave 100",
            "status": "for-sale",
            "type": "penthouse",
            "images": ["https://cdn/a.jpg", {"file": "https://cdn/b.jpg", "isCover": true}],
            "idOwner": "7"
        }))
        .unwrap();

        assert_eq!(property.id, "42");
        assert_eq!(property.name, "Skyline Loft");
        assert_eq!(property.address, "Brickell Ave 100");
        assert_eq!(property.status, PropertyStatus::Active);
        assert_eq!(property.property_type, Some(PropertyType::Penthouse));
        assert_eq!(property.owner_id.as_deref(), Some("7"));
        assert_eq!(property.cover_image().unwrap().url, "https://cdn/b.jpg");
    }

    #[test]
    fn first_image_is_cover_by_default() {
        let property: Property = serde_json::from_value(json!({
            "id": "1", "name": "Villa", "price": 10,
            "images": ["https://cdn/first.jpg", "https://cdn/second.jpg"]
        }))
        .unwrap();
        assert_eq!(property.cover_image().unwrap().url, "https://cdn/first.jpg");
    }

    #[test]
    fn rejects_two_cover_images() {
        let mut input = NewProperty {
            name: "Villa".into(),
            address: "Ocean Dr 1".into(),
            price: 100,
            ..Default::default()
        };
        input.images = vec![
            PropertyImage { is_cover: true, ..PropertyImage::new("a") },
            PropertyImage { is_cover: true, ..PropertyImage::new("b") },
        ];
        assert!(matches!(
            input.validate(),
            Err(ValidationError::Invalid { field: "images", .. })
        ));
    }

    #[test]
    fn status_and_type_parse_from_cli_text() {
        assert_eq!("Off_Market".parse::<PropertyStatus>().unwrap(), PropertyStatus::OffMarket);
        assert_eq!("Condo".parse::<PropertyType>().unwrap(), PropertyType::Condo);
        assert!("castle".parse::<PropertyType>().is_err());
    }

    #[test]
    fn timeline_is_oldest_first() {
        let detail: PropertyDetail = serde_json::from_value(json!({
            "id": "1", "name": "Villa", "price": 10,
            "traces": [
                {"dateSale": "2021-05-01T00:00:00Z", "name": "Resale", "value": 900, "tax": 9},
                {"dateSale": "2015-01-01T00:00:00Z", "name": "First sale", "value": 500, "tax": 5}
            ]
        }))
        .unwrap();
        let names: Vec<&str> = detail.timeline().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["First sale", "Resale"]);
    }
}
