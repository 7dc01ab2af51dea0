//! Mock listings and an in-memory backend.
//!
//! Used when `USE_MOCK_DATA` is set and by the tests. The backend honours the
//! same query contract as the real API: filters apply to the whole collection,
//! then the requested page is cut out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::api::{
    ApiError, ApiResult, NotificationRepository, OwnerRepository, PropertyQuery,
    PropertyRepository,
};
use crate::filter::{apply_filters, paginate_results};
use crate::models::{
    NewOwner, NewProperty, Notification, Owner, OwnerRole, Page, Property, PropertyDetail,
    PropertyImage, PropertyStatus, PropertyTrace, PropertyType, PropertyUpdate,
};

fn at(ts: &str) -> DateTime<Utc> {
    ts.parse::<DateTime<Utc>>().unwrap_or_default()
}

fn gallery(id: &str, count: usize) -> Vec<PropertyImage> {
    let mut images = vec![PropertyImage {
        is_cover: true,
        ..PropertyImage::new(format!("https://images.million.test/properties/{}/cover.jpg", id))
    }];
    images.extend((1..=count).map(|i| {
        PropertyImage::new(format!("https://images.million.test/properties/{}/{}.jpg", id, i))
    }));
    images
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// The six showcase listings
pub fn mock_properties() -> Vec<Property> {
    vec![
        Property {
            id: "1".to_string(),
            name: "Brickell Sky Penthouse".to_string(),
            description: "Full-floor penthouse with wraparound terraces and bay views.".to_string(),
            price: 8_500_000,
            address: "1000 Brickell Ave, PH-01".to_string(),
            city: "Miami".to_string(),
            bedrooms: 4,
            bathrooms: 5,
            size_sqft: 5_200,
            status: PropertyStatus::Active,
            property_type: Some(PropertyType::Penthouse),
            images: gallery("1", 3),
            features: strings(&["Private elevator", "Rooftop pool", "Wine cellar"]),
            amenities: strings(&["Concierge", "Spa", "Valet"]),
            owner_id: Some("1".to_string()),
            created_at: Some(at("2025-03-02T10:00:00Z")),
            updated_at: Some(at("2025-06-10T08:30:00Z")),
        },
        Property {
            id: "2".to_string(),
            name: "Oceanfront Villa".to_string(),
            description: "Mediterranean villa on the sand with a private beach club.".to_string(),
            price: 12_750_000,
            address: "1200 Ocean Dr".to_string(),
            city: "Miami Beach".to_string(),
            bedrooms: 6,
            bathrooms: 7,
            size_sqft: 8_900,
            status: PropertyStatus::Active,
            property_type: Some(PropertyType::Villa),
            images: gallery("2", 4),
            features: strings(&["Beach access", "Guest house", "Home theater"]),
            amenities: strings(&["Private dock", "Gym"]),
            owner_id: Some("2".to_string()),
            created_at: Some(at("2025-01-15T14:00:00Z")),
            updated_at: None,
        },
        Property {
            id: "3".to_string(),
            name: "Coral Gables Estate".to_string(),
            description: "Restored 1926 estate among banyan trees, steps from the Biltmore."
                .to_string(),
            price: 4_200_000,
            address: "45 Alhambra Circle".to_string(),
            city: "Coral Gables".to_string(),
            bedrooms: 5,
            bathrooms: 4,
            size_sqft: 6_100,
            status: PropertyStatus::Pending,
            property_type: Some(PropertyType::House),
            images: gallery("3", 2),
            features: strings(&["Courtyard", "Library"]),
            amenities: strings(&["Pool"]),
            owner_id: Some("1".to_string()),
            created_at: Some(at("2024-11-20T09:15:00Z")),
            updated_at: None,
        },
        Property {
            id: "4".to_string(),
            name: "Design District Loft Apartment".to_string(),
            description: "Double-height loft above the boutiques of the Design District."
                .to_string(),
            price: 1_150_000,
            address: "140 NE 39th St, Unit 5B".to_string(),
            city: "Miami".to_string(),
            bedrooms: 2,
            bathrooms: 2,
            size_sqft: 1_650,
            status: PropertyStatus::Active,
            property_type: Some(PropertyType::Apartment),
            images: gallery("4", 1),
            features: strings(&["Floor-to-ceiling windows"]),
            amenities: strings(&["Gym", "Co-working lounge"]),
            owner_id: Some("3".to_string()),
            created_at: Some(at("2025-05-05T16:45:00Z")),
            updated_at: None,
        },
        Property {
            id: "5".to_string(),
            name: "Key Biscayne Townhouse".to_string(),
            description: "Three-level townhouse a short walk from Crandon Park beach.".to_string(),
            price: 2_950_000,
            address: "300 Crandon Blvd".to_string(),
            city: "Key Biscayne".to_string(),
            bedrooms: 3,
            bathrooms: 3,
            size_sqft: 2_800,
            status: PropertyStatus::Active,
            property_type: Some(PropertyType::Townhouse),
            images: gallery("5", 2),
            features: strings(&["Private garage", "Roof deck"]),
            amenities: strings(&["Tennis courts"]),
            owner_id: Some("2".to_string()),
            created_at: Some(at("2025-02-11T11:00:00Z")),
            updated_at: None,
        },
        Property {
            id: "6".to_string(),
            name: "Bay Harbor Condo".to_string(),
            description: "Waterfront condo with sunset views over Biscayne Bay.".to_string(),
            price: 1_850_000,
            address: "10201 E Bay Harbor Dr".to_string(),
            city: "Bay Harbor Islands".to_string(),
            bedrooms: 2,
            bathrooms: 2,
            size_sqft: 1_900,
            status: PropertyStatus::Sold,
            property_type: Some(PropertyType::Condo),
            images: gallery("6", 2),
            features: strings(&["Boat slip"]),
            amenities: strings(&["Pool", "Doorman"]),
            owner_id: Some("3".to_string()),
            created_at: Some(at("2024-08-30T13:20:00Z")),
            updated_at: Some(at("2025-04-01T10:00:00Z")),
        },
    ]
}

pub fn mock_owners() -> Vec<Owner> {
    let owner = |id: &str, name: &str, role: OwnerRole, rating: f32, properties: &[&str]| Owner {
        id: id.to_string(),
        name: name.to_string(),
        email: Some(format!("{}@million.test", name.split(' ').next().unwrap_or(name).to_lowercase())),
        phone: Some(format!("+1 305 555 01{:0>2}", id)),
        address: Some("Miami, FL".to_string()),
        photo: None,
        role,
        rating: Some(rating),
        specialties: strings(&["Waterfront", "Luxury condos"]),
        property_ids: strings(properties),
        created_at: Some(at("2024-01-01T00:00:00Z")),
    };
    vec![
        owner("1", "Isabella Moreno", OwnerRole::Agent, 4.9, &["1", "3"]),
        owner("2", "James Whitaker", OwnerRole::Owner, 4.6, &["2", "5"]),
        owner("3", "Sofia Alvarez", OwnerRole::Agent, 4.8, &["4", "6"]),
    ]
}

pub fn mock_traces() -> HashMap<String, Vec<PropertyTrace>> {
    let trace = |date: &str, name: &str, value: u64| PropertyTrace {
        id: None,
        date_sale: at(date),
        name: name.to_string(),
        value,
        tax: value / 100,
    };
    HashMap::from([
        (
            "1".to_string(),
            vec![
                trace("2019-04-12T00:00:00Z", "Pre-construction sale", 5_900_000),
                trace("2022-09-01T00:00:00Z", "Resale", 7_400_000),
            ],
        ),
        (
            "6".to_string(),
            vec![
                trace("2016-06-20T00:00:00Z", "Initial sale", 1_100_000),
                trace("2025-04-01T00:00:00Z", "Sold", 1_850_000),
            ],
        ),
    ])
}

pub fn mock_notifications() -> Vec<Notification> {
    let note = |id: &str, title: &str, message: &str, read: bool| Notification {
        id: id.to_string(),
        title: title.to_string(),
        message: message.to_string(),
        kind: "info".to_string(),
        read,
        created_at: Some(at("2025-06-01T09:00:00Z")),
    };
    vec![
        note("1", "New inquiry", "A buyer asked about Brickell Sky Penthouse.", false),
        note("2", "Price update", "Coral Gables Estate moved to pending.", false),
        note("3", "Welcome", "Your agent profile is live.", true),
    ]
}

/// In-memory stand-in for the REST backend
pub struct MockBackend {
    properties: RwLock<Vec<Property>>,
    owners: RwLock<Vec<Owner>>,
    traces: HashMap<String, Vec<PropertyTrace>>,
    notifications: RwLock<Vec<Notification>>,
    failure: RwLock<Option<ApiError>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        info!("📋 Using mock listing data");
        Self::with_properties(mock_properties())
    }

    pub fn with_properties(properties: Vec<Property>) -> Self {
        Self {
            properties: RwLock::new(properties),
            owners: RwLock::new(mock_owners()),
            traces: mock_traces(),
            notifications: RwLock::new(mock_notifications()),
            failure: RwLock::new(None),
        }
    }

    /// Make every subsequent call fail with `error`; `None` restores service
    pub async fn set_failure(&self, error: Option<ApiError>) {
        *self.failure.write().await = error;
    }

    async fn check(&self) -> ApiResult<()> {
        match self.failure.read().await.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn page_of<T: Clone>(items: &[T], page: u32, page_size: u32) -> Page<T> {
    let sliced = paginate_results(items, page as usize, page_size as usize);
    Page {
        items: sliced.items,
        page: sliced.page as u32,
        page_size,
        total_count: sliced.total_items as u64,
        total_pages: sliced.total_pages as u32,
    }
}

#[async_trait]
impl PropertyRepository for MockBackend {
    async fn list_properties(&self, query: &PropertyQuery) -> ApiResult<Page<Property>> {
        self.check().await?;
        let properties = self.properties.read().await;
        let matching = apply_filters(&properties, &query.filter);
        debug!(matching = matching.len(), page = query.page, "Mock listing query");
        Ok(page_of(&matching, query.page, query.page_size))
    }

    async fn get_property(&self, id: &str) -> ApiResult<PropertyDetail> {
        self.check().await?;
        let property = self
            .properties
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Property {}", id)))?;

        let owner = match &property.owner_id {
            Some(owner_id) => self
                .owners
                .read()
                .await
                .iter()
                .find(|o| &o.id == owner_id)
                .cloned(),
            None => None,
        };
        let traces = self.traces.get(id).cloned().unwrap_or_default();
        Ok(PropertyDetail {
            property,
            owner,
            traces,
        })
    }

    async fn create_property(&self, input: &NewProperty) -> ApiResult<Property> {
        self.check().await?;
        let mut properties = self.properties.write().await;
        let next_id = properties
            .iter()
            .filter_map(|p| p.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let now = Utc::now();
        let property = Property {
            id: next_id.to_string(),
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            address: input.address.clone(),
            city: input.city.clone(),
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            size_sqft: input.size_sqft,
            status: input.status,
            property_type: input.property_type,
            images: input.images.clone(),
            features: input.features.clone(),
            amenities: input.amenities.clone(),
            owner_id: input.owner_id.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        properties.push(property.clone());
        Ok(property)
    }

    async fn update_property(&self, id: &str, changes: &PropertyUpdate) -> ApiResult<Property> {
        self.check().await?;
        let mut properties = self.properties.write().await;
        let property = properties
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Property {}", id)))?;
        changes.apply_to(property);
        property.updated_at = Some(Utc::now());
        Ok(property.clone())
    }

    async fn delete_property(&self, id: &str) -> ApiResult<()> {
        self.check().await?;
        let mut properties = self.properties.write().await;
        let before = properties.len();
        properties.retain(|p| p.id != id);
        if properties.len() == before {
            return Err(ApiError::not_found(format!("Property {}", id)));
        }
        Ok(())
    }

    fn source_name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait]
impl OwnerRepository for MockBackend {
    async fn list_owners(&self, page: u32, page_size: u32) -> ApiResult<Page<Owner>> {
        self.check().await?;
        Ok(page_of(&self.owners.read().await, page, page_size))
    }

    async fn get_owner(&self, id: &str) -> ApiResult<Owner> {
        self.check().await?;
        self.owners
            .read()
            .await
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Owner {}", id)))
    }

    async fn create_owner(&self, input: &NewOwner) -> ApiResult<Owner> {
        self.check().await?;
        let mut owners = self.owners.write().await;
        let owner = Owner {
            id: (owners.len() + 1).to_string(),
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            photo: input.photo.clone(),
            role: input.role,
            rating: None,
            specialties: input.specialties.clone(),
            property_ids: Vec::new(),
            created_at: Some(Utc::now()),
        };
        owners.push(owner.clone());
        Ok(owner)
    }

    async fn update_owner(&self, id: &str, input: &NewOwner) -> ApiResult<Owner> {
        self.check().await?;
        let mut owners = self.owners.write().await;
        let owner = owners
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Owner {}", id)))?;
        owner.name = input.name.clone();
        owner.email = input.email.clone();
        owner.phone = input.phone.clone();
        owner.address = input.address.clone();
        owner.photo = input.photo.clone();
        owner.role = input.role;
        owner.specialties = input.specialties.clone();
        Ok(owner.clone())
    }
}

#[async_trait]
impl NotificationRepository for MockBackend {
    async fn list_notifications(
        &self,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<Notification>> {
        self.check().await?;
        Ok(page_of(&self.notifications.read().await, page, page_size))
    }

    async fn mark_read(&self, id: &str) -> ApiResult<Notification> {
        self.check().await?;
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Notification {}", id)))?;
        notification.read = true;
        Ok(notification.clone())
    }

    async fn mark_all_read(&self) -> ApiResult<()> {
        self.check().await?;
        self.notifications
            .write()
            .await
            .iter_mut()
            .for_each(|n| n.read = true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PropertyFilter;

    #[test]
    fn six_listings_one_penthouse() {
        let properties = mock_properties();
        assert_eq!(properties.len(), 6);
        let penthouses: Vec<_> = properties
            .iter()
            .filter(|p| p.property_type == Some(PropertyType::Penthouse))
            .collect();
        assert_eq!(penthouses.len(), 1);
        assert_eq!(penthouses[0].id, "1");
        assert!(properties.iter().all(|p| p.validate().is_ok()));
    }

    #[tokio::test]
    async fn filters_before_paginating() {
        let backend = MockBackend::new();
        let query = PropertyQuery {
            page: 1,
            page_size: 2,
            filter: PropertyFilter {
                locations: vec!["miami".into()],
                ..Default::default()
            },
        };
        let page = backend.list_properties(&query).await.unwrap();
        // Miami, Miami Beach and the Design District loft
        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn detail_joins_owner_and_timeline() {
        let backend = MockBackend::new();
        let detail = backend.get_property("1").await.unwrap();
        assert_eq!(detail.owner.as_ref().unwrap().name, "Isabella Moreno");
        assert_eq!(detail.timeline().len(), 2);

        let missing = backend.get_property("404").await.unwrap_err();
        assert_eq!(missing.status(), 404);
    }
}
