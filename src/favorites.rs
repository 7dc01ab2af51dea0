use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::Property;
use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the favorites list
pub const FAVORITES_KEY: &str = "million_favorites";

/// Locally saved listings, stored as a JSON array of property snapshots.
///
/// Never synced with the backend. Entries are unique by property id and keep
/// the order they were added in.
#[derive(Clone)]
pub struct Favorites {
    store: Arc<dyn KeyValueStore>,
}

impl Favorites {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the saved list. Unreadable content is discarded and the key cleared.
    pub fn list(&self) -> Result<Vec<Property>, StorageError> {
        let raw = match self.store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(Vec::new()),
            Err(StorageError::Corrupt(_)) => {
                warn!("Discarding unreadable favorites file");
                self.store.remove(FAVORITES_KEY)?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_str::<Vec<Property>>(&raw) {
            Ok(mut items) => {
                let mut seen = std::collections::HashSet::new();
                items.retain(|p| seen.insert(p.id.clone()));
                Ok(items)
            }
            Err(e) => {
                warn!("Discarding corrupted favorites: {}", e);
                self.store.remove(FAVORITES_KEY)?;
                Ok(Vec::new())
            }
        }
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        Ok(self.list()?.len())
    }

    pub fn is_favorite(&self, property_id: &str) -> Result<bool, StorageError> {
        Ok(self.list()?.iter().any(|p| p.id == property_id))
    }

    /// Returns false when the property was already saved
    pub fn add(&self, property: &Property) -> Result<bool, StorageError> {
        let mut items = self.list()?;
        if items.iter().any(|p| p.id == property.id) {
            return Ok(false);
        }
        items.push(property.clone());
        self.save(&items)?;
        debug!(id = %property.id, "Added favorite");
        Ok(true)
    }

    /// Returns false when the property was not saved
    pub fn remove(&self, property_id: &str) -> Result<bool, StorageError> {
        let mut items = self.list()?;
        let before = items.len();
        items.retain(|p| p.id != property_id);
        if items.len() == before {
            return Ok(false);
        }
        self.save(&items)?;
        debug!(id = property_id, "Removed favorite");
        Ok(true)
    }

    /// Remove if present, add otherwise. Returns the new membership.
    pub fn toggle(&self, property: &Property) -> Result<bool, StorageError> {
        if self.remove(&property.id)? {
            Ok(false)
        } else {
            self.add(property)
        }
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(FAVORITES_KEY)
    }

    fn save(&self, items: &[Property]) -> Result<(), StorageError> {
        let json = serde_json::to_string(items)?;
        self.store.set(FAVORITES_KEY, &json)
    }
}
