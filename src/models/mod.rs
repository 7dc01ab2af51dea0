//! Domain types shared by the API client, the state holders and the CLI.

mod lead;
mod notification;
mod owner;
mod page;
mod property;

pub use lead::{Lead, LeadStatus, NewLead};
pub use notification::Notification;
pub use owner::{NewOwner, Owner, OwnerRole};
pub use page::Page;
pub use property::{
    NewProperty, Property, PropertyDetail, PropertyImage, PropertyStatus, PropertyTrace,
    PropertyType, PropertyUpdate,
};

/// Rejected input, raised before anything is sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
