pub mod auth;
pub mod client;
pub mod error;
pub mod notifications;
pub mod owners;
pub mod properties;
pub mod system;
pub mod traits;

pub use auth::{AuthResponse, AuthUser, RegisterRequest, TokenPair};
pub use client::{ApiClient, ClientError, CORRELATION_ID_HEADER};
pub use error::{ApiError, ApiResult, ProblemDetails};
pub use properties::{PropertyQuery, DEFAULT_PAGE_SIZE};
pub use system::{HealthStatus, NewWebhook, SiteStats, Webhook};
pub use traits::{NotificationRepository, OwnerRepository, PropertyRepository};
