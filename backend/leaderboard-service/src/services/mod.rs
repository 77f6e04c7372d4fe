pub mod auth;
pub mod refresh;
pub mod upstream;

pub use auth::{AuthError, ClientCredentialsTokenSupplier, TokenSupplier};
pub use refresh::{CacheSlot, RefreshError, RefreshOrchestrator, RefreshReport, SlotKind};
pub use upstream::{HttpSocialGraphClient, SocialGraphSource, UpstreamError};
