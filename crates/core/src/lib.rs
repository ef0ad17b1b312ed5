pub mod admission;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod routing;
pub mod store;

pub use admission::{Admission, RateLimitPolicy, RateLimiter};
pub use cache::BoundedKeyedCache;
pub use domain::conversation::{ConversationKey, Role, Turn, UserId};
pub use domain::event::{ConversationKind, InboundEvent};
pub use errors::{CompletionError, DeliveryError};
pub use routing::{GroupTrigger, ReplyRouter};
pub use store::ConversationStore;
