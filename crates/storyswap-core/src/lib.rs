//! Storyswap Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - WebSockets
//! - Runtime specifics
//!
//! All types here represent the core domain of the Storyswap storefront
//! client: sessions, conversations, messages, and the client-side
//! message store.

pub mod error;
pub mod ids;
pub mod message;
pub mod phase;
pub mod product;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::{ConversationId, CorrelationId, MessageId, ProductId, UserId};
pub use message::Message;
pub use phase::ConversationPhase;
pub use product::{MatchEntry, MatchList, Product, Seller};
pub use session::{Role, Session};
pub use store::MessageStore;
