//! Async client library for the Storyswap backend.
//!
//! Provides the REST client, the live WebSocket channel, and the
//! conversation runtime that composes session resolution, conversation
//! initialization, the message store, the live channel, the poll loop,
//! and the composer into one handle.

pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod live;
pub mod session;
pub mod wire;

pub use config::ClientConfig;
pub use conversation::{ConversationApi, ConversationHandle, LiveConnector};
pub use error::ClientError;
pub use http::{ApiClient, LoginResponse, RegisterRequest, UserProfile};
pub use session::{ApiSessionProvider, SessionProvider};
pub use wire::{ClientEvent, ServerEvent};
