//! PocketBase adapters for the record store and file URL contracts.
//!
//! - [`client`]: list endpoint and realtime subscription
//! - [`filter`]: filter-expression builder
//! - [`files`]: file URL resolution for avatars
//! - [`realtime`]: server-sent-events session with reconnect backoff

pub mod client;
pub mod files;
pub mod filter;
pub mod realtime;

pub use client::{PocketBaseClient, USER_FIELDS};
pub use files::PocketBaseFiles;
pub use realtime::RealtimeSettings;
