//! The reactive layer of the Meadow contact store.
//!
//! Turns any [`meadow_core::store::ContactStore`] into live, sorted and
//! filtered views:
//!
//! ```text
//! store revision ─► ContactRepository (sort) ─► FilterPipeline ◄─ SearchQuery
//!                                                     │
//!                                                     ▼
//!                                   ContactPublisher ─► subscribers
//! ```
//!
//! Mutations travel the other way: publisher → repository → store, and the
//! resulting revision drives the forward path again. Every mutation returns a
//! [`Mutation`] that resolves to its outcome.
//!
//! Everything here spawns tokio tasks and must run inside a tokio runtime.

pub mod error;
pub mod feed;
pub mod filter;
pub mod mutation;
pub mod publisher;
pub mod query;
pub mod repository;

pub use error::{Error, Result};
pub use feed::{Feed, LiveView, Subscription};
pub use filter::FilterPipeline;
pub use mutation::Mutation;
pub use publisher::{ContactPublisher, PublisherConfig, StreamStatus};
pub use query::SearchQuery;
pub use repository::ContactRepository;

#[cfg(test)]
mod tests;
