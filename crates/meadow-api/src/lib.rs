//! JSON REST API for Meadow.
//!
//! Exposes an axum [`Router`] over a shared [`ContactPublisher`], so HTTP
//! clients see the same live views and the same search query as any other
//! subscriber of that publisher.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", meadow_api::api_router(publisher.clone()))
//! ```

pub mod contacts;
pub mod error;
pub mod search;
pub mod stream;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use meadow_core::store::ContactStore;
use meadow_state::ContactPublisher;

pub use error::ApiError;

/// Build a fully-materialised API router for `publisher`.
pub fn api_router<S>(publisher: Arc<ContactPublisher<S>>) -> Router<()>
where
  S: ContactStore + 'static,
{
  Router::new()
    // Contacts
    .route("/contacts", get(contacts::list::<S>).post(contacts::create::<S>))
    .route("/contacts/all", get(contacts::list_all::<S>))
    .route("/contacts/stream", get(stream::handler::<S>))
    .route(
      "/contacts/{id}",
      get(contacts::get_one::<S>)
        .put(contacts::replace::<S>)
        .delete(contacts::delete_one::<S>),
    )
    .route("/contacts/{id}/favorite", post(contacts::toggle_favorite::<S>))
    .route("/contacts/{id}/block", post(contacts::toggle_blocked::<S>))
    // Search
    .route("/search", get(search::get_query::<S>).put(search::set_query::<S>))
    .with_state(publisher)
}
