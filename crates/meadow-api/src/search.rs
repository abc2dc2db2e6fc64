//! Handlers for `/search`: the query that filters `GET /contacts` and the
//! contact stream.

use std::sync::Arc;

use axum::{Json, extract::State};
use meadow_core::store::ContactStore;
use meadow_state::ContactPublisher;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchBody {
  #[serde(default)]
  pub query: String,
}

/// `GET /search`
pub async fn get_query<S: ContactStore + 'static>(
  State(publisher): State<Arc<ContactPublisher<S>>>,
) -> Json<SearchBody> {
  Json(SearchBody { query: publisher.search_query() })
}

/// `PUT /search`: body: `{"query":"mad"}`. An empty query clears the filter.
pub async fn set_query<S: ContactStore + 'static>(
  State(publisher): State<Arc<ContactPublisher<S>>>,
  Json(body): Json<SearchBody>,
) -> Json<SearchBody> {
  publisher.set_search_query(body.query.clone());
  Json(body)
}
