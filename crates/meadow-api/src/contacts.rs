//! Handlers for `/contacts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/contacts` | Filtered by the current search query |
//! | `GET`    | `/contacts/all` | Every contact, unfiltered |
//! | `POST`   | `/contacts` | Body: [`ContactBody`]; 201 with the new contact |
//! | `GET`    | `/contacts/{id}` | 404 if not found |
//! | `PUT`    | `/contacts/{id}` | Full replacement; 404 if not found, 409 if deleted |
//! | `DELETE` | `/contacts/{id}` | 204, also when nothing was there |
//! | `POST`   | `/contacts/{id}/favorite` | Flip `isFavorite` |
//! | `POST`   | `/contacts/{id}/block` | Flip `isBlocked` |
//!
//! Reads go to the store directly so a response always reflects every write
//! that completed before it. Writes respond once the store has applied them.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use meadow_core::{Contact, ContactId, store::ContactStore};
use meadow_state::{ContactPublisher, filter};
use serde::Deserialize;

use crate::error::ApiError;

type Publisher<S> = State<Arc<ContactPublisher<S>>>;

// ─── Request bodies ───────────────────────────────────────────────────────────

/// Every editable field of a contact. Blank optional fields are stored as
/// absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBody {
  #[serde(default)]
  pub first_name:  String,
  #[serde(default)]
  pub last_name:   Option<String>,
  #[serde(default)]
  pub phone:       String,
  #[serde(default)]
  pub notes:       Option<String>,
  #[serde(default)]
  pub is_favorite: bool,
  #[serde(default)]
  pub is_blocked:  bool,
}

impl ContactBody {
  fn into_contact(self, id: ContactId) -> Contact {
    let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
    Contact {
      id,
      first_name: self.first_name,
      last_name: non_blank(self.last_name),
      phone: self.phone,
      notes: non_blank(self.notes),
      is_favorite: self.is_favorite,
      is_blocked: self.is_blocked,
    }
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /contacts`
pub async fn list<S: ContactStore + 'static>(
  State(publisher): Publisher<S>,
) -> Result<Json<Vec<Contact>>, ApiError> {
  let contacts = publisher.repository().snapshot().await?;
  Ok(Json(filter::apply(&contacts, &publisher.search_query())))
}

/// `GET /contacts/all`
pub async fn list_all<S: ContactStore + 'static>(
  State(publisher): Publisher<S>,
) -> Result<Json<Vec<Contact>>, ApiError> {
  Ok(Json(publisher.repository().snapshot().await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /contacts`
pub async fn create<S: ContactStore + 'static>(
  State(publisher): Publisher<S>,
  Json(body): Json<ContactBody>,
) -> Result<impl IntoResponse, ApiError> {
  let contact = body.into_contact(ContactId::new());
  contact.validate()?;
  publisher.create_contact(contact.clone()).await?;
  Ok((StatusCode::CREATED, Json(contact)))
}

// ─── Single contact ───────────────────────────────────────────────────────────

async fn lookup<S: ContactStore + 'static>(
  publisher: &ContactPublisher<S>,
  id: ContactId,
) -> Result<Contact, ApiError> {
  publisher
    .repository()
    .store()
    .get(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("contact {id} not found")))
}

/// `GET /contacts/{id}`
pub async fn get_one<S: ContactStore + 'static>(
  State(publisher): Publisher<S>,
  Path(id): Path<ContactId>,
) -> Result<Json<Contact>, ApiError> {
  Ok(Json(lookup(&publisher, id).await?))
}

/// `PUT /contacts/{id}`
pub async fn replace<S: ContactStore + 'static>(
  State(publisher): Publisher<S>,
  Path(id): Path<ContactId>,
  Json(body): Json<ContactBody>,
) -> Result<Json<Contact>, ApiError> {
  let contact = body.into_contact(id);
  contact.validate()?;
  publisher.update_contact(contact.clone()).await?;
  Ok(Json(contact))
}

/// `DELETE /contacts/{id}`
pub async fn delete_one<S: ContactStore + 'static>(
  State(publisher): Publisher<S>,
  Path(id): Path<ContactId>,
) -> Result<StatusCode, ApiError> {
  publisher.delete_contact_by_id(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Toggles ──────────────────────────────────────────────────────────────────

/// `POST /contacts/{id}/favorite`
pub async fn toggle_favorite<S: ContactStore + 'static>(
  State(publisher): Publisher<S>,
  Path(id): Path<ContactId>,
) -> Result<Json<Contact>, ApiError> {
  let updated = lookup(&publisher, id).await?.toggled_favorite();
  publisher.update_contact(updated.clone()).await?;
  Ok(Json(updated))
}

/// `POST /contacts/{id}/block`
pub async fn toggle_blocked<S: ContactStore + 'static>(
  State(publisher): Publisher<S>,
  Path(id): Path<ContactId>,
) -> Result<Json<Contact>, ApiError> {
  let updated = lookup(&publisher, id).await?.toggled_blocked();
  publisher.update_contact(updated.clone()).await?;
  Ok(Json(updated))
}
