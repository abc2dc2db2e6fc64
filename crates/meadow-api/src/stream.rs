//! `GET /contacts/stream`: the filtered view as server-sent events.
//!
//! The first event carries the current list; each later event carries the
//! list after a change. Every event is a complete JSON array, so a client
//! that misses events only needs the latest one.

use std::{convert::Infallible, sync::Arc};

use axum::{
  extract::State,
  response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{Stream, stream};
use meadow_core::store::ContactStore;
use meadow_state::ContactPublisher;

/// `GET /contacts/stream`
pub async fn handler<S: ContactStore + 'static>(
  State(publisher): State<Arc<ContactPublisher<S>>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
  let view = publisher.watch_filtered().await;
  tracing::debug!("contact stream opened");

  let events = stream::unfold((view, true), |(mut view, first)| async move {
    let contacts = if first { view.current() } else { view.changed().await? };
    let event = match Event::default().event("contacts").json_data(&contacts) {
      Ok(event) => event,
      Err(e) => {
        tracing::warn!(error = %e, "failed to encode contact stream event");
        Event::default().event("error").data(e.to_string())
      }
    };
    Some((Ok::<_, Infallible>(event), (view, false)))
  });

  Sse::new(events).keep_alive(KeepAlive::default())
}
