//! Server-Sent Events (SSE) stream of Session updates.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use carhub_app::mailbox::mailbox;
use carhub_app::ports::{CommandSink, Persistence};
use carhub_domain::topic::Topic;

use crate::state::AppState;

/// `GET /session/stream` — every notified Session write as a JSON
/// `data:` frame.
///
/// The stream registers its own wildcard mailbox; once the client goes
/// away the store forgets it on the next publish.
pub async fn stream<P, C>(
    State(state): State<AppState<P, C>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>
where
    P: Persistence + 'static,
    C: CommandSink + 'static,
{
    let (tx, rx) = mailbox();
    state.session.subscribe(Topic::wildcard(), tx);

    let events = ReceiverStream::new(rx).filter_map(|message| {
        match serde_json::to_string(&message) {
            Ok(json) => Some(Ok(Event::default().event(message.topic.as_str()).data(json))),
            Err(err) => {
                tracing::warn!(%err, topic = %message.topic, "failed to serialize message for SSE stream");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
