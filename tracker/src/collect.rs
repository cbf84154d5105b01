use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::Json;
use metrics::counter;
use tracing::instrument;

use crate::api::{CollectResponse, CollectResponseCode};
use crate::event::TrackedEvent;
use crate::router;

/// Fire-and-forget collection endpoint: every query parameter becomes one
/// field of the buffered event. Always answers OK; producers never learn
/// about processing or indexing outcomes.
#[instrument(skip_all)]
pub async fn hit(
    state: State<router::State>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<CollectResponse> {
    counter!("tracker_events_received_total").increment(1);
    state.buffer.add(TrackedEvent::from_params(params));

    Json(CollectResponse {
        status: CollectResponseCode::Ok,
    })
}
