use std::future::ready;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::buffer::EventBuffer;
use crate::collect;
use crate::prometheus::{setup_metrics_recorder, track_metrics};

#[derive(Clone)]
pub struct State {
    pub buffer: Arc<EventBuffer>,
}

async fn index() -> &'static str {
    "tracker"
}

pub fn router(buffer: Arc<EventBuffer>, metrics: bool) -> Router {
    let state = State { buffer };

    let router = Router::new()
        .route("/", get(index))
        .route("/tracker/hit", get(collect::hit).post(collect::hit))
        .route("/tracker/hit/", get(collect::hit).post(collect::hit))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Don't install metrics unless asked to
    // Installing a global recorder when tracker is used as a library (during tests etc)
    // does not work well.
    if metrics {
        let recorder_handle = setup_metrics_recorder();
        router.route("/metrics", get(move || ready(recorder_handle.render())))
    } else {
        router
    }
}
