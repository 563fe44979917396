//! stereogrid-catalog library - song catalog HTTP service
//!
//! CRUD over the song catalog plus a thin proxy to the Spotify Web API.

use axum::routing::{get, MethodRouter};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use stereogrid_common::api::AuthPolicy;
use stereogrid_common::db::SongStore;
use stereogrid_common::time::Clock;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod pagination;
pub mod spotify;

use cache::ResponseCache;
use spotify::SpotifyClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SongStore,
    /// List/detail response cache
    pub cache: Arc<ResponseCache>,
    pub spotify: Arc<SpotifyClient>,
    pub auth: Arc<AuthPolicy>,
    /// Source of "now" for timestamps, the year bound and cache expiry
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        store: SongStore,
        spotify: SpotifyClient,
        auth: AuthPolicy,
        clock: Arc<dyn Clock>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache: Arc::new(ResponseCache::new(cache_ttl, clock.clone())),
            spotify: Arc::new(spotify),
            auth: Arc::new(auth),
            clock,
        }
    }
}

/// Build application router
///
/// Song routes are accepted with and without the trailing slash. `/health`
/// is the only unauthenticated route. Unrouted paths and methods still
/// answer with an error envelope, and every envelope is stamped from the
/// state's clock on the way out.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::post;

    let songs: Router<AppState> = Router::new()
        .route("/songs", collection_routes())
        .route("/songs/", collection_routes())
        .route("/songs/:id", member_routes())
        .route("/songs/:id/", member_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_role_for_method,
        ));

    let search: Router<AppState> = Router::new()
        .route("/search", get(api::search).fallback(api::method_not_allowed))
        .route(
            "/validate-url",
            post(api::validate_url).fallback(api::method_not_allowed),
        )
        .route("/token", get(api::token).fallback(api::method_not_allowed))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_reader,
        ));

    Router::new()
        .merge(songs)
        .merge(search)
        .merge(api::health_routes())
        .fallback(api::route_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::render_envelope,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn collection_routes() -> MethodRouter<AppState> {
    get(api::list_songs)
        .post(api::create_song)
        .fallback(api::method_not_allowed)
}

fn member_routes() -> MethodRouter<AppState> {
    get(api::get_song)
        .put(api::update_song)
        .patch(api::update_song)
        .delete(api::delete_song)
        .fallback(api::method_not_allowed)
}
