use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::controllers::auth;
use crate::middleware::authenticate;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let session = Router::new()
        .route("/profile", get(auth::profile))
        .route("/logout", post(auth::logout))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(session)
}
