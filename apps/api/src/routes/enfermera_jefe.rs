use axum::routing::{get, put};
use axum::Router;

use super::protected;
use crate::controllers::enfermera_jefe as nurse;
use crate::middleware::HEAD_NURSE_ROLES;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/cirugias", get(nurse::list_surgeries).post(nurse::create_surgery))
        .route(
            "/cirugias/:id",
            get(nurse::get_surgery)
                .put(nurse::update_surgery)
                .delete(nurse::cancel_surgery),
        )
        .route("/cirugias/:id/posponer", put(nurse::postpone_surgery))
        .route("/cirugias/:id/iniciar", put(nurse::start_surgery))
        .route("/cirugias/:id/finalizar", put(nurse::finish_surgery))
        .route("/personal-disponible", get(nurse::available_staff))
        .route("/quirofanos-disponibles", get(nurse::available_rooms));

    protected(routes, state, HEAD_NURSE_ROLES)
}
