use axum::routing::{get, post};
use axum::Router;

use super::protected;
use crate::controllers::instrumentador as tech;
use crate::middleware::INSTRUMENTATION_ROLES;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/cirugias", get(tech::list_assigned))
        .route(
            "/cirugias/:id/solicitar-instrumentos",
            post(tech::request_instruments),
        )
        .route("/cirugias/:id/iniciar", post(tech::start_surgery))
        .route("/cirugias/:id/finalizar", post(tech::finish_surgery))
        .route("/cirugias/:id/conteo-inicial", post(tech::open_initial_count))
        .route(
            "/cirugias/:id/conteo-inicial/finalizar",
            post(tech::close_initial_count),
        )
        .route("/cirugias/:id/solicitar-adicional", post(tech::request_additional))
        .route("/cirugias/:id/reportar-danado", post(tech::report_damaged))
        .route("/cirugias/:id/conteo-final", post(tech::open_final_count))
        .route(
            "/cirugias/:id/conteo-final/finalizar",
            post(tech::close_final_count),
        )
        .route("/cirugias/:id/reportar-incidente", post(tech::report_incident))
        .route("/cirugias/:id/tiempo", get(tech::surgery_time))
        .route(
            "/cirugias/:id/instrumentos-actuales",
            get(tech::current_instruments),
        );

    protected(routes, state, INSTRUMENTATION_ROLES)
}
