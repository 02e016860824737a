use axum::routing::{get, put};
use axum::Router;

use super::protected;
use crate::controllers::admin;
use crate::middleware::ADMIN_ROLES;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/:id", put(admin::update_user).delete(admin::delete_user))
        .route("/roles", get(admin::list_roles))
        .route("/patients", get(admin::list_patients).post(admin::create_patient))
        .route("/patients/:id", put(admin::update_patient))
        .route("/quirofanos", get(admin::list_rooms).post(admin::create_room))
        .route(
            "/quirofanos/categorias",
            get(admin::list_room_categories).post(admin::create_room_category),
        )
        .route("/quirofanos/:id", put(admin::update_room))
        .route(
            "/entidades-suministradoras",
            get(admin::list_entities).post(admin::create_entity),
        )
        .route(
            "/tipos-cirugia",
            get(admin::list_surgery_types).post(admin::create_surgery_type),
        )
        .route(
            "/especialidades",
            get(admin::list_specialties).post(admin::create_specialty),
        )
        .route("/medicos", get(admin::list_doctors).post(admin::create_doctor))
        .route("/reports/cirugia/:id", get(admin::surgery_report))
        .route("/reports/cirugias", get(admin::surgeries_report))
        .route("/estadisticas", get(admin::statistics));

    protected(routes, state, ADMIN_ROLES)
}
