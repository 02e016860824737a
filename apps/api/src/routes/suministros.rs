use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;

use super::protected;
use crate::controllers::suministros as supply;
use crate::middleware::{guard, require_roles, CENTRAL_ROLES, SUPPLY_ROLES};
use crate::state::AppState;

/// Sterilization is reserved to the central desk
fn central() -> Router<AppState> {
    Router::new()
        .route(
            "/central/esterilizacion",
            get(supply::sterilization_history).post(supply::register_sterilization),
        )
        .route(
            "/central/esterilizacion/:id/completar",
            put(supply::complete_sterilization),
        )
        .route_layer(from_fn_with_state(guard(CENTRAL_ROLES), require_roles))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/stock", get(supply::list_stock).post(supply::create_stock))
        .route("/stock/en-uso", get(supply::list_stock_in_use))
        .route("/stock/:id", put(supply::update_stock))
        .route("/entregas", post(supply::create_delivery))
        .route("/entregas/registro", post(supply::register_receipt))
        .route(
            "/cirugias/:id/stock",
            get(supply::list_allocated_stock).post(supply::allocate_stock),
        )
        .route(
            "/cirugias/:id/stock/adicional",
            post(supply::allocate_additional_stock),
        )
        .route("/notificaciones", get(supply::list_notifications))
        .route("/notificaciones/:id", put(supply::mark_notification_read))
        .route("/procedimientos-concurrentes", get(supply::concurrent_procedures))
        .route("/items", get(supply::list_items).post(supply::create_item))
        .route(
            "/categorias-items",
            get(supply::list_item_categories).post(supply::create_item_category),
        )
        .merge(central());

    protected(routes, state, SUPPLY_ROLES)
}
