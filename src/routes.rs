// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    // --- Estoque ---
    let inventory_routes = Router::new()
        .route("/medications/{id}/entries", post(handlers::inventory::register_entry))
        .route("/medications/{id}/exits", post(handlers::inventory::register_exit))
        .route("/medications/{id}/stock", get(handlers::inventory::get_stock))
        .route("/lots/{id}/adjustments", post(handlers::inventory::register_adjustment))
        .route("/lots/{id}/movements", get(handlers::inventory::get_lot_movements))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // --- Clínico ---
    let clinical_routes = Router::new()
        .route(
            "/consultations/{id}/complete",
            patch(handlers::consultations::complete_consultation),
        )
        .route(
            "/consultations/{id}/prescriptions",
            post(handlers::consultations::register_prescription),
        )
        .route(
            "/consultations/{id}/prescription",
            get(handlers::consultations::get_consultation_prescription),
        )
        .route(
            "/prescriptions/{id}/complete",
            post(handlers::prescriptions::complete_prescription),
        )
        .route(
            "/prescriptions/{id}/cancel",
            post(handlers::prescriptions::cancel_prescription),
        )
        .route("/vaccinations", post(handlers::vaccinations::apply_vaccination))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(handlers::health::health))
        .nest("/api/inventory", inventory_routes)
        .nest("/api", clinical_routes)
        .with_state(app_state)
}
