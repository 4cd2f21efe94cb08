use axum::{routing::get, Router};

use crate::api::handlers::{self, AppState};
use crate::api::payment_handlers;
use crate::config::ApiConfig;

pub fn create_router(api: &ApiConfig) -> Router<AppState> {
    let payments = Router::new()
        .route(
            "/payments",
            get(payment_handlers::list_payments).post(payment_handlers::create_payment),
        )
        .route(
            "/payments/:id",
            get(payment_handlers::get_payment)
                .put(payment_handlers::update_payment)
                .delete(payment_handlers::delete_payment),
        );

    let mut router = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Payments API, under the API version
        .nest(&format!("/{}", api.version), payments);

    // Destructive admin endpoints are opt-in
    if api.admin {
        router = router.route(
            "/admin/repo",
            get(handlers::get_repo_info).delete(handlers::delete_repo),
        );
    }

    router
}
