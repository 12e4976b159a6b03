use axum::{
    http::Method,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod middleware;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Every route requires a valid bearer token; role checks live in the
    // handlers.
    let v1 = Router::new()
        .route("/products", post(products::create_product).get(products::list_products))
        .route(
            "/products/{id}",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::deactivate_product),
        )
        .route("/products/{id}/stock", post(products::adjust_stock))
        .route("/orders", post(orders::create_order).get(orders::list_my_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/orders/{id}/cancel", post(orders::cancel_order))
        .route("/orders/{id}/pay", post(payments::pay_order))
        .route("/payments/{id}", get(payments::get_payment))
        .route("/payments/{id}/refund", post(payments::refund_payment))
        .route("/payments/{id}/cancel", post(payments::cancel_payment))
        .route("/notifications", get(notifications::my_feed))
        .route("/admin/orders", get(orders::list_all_orders))
        .route("/admin/notifications", post(notifications::send))
        .route("/admin/notifications/{id}/sent", post(notifications::mark_sent))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .nest("/v1", v1)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
