//! HTTP surface: router, shared state and handlers.

pub mod carts;
pub mod collections;
pub mod customers;
pub mod dto;
pub mod error;
pub mod extract;
pub mod orders;
pub mod products;
pub mod promotions;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::notify::OrderHooks;
use crate::ordering::OrderService;
use crate::repository::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, hooks: OrderHooks) -> Self {
        let orders = OrderService::new(Arc::clone(&store), hooks);
        Self { store, orders }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .route("/products/", get(products::list_products).post(products::create_product))
        .route(
            "/products/:id/",
            get(products::get_product)
                .put(products::update_product)
                .patch(products::patch_product)
                .delete(products::delete_product),
        )
        .route("/products/:id/reviews/", get(products::list_reviews).post(products::create_review))
        .route(
            "/products/:id/reviews/:review_id/",
            get(products::get_review).put(products::update_review).delete(products::delete_review),
        )
        .route("/products/:id/images/", get(products::list_images).post(products::add_image))
        .route("/products/:id/images/:image_id/", get(products::get_image).delete(products::delete_image))
        .route("/collections/", get(collections::list_collections).post(collections::create_collection))
        .route(
            "/collections/:id/",
            get(collections::get_collection)
                .put(collections::update_collection)
                .delete(collections::delete_collection),
        )
        .route("/promotions/", get(promotions::list_promotions).post(promotions::create_promotion))
        .route("/promotions/:id/", get(promotions::get_promotion).delete(promotions::delete_promotion))
        .route("/carts/", post(carts::create_cart))
        .route("/carts/:id/", get(carts::get_cart).delete(carts::delete_cart))
        .route("/carts/:id/items/", get(carts::list_items).post(carts::add_item))
        .route(
            "/carts/:id/items/:item_id/",
            get(carts::get_item).patch(carts::update_item).delete(carts::delete_item),
        )
        .route("/customers/", get(customers::list_customers).post(customers::create_customer))
        .route("/customers/me/", get(customers::get_me).put(customers::update_me))
        .route(
            "/customers/:id/",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/customers/:id/history/", get(customers::history))
        .route("/customers/:id/addresses/", get(customers::list_addresses).post(customers::add_address))
        .route("/customers/:id/addresses/:address_id/", delete(customers::delete_address))
        .route("/orders/", get(orders::list_orders).post(orders::create_order))
        .route(
            "/orders/:id/",
            get(orders::get_order).patch(orders::update_order).delete(orders::delete_order),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
