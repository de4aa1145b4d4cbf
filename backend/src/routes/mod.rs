//! Route definitions for the Pharmacy Operations Assistant

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/patients", patient_routes())
        .nest("/medications", medication_routes())
        .nest("/prescriptions", prescription_routes())
        .nest("/stock", stock_routes())
        .nest("/notifications", notification_routes())
}

/// Product catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/allocation", get(handlers::allocate_batch))
        .route("/:product_id/availability", get(handlers::check_availability))
}

/// Patient registry routes
fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_patients).post(handlers::create_patient))
        .route(
            "/:patient_id",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
}

/// Medication record routes
fn medication_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_medications).post(handlers::create_medication))
        .route(
            "/:medication_id",
            get(handlers::get_medication)
                .put(handlers::update_medication)
                .delete(handlers::delete_medication),
        )
        .route("/:medication_id/activate", post(handlers::activate_medication))
        .route("/:medication_id/hold", post(handlers::hold_medication))
        .route("/:medication_id/discontinue", post(handlers::discontinue_medication))
        .route("/:medication_id/complete", post(handlers::complete_medication))
}

/// Prescription routes
fn prescription_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_prescriptions).post(handlers::create_prescription))
        .route(
            "/:prescription_id",
            get(handlers::get_prescription)
                .put(handlers::update_prescription)
                .delete(handlers::delete_prescription),
        )
        .route("/:prescription_id/complete", post(handlers::complete_prescription))
        .route("/:prescription_id/cancel", post(handlers::cancel_prescription))
}

/// Stock batch routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/batches", get(handlers::list_batches).post(handlers::create_batch))
        .route("/batches/expiring", get(handlers::list_expiring_batches))
        .route("/batches/low", get(handlers::list_low_stock_batches))
        .route(
            "/batches/:batch_id",
            get(handlers::get_batch).delete(handlers::delete_batch),
        )
        .route("/batches/:batch_id/deduct", post(handlers::deduct_quantity))
        .route("/batches/:batch_id/add", post(handlers::add_quantity))
        .route("/batches/:batch_id/expire", post(handlers::mark_expired))
        .route("/batches/:batch_id/damage", post(handlers::mark_damaged))
        .route("/batches/:batch_id/recall", post(handlers::mark_recalled))
        .route("/batches/:batch_id/reserve", post(handlers::mark_reserved))
        .route("/batches/:batch_id/release", post(handlers::release_reservation))
}

/// Notification routes
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_notifications).post(handlers::create_notification),
        )
        .route("/:notification_id", get(handlers::get_notification))
        .route("/:notification_id/schedule", put(handlers::schedule_notification))
        .route("/:notification_id/send", post(handlers::send_notification))
        .route("/:notification_id/retry", post(handlers::retry_notification))
        .route("/:notification_id/cancel", post(handlers::cancel_notification))
        .route("/:notification_id/delivered", post(handlers::mark_delivered))
        .route("/:notification_id/read", post(handlers::mark_read))
        .route("/send-pending", post(handlers::send_pending_notifications))
        // Triggers
        .route("/triggers/medications", post(handlers::trigger_medication_warnings))
        .route("/triggers/prescriptions", post(handlers::trigger_prescription_warnings))
        .route("/triggers/stock", post(handlers::trigger_stock_warnings))
        .route("/triggers/low-stock", post(handlers::trigger_low_stock_warnings))
        .route("/triggers/all", post(handlers::run_all_triggers))
}
