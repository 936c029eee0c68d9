use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{admin, auth, client, driver, notifications, rating};
use crate::middleware::auth::{auth_middleware, require_admin, require_client, require_driver};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let driver_governor = create_role_governor(RateLimitedRole::Driver);
    let client_governor = create_role_governor(RateLimitedRole::Client);
    // Public routes are limited per IP with client-level limits
    let public_governor = create_public_governor();

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    let account_routes = Router::new()
        .route("/me", get(auth::me))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Trip catalogue
    let public_routes = Router::new()
        .route("/trips", get(client::list_trips))
        .route("/trips/{id}", get(client::get_trip))
        .layer(public_governor.clone());

    // Reached from the link in the trip completed email, no login
    let rating_routes = Router::new()
        .route(
            "/{reservation_id}",
            get(rating::get_rating_context).post(rating::submit_rating),
        )
        .layer(public_governor);

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        // Trips
        .route("/trips", get(admin::list_trips).post(admin::create_trip))
        .route("/trips/{id}", put(admin::update_trip).delete(admin::delete_trip))
        .route("/trips/{id}/complete", post(admin::complete_trip))
        .route("/trips/{id}/cancel", post(admin::cancel_trip))
        .route("/trips/{id}/relist", post(admin::relist_trip))
        // Reservations
        .route("/reservations", get(admin::list_reservations))
        .route("/reservations/{id}/confirm", post(admin::confirm_reservation))
        .route("/reservations/{id}/reject", post(admin::reject_reservation))
        .route("/reservations/{id}/assign-driver", post(admin::assign_driver))
        .route("/reservations/{id}/payment", put(admin::update_payment_status))
        // Drivers
        .route("/drivers", get(admin::list_drivers).post(admin::create_driver))
        .route("/drivers/{id}", put(admin::update_driver).delete(admin::delete_driver))
        .route("/drivers/{id}/activate", post(admin::activate_driver))
        .route("/drivers/{id}/deactivate", post(admin::deactivate_driver))
        // Users, ratings, email log
        .route("/users", get(admin::list_users))
        .route("/ratings", get(admin::list_ratings))
        .route("/email-logs", get(admin::list_email_logs))
        // Reports
        .route("/reports/export", get(admin::export_report))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let notification_routes = Router::new()
        .route("/send", post(notifications::send_email))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    let driver_routes = Router::new()
        .route("/trips", get(driver::my_trips))
        .route("/trips/{id}", get(driver::trip_detail))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Client routes (requires auth + client role)
    let client_routes = Router::new()
        .route("/", post(client::create_reservation).get(client::my_reservations))
        .route("/{id}", get(client::get_reservation))
        .layer(client_governor)
        .layer(middleware::from_fn(require_client))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes.merge(account_routes))
        .nest("/api", public_routes)
        .nest("/api/ratings", rating_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/notifications", notification_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api/reservations", client_routes)
        .with_state(state)
}
