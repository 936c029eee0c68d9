use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::driver::{self, Vehicle};
use crate::entities::reservation::{self, PaymentStatus};
use crate::entities::trip::{self, TripStatus, VehicleCategory};
use crate::entities::user::{self, UserRole};
use crate::entities::{email_log, rating};
use crate::error::{AppError, AppResult};
use crate::handlers::auth::hash_password;
use crate::reports::{build_report, to_xlsx};
use crate::services::coordinator::{self, TripTransition};
use crate::services::{find_driver, find_reservation, find_trip};
use crate::AppState;

// ============ Trip Management ============

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub estimated_duration_minutes: i32,
    pub price: f64,
    pub max_passengers: i32,
    pub vehicle_category: VehicleCategory,
}

impl CreateTripRequest {
    fn validate(&self) -> AppResult<()> {
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Origin and destination are required".to_string(),
            ));
        }
        if self.origin.trim().eq_ignore_ascii_case(self.destination.trim()) {
            return Err(AppError::BadRequest(
                "Origin and destination must be different".to_string(),
            ));
        }
        if self.departure_time <= Utc::now() {
            return Err(AppError::BadRequest(
                "Departure time must be in the future".to_string(),
            ));
        }
        validate_trip_numbers(
            self.estimated_duration_minutes,
            self.price,
            self.max_passengers,
        )
    }
}

fn validate_trip_numbers(duration: i32, price: f64, max_passengers: i32) -> AppResult<()> {
    if duration <= 0 {
        return Err(AppError::BadRequest(
            "Estimated duration must be positive".to_string(),
        ));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::BadRequest("Price must not be negative".to_string()));
    }
    if max_passengers <= 0 {
        return Err(AppError::BadRequest(
            "Max passengers must be positive".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct UpdateTripRequest {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub estimated_duration_minutes: Option<i32>,
    pub price: Option<f64>,
    pub max_passengers: Option<i32>,
    pub vehicle_category: Option<VehicleCategory>,
}

#[derive(Debug, Serialize)]
pub struct DriverInfo {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub vehicle: String,
}

impl From<&driver::Model> for DriverInfo {
    fn from(d: &driver::Model) -> Self {
        Self {
            id: d.id,
            name: d.name.clone(),
            phone: d.phone.clone(),
            vehicle: d.vehicle().describe(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TripResponse {
    #[serde(flatten)]
    pub trip: trip::Model,
    pub driver: Option<DriverInfo>,
    pub reservation_count: usize,
}

/// List all trips (admin)
pub async fn list_trips(State(state): State<AppState>) -> AppResult<Json<Vec<TripResponse>>> {
    let trips = trip::Entity::find()
        .order_by_asc(trip::Column::DepartureTime)
        .all(&state.db)
        .await?;
    let drivers = driver::Entity::find().all(&state.db).await?;
    let reservations = reservation::Entity::find().all(&state.db).await?;

    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for r in &reservations {
        *counts.entry(r.trip_id).or_default() += 1;
    }

    let responses = trips
        .into_iter()
        .map(|t| {
            let driver = t
                .driver_id
                .and_then(|id| drivers.iter().find(|d| d.id == id))
                .map(DriverInfo::from);
            TripResponse {
                reservation_count: counts.get(&t.id).copied().unwrap_or(0),
                driver,
                trip: t,
            }
        })
        .collect();

    Ok(Json(responses))
}

/// Create a new trip (admin)
pub async fn create_trip(
    State(state): State<AppState>,
    Json(payload): Json<CreateTripRequest>,
) -> AppResult<Json<trip::Model>> {
    payload.validate()?;

    let trip = trip::ActiveModel {
        id: Set(Uuid::new_v4()),
        origin: Set(payload.origin.trim().to_string()),
        destination: Set(payload.destination.trim().to_string()),
        departure_time: Set(payload.departure_time.into()),
        estimated_duration_minutes: Set(payload.estimated_duration_minutes),
        price: Set(payload.price),
        max_passengers: Set(payload.max_passengers),
        vehicle_category: Set(payload.vehicle_category),
        status: Set(TripStatus::Available),
        driver_id: Set(None),
        created_at: Set(Utc::now().into()),
    };

    let result = trip.insert(&state.db).await?;
    tracing::info!(trip_id = %result.id, origin = %result.origin, destination = %result.destination, "Trip created");
    Ok(Json(result))
}

/// Update trip details (admin). Status only changes through the transition endpoints.
pub async fn update_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTripRequest>,
) -> AppResult<Json<trip::Model>> {
    let trip = find_trip(&state.db, id).await?;

    if trip.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "Trip is {}, it can no longer be edited",
            trip.status.to_value()
        )));
    }

    validate_trip_numbers(
        payload
            .estimated_duration_minutes
            .unwrap_or(trip.estimated_duration_minutes),
        payload.price.unwrap_or(trip.price),
        payload.max_passengers.unwrap_or(trip.max_passengers),
    )?;

    let mut active: trip::ActiveModel = trip.into();

    if let Some(origin) = payload.origin.filter(|o| !o.trim().is_empty()) {
        active.origin = Set(origin.trim().to_string());
    }
    if let Some(destination) = payload.destination.filter(|d| !d.trim().is_empty()) {
        active.destination = Set(destination.trim().to_string());
    }
    if let Some(time) = payload.departure_time {
        active.departure_time = Set(time.into());
    }
    if let Some(minutes) = payload.estimated_duration_minutes {
        active.estimated_duration_minutes = Set(minutes);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(max) = payload.max_passengers {
        active.max_passengers = Set(max);
    }
    if let Some(category) = payload.vehicle_category {
        active.vehicle_category = Set(category);
    }

    let result = active.update(&state.db).await?;
    state.cache.trips.invalidate(&result.id);
    Ok(Json(result))
}

/// Delete a trip (admin)
pub async fn delete_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    coordinator::delete_trip(&state, id).await?;
    Ok(Json(serde_json::json!({ "message": "Trip deleted" })))
}

pub async fn complete_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TripTransition>> {
    Ok(Json(coordinator::complete_trip(&state, id).await?))
}

pub async fn cancel_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TripTransition>> {
    Ok(Json(coordinator::cancel_trip(&state, id).await?))
}

pub async fn relist_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<trip::Model>> {
    Ok(Json(coordinator::relist_trip(&state, id).await?))
}

// ============ Reservation Management ============

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    #[serde(flatten)]
    pub reservation: reservation::Model,
    pub passenger_name_list: Vec<String>,
    pub client_name: String,
    pub client_email: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: Option<DateTime<Utc>>,
}

/// List all reservations, newest first (admin)
pub async fn list_reservations(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ReservationResponse>>> {
    let reservations = reservation::Entity::find()
        .order_by_desc(reservation::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let trips = trip::Entity::find().all(&state.db).await?;
    let users = user::Entity::find().all(&state.db).await?;

    let responses = reservations
        .into_iter()
        .map(|r| {
            let trip = trips.iter().find(|t| t.id == r.trip_id);
            let client = users.iter().find(|u| u.id == r.user_id);
            ReservationResponse {
                passenger_name_list: r.passenger_name_list(),
                client_name: client.map(|u| u.name.clone()).unwrap_or_default(),
                client_email: client.map(|u| u.email.clone()).unwrap_or_default(),
                origin: trip.map(|t| t.origin.clone()).unwrap_or_default(),
                destination: trip.map(|t| t.destination.clone()).unwrap_or_default(),
                departure_time: trip.map(|t| t.departure_time.with_timezone(&Utc)),
                reservation: r,
            }
        })
        .collect();

    Ok(Json(responses))
}

pub async fn confirm_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<reservation::Model>> {
    Ok(Json(coordinator::confirm_reservation(&state, id).await?))
}

pub async fn reject_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TripTransition>> {
    Ok(Json(coordinator::reject_reservation(&state, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
}

/// Assign a driver to the trip of a confirmed reservation (admin)
pub async fn assign_driver(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<AssignDriverRequest>,
) -> AppResult<Json<TripTransition>> {
    Ok(Json(
        coordinator::assign_driver(&state, reservation_id, payload.driver_id).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
}

/// Record a payment or refund (admin)
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> AppResult<Json<reservation::Model>> {
    let reservation = find_reservation(&state.db, id).await?;

    let mut active: reservation::ActiveModel = reservation.into();
    active.payment_status = Set(payload.payment_status);
    let updated = active.update(&state.db).await?;

    state.cache.reservations.invalidate(&updated.id);
    tracing::info!(
        reservation_id = %updated.id,
        payment_status = payload.payment_status.label_es(),
        "Payment status updated"
    );
    Ok(Json(updated))
}

// ============ Driver Management ============

#[derive(Debug, Deserialize)]
pub struct DriverRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub license_number: String,
    pub license_type: String,
    pub years_experience: i32,
    pub vehicle: Vehicle,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// When set, a driver login is created with this password.
    pub password: Option<String>,
}

fn default_true() -> bool {
    true
}

impl DriverRequest {
    fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("license_number", &self.license_number),
            ("vehicle.plate", &self.vehicle.plate),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::BadRequest(format!("{field} is required")));
            }
        }
        if self.years_experience < 0 {
            return Err(AppError::BadRequest(
                "Years of experience must not be negative".to_string(),
            ));
        }
        if self.vehicle.capacity <= 0 {
            return Err(AppError::BadRequest(
                "Vehicle capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct DriverResponse {
    #[serde(flatten)]
    pub driver: driver::Model,
    pub vehicle_description: String,
    pub average_rating: Option<f64>,
    pub rating_count: usize,
}

/// List all drivers with their average overall rating (admin)
pub async fn list_drivers(State(state): State<AppState>) -> AppResult<Json<Vec<DriverResponse>>> {
    let drivers = driver::Entity::find()
        .order_by_asc(driver::Column::Name)
        .all(&state.db)
        .await?;
    let ratings = rating::Entity::find().all(&state.db).await?;

    let responses = drivers
        .into_iter()
        .map(|d| {
            let scores: Vec<f64> = ratings
                .iter()
                .filter(|r| r.driver_id == Some(d.id))
                .map(|r| f64::from(r.overall_rating))
                .collect();
            let average_rating = if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            };
            DriverResponse {
                vehicle_description: d.vehicle().describe(),
                rating_count: scores.len(),
                average_rating,
                driver: d,
            }
        })
        .collect();

    Ok(Json(responses))
}

/// Register a driver and optionally a login for them (admin)
pub async fn create_driver(
    State(state): State<AppState>,
    Json(payload): Json<DriverRequest>,
) -> AppResult<Json<driver::Model>> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    let txn = state.db.begin().await?;

    let user_id = match &payload.password {
        Some(password) => {
            if password.len() < 8 {
                return Err(AppError::BadRequest(
                    "Password must be at least 8 characters".to_string(),
                ));
            }
            let existing = user::Entity::find()
                .filter(user::Column::Email.eq(&email))
                .one(&txn)
                .await?;
            if existing.is_some() {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }

            let login = user::ActiveModel {
                id: Set(Uuid::new_v4()),
                email: Set(email.clone()),
                password_hash: Set(hash_password(password)?),
                name: Set(payload.name.trim().to_string()),
                phone: Set(Some(payload.phone.trim().to_string())),
                role: Set(UserRole::Driver),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
            Some(login.id)
        }
        None => None,
    };

    let mut driver = driver::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        email: Set(email),
        phone: Set(payload.phone.trim().to_string()),
        license_number: Set(payload.license_number.trim().to_string()),
        license_type: Set(payload.license_type.trim().to_string()),
        years_experience: Set(payload.years_experience),
        is_active: Set(payload.is_active),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    driver.set_vehicle(payload.vehicle);

    let driver = driver.insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(driver_id = %driver.id, has_login = user_id.is_some(), "Driver created");
    Ok(Json(driver))
}

/// Update a driver and their vehicle (admin)
pub async fn update_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverRequest>,
) -> AppResult<Json<driver::Model>> {
    payload.validate()?;
    let driver = find_driver(&state.db, id).await?;

    let mut active: driver::ActiveModel = driver.into();
    active.name = Set(payload.name.trim().to_string());
    active.email = Set(payload.email.trim().to_lowercase());
    active.phone = Set(payload.phone.trim().to_string());
    active.license_number = Set(payload.license_number.trim().to_string());
    active.license_type = Set(payload.license_type.trim().to_string());
    active.years_experience = Set(payload.years_experience);
    active.is_active = Set(payload.is_active);
    active.set_vehicle(payload.vehicle);

    let result = active.update(&state.db).await?;
    Ok(Json(result))
}

pub async fn activate_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<driver::Model>> {
    Ok(Json(coordinator::activate_driver(&state, id).await?))
}

pub async fn deactivate_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<driver::Model>> {
    Ok(Json(coordinator::deactivate_driver(&state, id).await?))
}

/// Delete a driver, unassigning them from their trips (admin)
pub async fn delete_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    coordinator::delete_driver(&state, id).await?;
    Ok(Json(serde_json::json!({ "message": "Driver deleted" })))
}

// ============ Users, Ratings & Email Log ============

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// List all users (admin)
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let responses = users
        .into_iter()
        .map(|u| UserResponse {
            id: u.id,
            email: u.email,
            name: u.name,
            phone: u.phone,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(Json(responses))
}

pub async fn list_ratings(State(state): State<AppState>) -> AppResult<Json<Vec<rating::Model>>> {
    let ratings = rating::Entity::find()
        .order_by_desc(rating::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(ratings))
}

/// Delivery history of transactional emails, newest first
pub async fn list_email_logs(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<email_log::Model>>> {
    let logs = email_log::Entity::find()
        .order_by_desc(email_log::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(logs))
}

// ============ Reports ============

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Download reservations, trips and drivers as one workbook (admin)
pub async fn export_report(State(state): State<AppState>) -> AppResult<Response> {
    let trips = trip::Entity::find()
        .order_by_asc(trip::Column::DepartureTime)
        .all(&state.db)
        .await?;
    let reservations = reservation::Entity::find()
        .order_by_desc(reservation::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let drivers = driver::Entity::find()
        .order_by_asc(driver::Column::Name)
        .all(&state.db)
        .await?;

    let report = build_report(&trips, &reservations, &drivers);
    let bytes = to_xlsx(&report)?;

    let filename = format!("reporte-{}.xlsx", Utc::now().format("%Y-%m-%d"));
    tracing::info!(
        reservations = reservations.len(),
        trips = trips.len(),
        drivers = drivers.len(),
        "Report exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
