use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::reservation::{self, PaymentStatus, ReservationStatus};
use crate::entities::trip::{self, TripStatus, VehicleCategory};
use crate::error::{AppError, AppResult};
use crate::services::booking::{self, NewReservation};
use crate::services::{cached_reservation, cached_trip};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AvailableTripResponse {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub estimated_duration_minutes: i32,
    pub price: f64,
    pub max_passengers: i32,
    pub vehicle_category: VehicleCategory,
}

impl From<trip::Model> for AvailableTripResponse {
    fn from(t: trip::Model) -> Self {
        Self {
            id: t.id,
            origin: t.origin,
            destination: t.destination,
            departure_time: t.departure_time.with_timezone(&Utc),
            estimated_duration_minutes: t.estimated_duration_minutes,
            price: t.price,
            max_passengers: t.max_passengers,
            vehicle_category: t.vehicle_category,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub confirmation_code: String,
    pub trip_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub passenger_count: i32,
    pub passenger_names: Vec<String>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub contact_phone: String,
    pub flight_number: Option<String>,
    pub special_requirements: Option<String>,
    pub total_price: f64,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl ReservationResponse {
    fn new(r: reservation::Model, trip: &trip::Model) -> Self {
        Self {
            passenger_names: r.passenger_name_list(),
            id: r.id,
            confirmation_code: r.confirmation_code,
            trip_id: r.trip_id,
            origin: trip.origin.clone(),
            destination: trip.destination.clone(),
            departure_time: trip.departure_time.with_timezone(&Utc),
            passenger_count: r.passenger_count,
            pickup_location: r.pickup_location,
            dropoff_location: r.dropoff_location,
            contact_phone: r.contact_phone,
            flight_number: r.flight_number,
            special_requirements: r.special_requirements,
            total_price: r.total_price,
            status: r.status,
            payment_status: r.payment_status,
            created_at: r.created_at.with_timezone(&Utc),
        }
    }
}

/// List trips open for booking (public)
pub async fn list_trips(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AvailableTripResponse>>> {
    let trips = trip::Entity::find()
        .filter(trip::Column::Status.eq(TripStatus::Available))
        .filter(trip::Column::DepartureTime.gt(Utc::now()))
        .order_by_asc(trip::Column::DepartureTime)
        .all(&state.db)
        .await?;

    Ok(Json(trips.into_iter().map(Into::into).collect()))
}

/// Get a single trip (public)
pub async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AvailableTripResponse>> {
    let trip = cached_trip(&state, id).await?;
    Ok(Json(trip.into()))
}

/// Reserve a trip
pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewReservation>,
) -> AppResult<Json<ReservationResponse>> {
    let (reservation, trip) = booking::create_reservation(&state, claims.sub, payload).await?;
    Ok(Json(ReservationResponse::new(reservation, &trip)))
}

/// List the logged-in client's reservations
pub async fn my_reservations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<ReservationResponse>>> {
    let rows = reservation::Entity::find()
        .filter(reservation::Column::UserId.eq(claims.sub))
        .order_by_desc(reservation::Column::CreatedAt)
        .find_also_related(trip::Entity)
        .all(&state.db)
        .await?;

    let responses = rows
        .into_iter()
        .filter_map(|(r, trip)| trip.map(|t| ReservationResponse::new(r, &t)))
        .collect();

    Ok(Json(responses))
}

/// Get one of the client's own reservations
pub async fn get_reservation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReservationResponse>> {
    let reservation = cached_reservation(&state, id).await?;

    if reservation.user_id != claims.sub {
        return Err(AppError::Forbidden(
            "You can only view your own reservations".to_string(),
        ));
    }

    let trip = cached_trip(&state, reservation.trip_id).await?;
    Ok(Json(ReservationResponse::new(reservation, &trip)))
}
