use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::reservation::{self, ReservationStatus};
use crate::entities::trip::{self, TripStatus};
use crate::entities::{driver, user};
use crate::error::{AppError, AppResult};
use crate::services::{find_trip, latest_reservation_for_trip};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DriverTripResponse {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub estimated_duration_minutes: i32,
    pub status: TripStatus,
}

#[derive(Debug, Serialize)]
pub struct PassengerInfo {
    pub confirmation_code: String,
    pub client_name: String,
    pub contact_phone: String,
    pub passenger_count: i32,
    pub passenger_names: Vec<String>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub flight_number: Option<String>,
    pub special_requirements: Option<String>,
    pub status: ReservationStatus,
}

#[derive(Debug, Serialize)]
pub struct DriverTripDetail {
    #[serde(flatten)]
    pub trip: DriverTripResponse,
    pub reservation: Option<PassengerInfo>,
}

impl From<trip::Model> for DriverTripResponse {
    fn from(t: trip::Model) -> Self {
        Self {
            id: t.id,
            origin: t.origin,
            destination: t.destination,
            departure_time: t.departure_time.with_timezone(&Utc),
            estimated_duration_minutes: t.estimated_duration_minutes,
            status: t.status,
        }
    }
}

/// Driver record linked to the logged-in account
async fn current_driver(state: &AppState, claims: &Claims) -> AppResult<driver::Model> {
    driver::Entity::find()
        .filter(driver::Column::UserId.eq(claims.sub))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Forbidden("No driver profile for this account".to_string()))
}

/// List trips assigned to the logged-in driver
pub async fn my_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<DriverTripResponse>>> {
    let driver = current_driver(&state, &claims).await?;

    let trips = trip::Entity::find()
        .filter(trip::Column::DriverId.eq(driver.id))
        .order_by_asc(trip::Column::DepartureTime)
        .all(&state.db)
        .await?;

    Ok(Json(trips.into_iter().map(Into::into).collect()))
}

/// Trip details with the passenger to pick up
pub async fn trip_detail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<DriverTripDetail>> {
    let driver = current_driver(&state, &claims).await?;
    let trip = find_trip(&state.db, trip_id).await?;

    if trip.driver_id != Some(driver.id) {
        return Err(AppError::Forbidden(
            "You are not assigned to this trip".to_string(),
        ));
    }

    let statuses = [
        ReservationStatus::Confirmed,
        ReservationStatus::AssignDriver,
        ReservationStatus::Completed,
    ];
    let reservation = match latest_reservation_for_trip(&state.db, trip.id, &statuses).await? {
        Some(r) => {
            let client = user::Entity::find_by_id(r.user_id).one(&state.db).await?;
            Some(passenger_info(r, client))
        }
        None => None,
    };

    Ok(Json(DriverTripDetail {
        trip: trip.into(),
        reservation,
    }))
}

fn passenger_info(r: reservation::Model, client: Option<user::Model>) -> PassengerInfo {
    PassengerInfo {
        passenger_names: r.passenger_name_list(),
        confirmation_code: r.confirmation_code,
        client_name: client.map(|c| c.name).unwrap_or_default(),
        contact_phone: r.contact_phone,
        passenger_count: r.passenger_count,
        pickup_location: r.pickup_location,
        dropoff_location: r.dropoff_location,
        flight_number: r.flight_number,
        special_requirements: r.special_requirements,
        status: r.status,
    }
}
