//! Booking workflows. Handlers stay thin and call into these.

pub mod booking;
pub mod coordinator;
pub mod rating;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entities::reservation::{self, ReservationStatus};
use crate::entities::{driver, trip, user};
use crate::error::{AppError, AppResult};
use crate::AppState;

pub(crate) async fn find_trip<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<trip::Model> {
    trip::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))
}

pub(crate) async fn find_reservation<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> AppResult<reservation::Model> {
    reservation::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))
}

pub(crate) async fn find_driver<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<driver::Model> {
    driver::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))
}

pub(crate) async fn find_user<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<user::Model> {
    user::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Most recent reservation of a trip whose status is one of `statuses`.
pub(crate) async fn latest_reservation_for_trip<C: ConnectionTrait>(
    conn: &C,
    trip_id: Uuid,
    statuses: &[ReservationStatus],
) -> AppResult<Option<reservation::Model>> {
    Ok(reservation::Entity::find()
        .filter(reservation::Column::TripId.eq(trip_id))
        .filter(reservation::Column::Status.is_in(statuses.iter().copied()))
        .order_by_desc(reservation::Column::CreatedAt)
        .one(conn)
        .await?)
}

/// Trip read through the record cache.
pub async fn cached_trip(state: &AppState, id: Uuid) -> AppResult<trip::Model> {
    if let Some(trip) = state.cache.trips.get(&id) {
        return Ok(trip);
    }
    let generation = state.cache.trips.generation();
    let trip = find_trip(&state.db, id).await?;
    state.cache.trips.insert_if_current(id, trip.clone(), generation);
    Ok(trip)
}

/// Reservation read through the record cache.
pub async fn cached_reservation(state: &AppState, id: Uuid) -> AppResult<reservation::Model> {
    if let Some(reservation) = state.cache.reservations.get(&id) {
        return Ok(reservation);
    }
    let generation = state.cache.reservations.generation();
    let reservation = find_reservation(&state.db, id).await?;
    state
        .cache
        .reservations
        .insert_if_current(id, reservation.clone(), generation);
    Ok(reservation)
}
