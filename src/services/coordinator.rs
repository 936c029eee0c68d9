//! Trip/reservation status coordination.
//!
//! Every operation re-reads the rows it guards on (never the cache), writes
//! the trip/reservation pair inside one transaction using status-guarded
//! updates, drops the touched ids from the cache, and only then queues
//! notifications.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use super::{find_driver, find_reservation, find_trip, latest_reservation_for_trip};
use crate::entities::reservation::{self, ReservationStatus};
use crate::entities::trip::{self, TripStatus};
use crate::entities::{driver, user};
use crate::error::{AppError, AppResult};
use crate::notifications::{EmailJob, ReservationData, TemplateName};
use crate::AppState;

/// Refreshed trip and, when one was involved, its reservation.
#[derive(Debug, Clone, Serialize)]
pub struct TripTransition {
    pub trip: trip::Model,
    pub reservation: Option<reservation::Model>,
}

// ============ Guarded writes ============

/// Move a reservation to `to` only if it is still in one of `from`.
/// Statuses without an edge into `to` are dropped from `from`.
pub(crate) async fn move_reservation<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    from: &[ReservationStatus],
    to: ReservationStatus,
) -> AppResult<()> {
    let from: Vec<_> = from.iter().copied().filter(|s| s.can_transition_to(to)).collect();
    if from.is_empty() {
        return Err(AppError::InvalidTransition(format!(
            "No reservation status can move to {}",
            to.to_value()
        )));
    }

    let result = reservation::Entity::update_many()
        .col_expr(reservation::Column::Status, Expr::value(to))
        .filter(reservation::Column::Id.eq(id))
        .filter(reservation::Column::Status.is_in(from))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Reservation was changed by another request, reload and try again".to_string(),
        ));
    }
    Ok(())
}

/// Move a trip to `to` only if it is still in one of `from`.
/// Statuses without an edge into `to` are dropped from `from`.
pub(crate) async fn move_trip<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    from: &[TripStatus],
    to: TripStatus,
) -> AppResult<()> {
    let from: Vec<_> = from.iter().copied().filter(|s| s.can_transition_to(to)).collect();
    if from.is_empty() {
        return Err(AppError::InvalidTransition(format!(
            "No trip status can move to {}",
            to.to_value()
        )));
    }

    let result = trip::Entity::update_many()
        .col_expr(trip::Column::Status, Expr::value(to))
        .filter(trip::Column::Id.eq(id))
        .filter(trip::Column::Status.is_in(from))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Trip was changed by another request, reload and try again".to_string(),
        ));
    }
    Ok(())
}

// ============ Reservation transitions ============

/// pending -> confirmed. The trip stays booked.
pub async fn confirm_reservation(state: &AppState, reservation_id: Uuid) -> AppResult<reservation::Model> {
    let reservation = find_reservation(&state.db, reservation_id).await?;

    if !reservation.status.can_transition_to(ReservationStatus::Confirmed) {
        return Err(AppError::InvalidTransition(format!(
            "Reservation {} is {}, only pending reservations can be confirmed",
            reservation.confirmation_code,
            reservation.status.to_value()
        )));
    }

    move_reservation(
        &state.db,
        reservation.id,
        &ReservationStatus::sources(ReservationStatus::Confirmed),
        ReservationStatus::Confirmed,
    )
    .await?;
    state.cache.reservations.invalidate(&reservation.id);

    let updated = find_reservation(&state.db, reservation.id).await?;
    tracing::info!(
        reservation_id = %updated.id,
        code = %updated.confirmation_code,
        "Reservation confirmed"
    );

    if let Ok(trip) = find_trip(&state.db, updated.trip_id).await {
        notify_client(state, TemplateName::ReservationConfirmed, &updated, &trip, None).await;
    }

    Ok(updated)
}

/// pending -> cancelled. Frees the trip again.
pub async fn reject_reservation(state: &AppState, reservation_id: Uuid) -> AppResult<TripTransition> {
    let reservation = find_reservation(&state.db, reservation_id).await?;

    if reservation.status != ReservationStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "Reservation {} is {}, only pending reservations can be rejected",
            reservation.confirmation_code,
            reservation.status.to_value()
        )));
    }

    let txn = state.db.begin().await?;
    move_reservation(
        &txn,
        reservation.id,
        &[ReservationStatus::Pending],
        ReservationStatus::Cancelled,
    )
    .await?;
    // Only a booked trip goes back on sale.
    trip::Entity::update_many()
        .col_expr(trip::Column::Status, Expr::value(TripStatus::Available))
        .filter(trip::Column::Id.eq(reservation.trip_id))
        .filter(trip::Column::Status.eq(TripStatus::Booked))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    state.cache.invalidate_pair(reservation.trip_id, Some(reservation.id));

    let trip = find_trip(&state.db, reservation.trip_id).await?;
    let reservation = find_reservation(&state.db, reservation.id).await?;
    tracing::info!(
        reservation_id = %reservation.id,
        trip_id = %trip.id,
        "Reservation rejected, trip released"
    );

    notify_client(state, TemplateName::TripCancelled, &reservation, &trip, None).await;

    Ok(TripTransition {
        trip,
        reservation: Some(reservation),
    })
}

/// confirmed | assign_driver -> assign_driver, and `trip.driver_id = driver_id`.
pub async fn assign_driver(
    state: &AppState,
    reservation_id: Uuid,
    driver_id: Uuid,
) -> AppResult<TripTransition> {
    let driver = find_driver(&state.db, driver_id).await?;
    if !driver.is_active {
        return Err(AppError::BadRequest(format!(
            "Driver {} is inactive and cannot be assigned",
            driver.name
        )));
    }

    let reservation = find_reservation(&state.db, reservation_id).await?;
    if !reservation.status.can_transition_to(ReservationStatus::AssignDriver) {
        return Err(AppError::InvalidTransition(format!(
            "Reservation {} is {}, a driver can only be assigned to a confirmed reservation",
            reservation.confirmation_code,
            reservation.status.to_value()
        )));
    }

    let trip = find_trip(&state.db, reservation.trip_id).await?;
    if trip.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "Trip is {}, drivers cannot be assigned",
            trip.status.to_value()
        )));
    }

    if driver.vehicle_capacity < reservation.passenger_count {
        return Err(AppError::BadRequest(format!(
            "Vehicle of {} seats {} passengers, reservation has {}",
            driver.name, driver.vehicle_capacity, reservation.passenger_count
        )));
    }

    let txn = state.db.begin().await?;
    move_reservation(
        &txn,
        reservation.id,
        &ReservationStatus::sources(ReservationStatus::AssignDriver),
        ReservationStatus::AssignDriver,
    )
    .await?;
    let mut active: trip::ActiveModel = trip.into();
    active.driver_id = Set(Some(driver.id));
    let trip = active.update(&txn).await?;
    txn.commit().await?;

    state.cache.invalidate_pair(trip.id, Some(reservation.id));

    let reservation = find_reservation(&state.db, reservation.id).await?;
    tracing::info!(
        reservation_id = %reservation.id,
        trip_id = %trip.id,
        driver_id = %driver.id,
        "Driver assigned"
    );

    notify_client(state, TemplateName::DriverAssigned, &reservation, &trip, None).await;
    notify_driver(state, TemplateName::TripAssignedDriver, &reservation, &trip, &driver).await;

    Ok(TripTransition {
        trip,
        reservation: Some(reservation),
    })
}

// ============ Trip transitions ============

/// booked -> completed, together with its confirmed reservation.
///
/// Fails when no confirmed reservation (and its client) can be resolved,
/// unlike [`cancel_trip`]. A trip that is not booked is checked after that
/// lookup, so an available trip without a reservation reports NotFound.
pub async fn complete_trip(state: &AppState, trip_id: Uuid) -> AppResult<TripTransition> {
    let trip = find_trip(&state.db, trip_id).await?;

    match trip.status {
        TripStatus::Completed => {
            return Err(AppError::InvalidTransition(
                "Trip is already completed".to_string(),
            ));
        }
        TripStatus::Cancelled => {
            return Err(AppError::InvalidTransition(
                "Cancelled trips cannot be completed".to_string(),
            ));
        }
        TripStatus::Available | TripStatus::Booked => {}
    }

    let reservation =
        latest_reservation_for_trip(&state.db, trip.id, &ReservationStatus::CONFIRMED)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("No confirmed reservation found for this trip".to_string())
            })?;
    let client = user::Entity::find_by_id(reservation.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Client of the reservation not found".to_string()))?;

    if !trip.status.can_transition_to(TripStatus::Completed) {
        return Err(AppError::InvalidTransition(format!(
            "Trip is {}, only booked trips can be completed",
            trip.status.to_value()
        )));
    }

    let txn = state.db.begin().await?;
    move_trip(
        &txn,
        trip.id,
        &TripStatus::sources(TripStatus::Completed),
        TripStatus::Completed,
    )
    .await?;
    move_reservation(
        &txn,
        reservation.id,
        &ReservationStatus::sources(ReservationStatus::Completed),
        ReservationStatus::Completed,
    )
    .await?;
    txn.commit().await?;

    state.cache.invalidate_pair(trip.id, Some(reservation.id));

    let trip = find_trip(&state.db, trip.id).await?;
    let reservation = find_reservation(&state.db, reservation.id).await?;
    tracing::info!(trip_id = %trip.id, reservation_id = %reservation.id, "Trip completed");

    let driver = match trip.driver_id {
        Some(id) => load_or_warn(driver::Entity::find_by_id(id).one(&state.db).await),
        None => None,
    };
    let data = ReservationData::from_records(&reservation, &trip, Some(&client), driver.as_ref())
        .with_rating_link(state.config.rating_link(reservation.id));
    state.notifier.enqueue(
        EmailJob::new(TemplateName::TripCompleted, client.email.clone(), data)
            .for_reservation(reservation.id),
    );

    Ok(TripTransition {
        trip,
        reservation: Some(reservation),
    })
}

/// -> cancelled. Cancels the active reservation too when there is one;
/// succeeds without one.
pub async fn cancel_trip(state: &AppState, trip_id: Uuid) -> AppResult<TripTransition> {
    let trip = find_trip(&state.db, trip_id).await?;

    if !trip.status.can_transition_to(TripStatus::Cancelled) {
        let message = match trip.status {
            TripStatus::Cancelled => "Trip is already cancelled".to_string(),
            other => format!("Trip is {}, it cannot be cancelled", other.to_value()),
        };
        return Err(AppError::InvalidTransition(message));
    }

    let reservation =
        latest_reservation_for_trip(&state.db, trip.id, &ReservationStatus::ACTIVE).await?;

    let txn = state.db.begin().await?;
    move_trip(
        &txn,
        trip.id,
        &TripStatus::sources(TripStatus::Cancelled),
        TripStatus::Cancelled,
    )
    .await?;
    if let Some(reservation) = &reservation {
        move_reservation(
            &txn,
            reservation.id,
            &ReservationStatus::sources(ReservationStatus::Cancelled),
            ReservationStatus::Cancelled,
        )
        .await?;
    }
    txn.commit().await?;

    state
        .cache
        .invalidate_pair(trip.id, reservation.as_ref().map(|r| r.id));

    let trip = find_trip(&state.db, trip.id).await?;
    let reservation = match reservation {
        Some(r) => Some(find_reservation(&state.db, r.id).await?),
        None => None,
    };
    tracing::info!(
        trip_id = %trip.id,
        reservation_id = ?reservation.as_ref().map(|r| r.id),
        "Trip cancelled"
    );

    if let Some(reservation) = &reservation {
        let driver = match trip.driver_id {
            Some(id) => load_or_warn(driver::Entity::find_by_id(id).one(&state.db).await),
            None => None,
        };
        notify_client(state, TemplateName::TripCancelled, reservation, &trip, driver.as_ref())
            .await;
        if let Some(driver) = &driver {
            notify_driver(state, TemplateName::TripCancelled, reservation, &trip, driver).await;
        }
    }

    Ok(TripTransition { trip, reservation })
}

/// cancelled -> available, without a driver.
pub async fn relist_trip(state: &AppState, trip_id: Uuid) -> AppResult<trip::Model> {
    let trip = find_trip(&state.db, trip_id).await?;

    if trip.status != TripStatus::Cancelled {
        return Err(AppError::InvalidTransition(format!(
            "Trip is {}, only cancelled trips can be relisted",
            trip.status.to_value()
        )));
    }

    let txn = state.db.begin().await?;
    move_trip(&txn, trip.id, &[TripStatus::Cancelled], TripStatus::Available).await?;
    trip::Entity::update_many()
        .col_expr(trip::Column::DriverId, Expr::value(Option::<Uuid>::None))
        .filter(trip::Column::Id.eq(trip.id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    state.cache.trips.invalidate(&trip.id);
    tracing::info!(trip_id = %trip.id, "Trip relisted");

    find_trip(&state.db, trip.id).await
}

// ============ Single-row mutations ============

pub async fn delete_trip(state: &AppState, trip_id: Uuid) -> AppResult<()> {
    let result = trip::Entity::delete_by_id(trip_id).exec(&state.db).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Trip not found".to_string()));
    }

    // Reservations cascade with the trip.
    state.cache.reservations.clear();
    state.cache.trips.invalidate(&trip_id);
    tracing::info!(trip_id = %trip_id, "Trip deleted");
    Ok(())
}

pub async fn set_driver_active(
    state: &AppState,
    driver_id: Uuid,
    is_active: bool,
) -> AppResult<driver::Model> {
    let driver = find_driver(&state.db, driver_id).await?;

    let mut active: driver::ActiveModel = driver.into();
    active.is_active = Set(is_active);
    let driver = active.update(&state.db).await?;

    tracing::info!(driver_id = %driver.id, is_active, "Driver activation changed");
    Ok(driver)
}

pub async fn deactivate_driver(state: &AppState, driver_id: Uuid) -> AppResult<driver::Model> {
    set_driver_active(state, driver_id, false).await
}

pub async fn activate_driver(state: &AppState, driver_id: Uuid) -> AppResult<driver::Model> {
    set_driver_active(state, driver_id, true).await
}

pub async fn delete_driver(state: &AppState, driver_id: Uuid) -> AppResult<()> {
    let driver = find_driver(&state.db, driver_id).await?;

    // Unassign from all trips
    let unassigned = trip::Entity::update_many()
        .col_expr(trip::Column::DriverId, Expr::value(Option::<Uuid>::None))
        .filter(trip::Column::DriverId.eq(driver.id))
        .exec(&state.db)
        .await?;
    if unassigned.rows_affected > 0 {
        state.cache.trips.clear();
    }

    driver::Entity::delete_by_id(driver.id).exec(&state.db).await?;
    tracing::info!(driver_id = %driver.id, trips_unassigned = unassigned.rows_affected, "Driver deleted");
    Ok(())
}

// ============ Notification glue ============

fn load_or_warn<T>(result: Result<Option<T>, sea_orm::DbErr>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Could not load notification context");
            None
        }
    }
}

async fn load_client(db: &DatabaseConnection, user_id: Uuid) -> Option<user::Model> {
    load_or_warn(user::Entity::find_by_id(user_id).one(db).await)
}

async fn notify_client(
    state: &AppState,
    template: TemplateName,
    reservation: &reservation::Model,
    trip: &trip::Model,
    driver: Option<&driver::Model>,
) {
    let Some(client) = load_client(&state.db, reservation.user_id).await else {
        tracing::warn!(
            reservation_id = %reservation.id,
            template = template.as_str(),
            "Client not found, email skipped"
        );
        return;
    };

    let driver = match (driver, trip.driver_id) {
        (Some(d), _) => Some(d.clone()),
        (None, Some(id)) => load_or_warn(driver::Entity::find_by_id(id).one(&state.db).await),
        (None, None) => None,
    };

    let data = ReservationData::from_records(reservation, trip, Some(&client), driver.as_ref());
    state
        .notifier
        .enqueue(EmailJob::new(template, client.email.clone(), data).for_reservation(reservation.id));
}

async fn notify_driver(
    state: &AppState,
    template: TemplateName,
    reservation: &reservation::Model,
    trip: &trip::Model,
    driver: &driver::Model,
) {
    let client = load_client(&state.db, reservation.user_id).await;
    let data = ReservationData::from_records(reservation, trip, client.as_ref(), Some(driver));
    state
        .notifier
        .enqueue(EmailJob::new(template, driver.email.clone(), data).for_reservation(reservation.id));
}
