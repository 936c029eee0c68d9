use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use super::coordinator::move_trip;
use super::{find_trip, find_user};
use crate::entities::reservation::{self, encode_passenger_names, PaymentStatus, ReservationStatus};
use crate::entities::trip::{self, TripStatus};
use crate::error::{AppError, AppResult};
use crate::notifications::{EmailJob, ReservationData, TemplateName};
use crate::utils::code::confirmation_code;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub trip_id: Uuid,
    pub passenger_count: i32,
    pub passenger_names: Vec<String>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub contact_phone: String,
    pub flight_number: Option<String>,
    pub special_requirements: Option<String>,
}

impl NewReservation {
    fn validate(&self, trip: &trip::Model) -> AppResult<()> {
        if self.passenger_count <= 0 {
            return Err(AppError::BadRequest(
                "At least one passenger is required".to_string(),
            ));
        }
        if self.passenger_count > trip.max_passengers {
            return Err(AppError::BadRequest(format!(
                "This trip carries at most {} passengers",
                trip.max_passengers
            )));
        }
        if self.passenger_names.iter().all(|n| n.trim().is_empty()) {
            return Err(AppError::BadRequest(
                "Passenger names are required".to_string(),
            ));
        }
        if self.passenger_names.len() > self.passenger_count as usize {
            return Err(AppError::BadRequest(
                "More passenger names than passengers".to_string(),
            ));
        }
        for (field, value) in [
            ("pickup_location", &self.pickup_location),
            ("dropoff_location", &self.dropoff_location),
            ("contact_phone", &self.contact_phone),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::BadRequest(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn unique_confirmation_code(state: &AppState) -> AppResult<String> {
    for _ in 0..5 {
        let code = confirmation_code();
        let taken = reservation::Entity::find()
            .filter(reservation::Column::ConfirmationCode.eq(&code))
            .count(&state.db)
            .await?;
        if taken == 0 {
            return Ok(code);
        }
    }
    Err(AppError::Internal(
        "Could not generate a unique confirmation code".to_string(),
    ))
}

/// Client reserves an available trip: reservation `pending`, trip `booked`.
pub async fn create_reservation(
    state: &AppState,
    user_id: Uuid,
    payload: NewReservation,
) -> AppResult<(reservation::Model, trip::Model)> {
    let trip = find_trip(&state.db, payload.trip_id).await?;

    if trip.status != TripStatus::Available {
        return Err(AppError::Conflict(
            "This trip is no longer available".to_string(),
        ));
    }
    if trip.departure_time.with_timezone(&Utc) < Utc::now() {
        return Err(AppError::BadRequest("Cannot book past trips".to_string()));
    }
    payload.validate(&trip)?;

    let client = find_user(&state.db, user_id).await?;
    let code = unique_confirmation_code(state).await?;

    let names: Vec<String> = payload
        .passenger_names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    let new_reservation = reservation::ActiveModel {
        id: Set(Uuid::new_v4()),
        confirmation_code: Set(code),
        trip_id: Set(trip.id),
        user_id: Set(client.id),
        passenger_count: Set(payload.passenger_count),
        passenger_names: Set(encode_passenger_names(&names)),
        pickup_location: Set(payload.pickup_location.trim().to_string()),
        dropoff_location: Set(payload.dropoff_location.trim().to_string()),
        contact_phone: Set(payload.contact_phone.trim().to_string()),
        flight_number: Set(non_empty(payload.flight_number)),
        special_requirements: Set(non_empty(payload.special_requirements)),
        total_price: Set(trip.price),
        status: Set(ReservationStatus::Pending),
        payment_status: Set(PaymentStatus::Pending),
        created_at: Set(Utc::now().into()),
    };

    // The guarded status write makes a concurrent second booking fail here.
    let txn = state.db.begin().await?;
    move_trip(&txn, trip.id, &[TripStatus::Available], TripStatus::Booked)
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict("This trip is no longer available".to_string())
            }
            other => other,
        })?;
    let reservation = new_reservation.insert(&txn).await?;
    txn.commit().await?;

    state.cache.trips.invalidate(&trip.id);
    let trip = find_trip(&state.db, trip.id).await?;

    tracing::info!(
        reservation_id = %reservation.id,
        code = %reservation.confirmation_code,
        trip_id = %trip.id,
        "Reservation created"
    );

    let data = ReservationData::from_records(&reservation, &trip, Some(&client), None);
    state.notifier.enqueue(
        EmailJob::new(
            TemplateName::NewReservationAdmin,
            state.config.admin_notification_email.clone(),
            data,
        )
        .for_reservation(reservation.id),
    );

    Ok((reservation, trip))
}
