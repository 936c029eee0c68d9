use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{find_reservation, find_trip};
use crate::entities::reservation::ReservationStatus;
use crate::entities::{driver, rating};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct RatingInput {
    pub overall_rating: i16,
    pub punctuality_rating: i16,
    pub vehicle_condition_rating: i16,
    pub driver_service_rating: i16,
    pub comment: Option<String>,
    pub would_recommend: bool,
}

impl RatingInput {
    fn validate(&self) -> AppResult<()> {
        for (field, score) in [
            ("overall_rating", self.overall_rating),
            ("punctuality_rating", self.punctuality_rating),
            ("vehicle_condition_rating", self.vehicle_condition_rating),
            ("driver_service_rating", self.driver_service_rating),
        ] {
            if !(1..=5).contains(&score) {
                return Err(AppError::BadRequest(format!(
                    "{field} must be between 1 and 5"
                )));
            }
        }
        Ok(())
    }
}

/// What the rating page shows before the form is submitted.
#[derive(Debug, Serialize)]
pub struct RatingContext {
    pub reservation_id: Uuid,
    pub confirmation_code: String,
    pub status: ReservationStatus,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub driver_name: Option<String>,
    pub vehicle: Option<String>,
    pub already_rated: bool,
    pub can_rate: bool,
}

async fn already_rated(db: &DatabaseConnection, reservation_id: Uuid) -> AppResult<bool> {
    let count = rating::Entity::find()
        .filter(rating::Column::ReservationId.eq(reservation_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn rating_context(db: &DatabaseConnection, reservation_id: Uuid) -> AppResult<RatingContext> {
    let reservation = find_reservation(db, reservation_id).await?;
    let trip = find_trip(db, reservation.trip_id).await?;
    let driver = match trip.driver_id {
        Some(id) => driver::Entity::find_by_id(id).one(db).await?,
        None => None,
    };
    let already_rated = already_rated(db, reservation.id).await?;

    Ok(RatingContext {
        reservation_id: reservation.id,
        confirmation_code: reservation.confirmation_code,
        status: reservation.status,
        origin: trip.origin,
        destination: trip.destination,
        departure_time: trip.departure_time.with_timezone(&Utc),
        driver_name: driver.as_ref().map(|d| d.name.clone()),
        vehicle: driver.as_ref().map(|d| d.vehicle().describe()),
        already_rated,
        can_rate: reservation.status == ReservationStatus::Completed && !already_rated,
    })
}

/// One rating per completed reservation, tied to the trip's driver.
pub async fn submit_rating(
    db: &DatabaseConnection,
    reservation_id: Uuid,
    input: RatingInput,
) -> AppResult<rating::Model> {
    input.validate()?;

    let reservation = find_reservation(db, reservation_id).await?;
    if reservation.status != ReservationStatus::Completed {
        return Err(AppError::InvalidTransition(
            "Only completed trips can be rated".to_string(),
        ));
    }

    if already_rated(db, reservation.id).await? {
        return Err(AppError::Conflict(
            "This reservation has already been rated".to_string(),
        ));
    }

    let trip = find_trip(db, reservation.trip_id).await?;

    let new_rating = rating::ActiveModel {
        id: Set(Uuid::new_v4()),
        reservation_id: Set(reservation.id),
        driver_id: Set(trip.driver_id),
        user_id: Set(reservation.user_id),
        overall_rating: Set(input.overall_rating),
        punctuality_rating: Set(input.punctuality_rating),
        vehicle_condition_rating: Set(input.vehicle_condition_rating),
        driver_service_rating: Set(input.driver_service_rating),
        comment: Set(input
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())),
        would_recommend: Set(input.would_recommend),
        created_at: Set(Utc::now().into()),
    };

    // The unique index still catches a submission racing this one.
    let rating = new_rating.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("This reservation has already been rated".to_string())
        }
        _ => AppError::Database(e),
    })?;

    tracing::info!(
        reservation_id = %rating.reservation_id,
        driver_id = ?rating.driver_id,
        overall = rating.overall_rating,
        "Rating submitted"
    );

    Ok(rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(overall: i16) -> RatingInput {
        RatingInput {
            overall_rating: overall,
            punctuality_rating: 4,
            vehicle_condition_rating: 5,
            driver_service_rating: 5,
            comment: None,
            would_recommend: true,
        }
    }

    #[test]
    fn test_scores_must_be_one_to_five() {
        assert!(input(1).validate().is_ok());
        assert!(input(5).validate().is_ok());
        assert!(matches!(input(0).validate(), Err(AppError::BadRequest(_))));
        assert!(matches!(input(6).validate(), Err(AppError::BadRequest(_))));
    }
}
