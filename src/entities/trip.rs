use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "booked")]
    Booked,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// `cancelled -> available` is the only way out of a terminal state.
    pub fn can_transition_to(self, next: TripStatus) -> bool {
        use TripStatus::*;
        matches!(
            (self, next),
            (Available, Booked)
                | (Available, Cancelled)
                | (Booked, Available)
                | (Booked, Completed)
                | (Booked, Cancelled)
                | (Cancelled, Available)
        )
    }

    /// Every status with an edge into `next`.
    pub fn sources(next: TripStatus) -> Vec<TripStatus> {
        Self::iter().filter(|s| s.can_transition_to(next)).collect()
    }

    pub fn label_es(self) -> &'static str {
        match self {
            TripStatus::Available => "Disponible",
            TripStatus::Booked => "Reservado",
            TripStatus::Completed => "Completado",
            TripStatus::Cancelled => "Cancelado",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum VehicleCategory {
    #[sea_orm(string_value = "sedan")]
    Sedan,
    #[sea_orm(string_value = "suv")]
    Suv,
    #[sea_orm(string_value = "van")]
    Van,
    #[sea_orm(string_value = "minibus")]
    Minibus,
    #[sea_orm(string_value = "bus")]
    Bus,
}

impl VehicleCategory {
    pub fn label_es(self) -> &'static str {
        match self {
            VehicleCategory::Sedan => "Sedán",
            VehicleCategory::Suv => "SUV",
            VehicleCategory::Van => "Van",
            VehicleCategory::Minibus => "Minibús",
            VehicleCategory::Bus => "Autobús",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trip")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTimeWithTimeZone,
    pub estimated_duration_minutes: i32,
    pub price: f64,
    pub max_passengers: i32,
    pub vehicle_category: VehicleCategory,
    pub status: TripStatus,
    pub driver_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::driver::Entity",
        from = "Column::DriverId",
        to = "super::driver::Column::Id"
    )]
    Driver,
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
}

impl Related<super::driver::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Driver.def()
    }
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_only_reopen_from_cancelled() {
        assert!(TripStatus::Cancelled.can_transition_to(TripStatus::Available));
        assert!(!TripStatus::Completed.can_transition_to(TripStatus::Available));
        assert!(!TripStatus::Completed.can_transition_to(TripStatus::Cancelled));
        assert!(!TripStatus::Cancelled.can_transition_to(TripStatus::Completed));
    }

    #[test]
    fn test_booked_trip_can_finish_either_way() {
        assert!(TripStatus::Booked.can_transition_to(TripStatus::Completed));
        assert!(TripStatus::Booked.can_transition_to(TripStatus::Cancelled));
        assert!(!TripStatus::Available.can_transition_to(TripStatus::Completed));
    }

    #[test]
    fn test_only_booked_trips_complete() {
        assert_eq!(TripStatus::sources(TripStatus::Completed), vec![TripStatus::Booked]);
        assert_eq!(
            TripStatus::sources(TripStatus::Cancelled),
            vec![TripStatus::Available, TripStatus::Booked]
        );
    }
}
