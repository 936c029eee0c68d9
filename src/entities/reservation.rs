use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "assign_driver")]
    AssignDriver,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ReservationStatus {
    /// Statuses that keep the trip booked.
    pub const ACTIVE: [ReservationStatus; 3] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::AssignDriver,
    ];

    /// Statuses a trip can be completed from.
    pub const CONFIRMED: [ReservationStatus; 2] =
        [ReservationStatus::Confirmed, ReservationStatus::AssignDriver];

    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, AssignDriver)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                // driver reassignment
                | (AssignDriver, AssignDriver)
                | (AssignDriver, Completed)
                | (AssignDriver, Cancelled)
        )
    }

    /// Every status with an edge into `next`.
    pub fn sources(next: ReservationStatus) -> Vec<ReservationStatus> {
        Self::iter().filter(|s| s.can_transition_to(next)).collect()
    }

    pub fn label_es(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pendiente",
            ReservationStatus::Confirmed => "Confirmada",
            ReservationStatus::AssignDriver => "Conductor asignado",
            ReservationStatus::Completed => "Completada",
            ReservationStatus::Cancelled => "Cancelada",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl PaymentStatus {
    pub fn label_es(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pendiente",
            PaymentStatus::Paid => "Pagado",
            PaymentStatus::Refunded => "Reembolsado",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub confirmation_code: String,
    pub trip_id: Uuid,
    pub user_id: Uuid,
    pub passenger_count: i32,
    /// JSON array, see [`Model::passenger_name_list`].
    #[sea_orm(column_type = "Text")]
    pub passenger_names: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub contact_phone: String,
    pub flight_number: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub special_requirements: Option<String>,
    pub total_price: f64,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn passenger_name_list(&self) -> Vec<String> {
        serde_json::from_str(&self.passenger_names).unwrap_or_default()
    }
}

pub fn encode_passenger_names(names: &[String]) -> String {
    serde_json::to_string(names).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trip::Entity",
        from = "Column::TripId",
        to = "super::trip::Column::Id"
    )]
    Trip,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_one = "super::rating::Entity")]
    Rating,
}

impl Related<super::trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trip.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_only_from_pending() {
        assert!(ReservationStatus::Pending.can_transition_to(ReservationStatus::Confirmed));
        for status in [
            ReservationStatus::Confirmed,
            ReservationStatus::AssignDriver,
            ReservationStatus::Completed,
            ReservationStatus::Cancelled,
        ] {
            assert!(!status.can_transition_to(ReservationStatus::Confirmed));
        }
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for next in ReservationStatus::iter() {
            assert!(!ReservationStatus::Completed.can_transition_to(next));
            assert!(!ReservationStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_pending_reservation_cannot_skip_to_completed() {
        assert!(!ReservationStatus::Pending.can_transition_to(ReservationStatus::Completed));
        assert!(!ReservationStatus::Pending.can_transition_to(ReservationStatus::AssignDriver));
    }

    #[test]
    fn test_status_groups_follow_the_transition_table() {
        assert_eq!(
            ReservationStatus::sources(ReservationStatus::Cancelled),
            ReservationStatus::ACTIVE
        );
        assert_eq!(
            ReservationStatus::sources(ReservationStatus::Completed),
            ReservationStatus::CONFIRMED
        );
        assert_eq!(
            ReservationStatus::sources(ReservationStatus::AssignDriver),
            ReservationStatus::CONFIRMED
        );
    }

    #[test]
    fn test_passenger_names_survive_storage_encoding() {
        let names = vec!["Ana López".to_string(), "José \"Pepe\" Ruiz".to_string()];
        let model = Model {
            id: Uuid::new_v4(),
            confirmation_code: "TR-ABC234".to_string(),
            trip_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            passenger_count: 2,
            passenger_names: encode_passenger_names(&names),
            pickup_location: "Terminal 1".to_string(),
            dropoff_location: "Hotel Central".to_string(),
            contact_phone: "+34 600 000 000".to_string(),
            flight_number: None,
            special_requirements: None,
            total_price: 80.0,
            status: ReservationStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: chrono::Utc::now().into(),
        };

        assert_eq!(model.passenger_name_list(), names);
    }
}
