#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use transfer_booking_backend::config::{Config, MailConfig};
use transfer_booking_backend::entities::driver::{self, Vehicle};
use transfer_booking_backend::entities::reservation::{
    self, encode_passenger_names, PaymentStatus, ReservationStatus,
};
use transfer_booking_backend::entities::trip::{self, TripStatus, VehicleCategory};
use transfer_booking_backend::entities::user::{self, UserRole};
use transfer_booking_backend::notifications::transport::LogTransport;
use transfer_booking_backend::notifications::{EmailJob, Notifier};
use transfer_booking_backend::{AppState, RecordCache};

pub const APP_ORIGIN: &str = "https://transfers.test";
pub const OPS_EMAIL: &str = "ops@transfers.test";

pub struct TestApp {
    pub state: AppState,
    pub jobs: UnboundedReceiver<EmailJob>,
}

impl TestApp {
    /// Everything queued since the last call.
    pub fn sent(&mut self) -> Vec<EmailJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.jobs.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_hours: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        app_origin: APP_ORIGIN.to_string(),
        admin_email: "admin@transfers.test".to_string(),
        admin_password: "admin-password".to_string(),
        admin_notification_email: OPS_EMAIL.to_string(),
        mail: MailConfig {
            smtp_host: None,
            smtp_port: 587,
            smtp_secure: false,
            smtp_user: None,
            smtp_pass: None,
            from: "Transfers <no-reply@transfers.test>".to_string(),
            relay_url: None,
            max_attempts: 3,
        },
        cache_ttl_secs: 30,
    }
}

/// In-memory SQLite migrated with the real migrator. One connection, so
/// every query sees the same database.
pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("connect to in-memory sqlite");
    migration::Migrator::up(&db, None)
        .await
        .expect("run migrations");
    db
}

pub async fn setup() -> TestApp {
    let db = test_db().await;
    let (notifier, jobs) = Notifier::channel();

    let state = AppState {
        db,
        config: test_config(),
        notifier,
        mailer: Arc::new(LogTransport),
        cache: Arc::new(RecordCache::new(Duration::from_secs(30))),
    };

    TestApp { state, jobs }
}

// ============ Fixtures ============

pub async fn insert_user(db: &DatabaseConnection, role: UserRole, email: &str) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        name: Set(format!("User {email}")),
        phone: Set(Some("+34 600 000 000".to_string())),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn insert_client(db: &DatabaseConnection) -> user::Model {
    insert_user(db, UserRole::Client, &format!("client-{}@example.com", Uuid::new_v4())).await
}

pub async fn insert_driver(
    db: &DatabaseConnection,
    capacity: i32,
    is_active: bool,
) -> driver::Model {
    let mut active = driver::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Lucía Fernández".to_string()),
        email: Set(format!("driver-{}@example.com", Uuid::new_v4())),
        phone: Set("+34 611 222 333".to_string()),
        license_number: Set("B-1234567".to_string()),
        license_type: Set("D".to_string()),
        years_experience: Set(8),
        is_active: Set(is_active),
        user_id: Set(None),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    active.set_vehicle(Vehicle {
        brand: "Mercedes".to_string(),
        model: "Vito".to_string(),
        year: 2022,
        plate: "1234-KLM".to_string(),
        category: VehicleCategory::Van,
        capacity,
        has_air_conditioning: true,
        has_wifi: true,
        has_child_seat: false,
    });
    active.insert(db).await.expect("insert driver")
}

pub async fn insert_trip(db: &DatabaseConnection, status: TripStatus) -> trip::Model {
    trip::ActiveModel {
        id: Set(Uuid::new_v4()),
        origin: Set("Aeropuerto de Málaga".to_string()),
        destination: Set("Marbella".to_string()),
        departure_time: Set((Utc::now() + ChronoDuration::days(3)).into()),
        estimated_duration_minutes: Set(50),
        price: Set(120.0),
        max_passengers: Set(6),
        vehicle_category: Set(VehicleCategory::Van),
        status: Set(status),
        driver_id: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert trip")
}

pub async fn insert_reservation(
    db: &DatabaseConnection,
    trip: &trip::Model,
    client: &user::Model,
    status: ReservationStatus,
) -> reservation::Model {
    reservation::ActiveModel {
        id: Set(Uuid::new_v4()),
        confirmation_code: Set(format!("TR-{}", &Uuid::new_v4().simple().to_string()[..6])),
        trip_id: Set(trip.id),
        user_id: Set(client.id),
        passenger_count: Set(2),
        passenger_names: Set(encode_passenger_names(&[
            "Ana García".to_string(),
            "Pablo García".to_string(),
        ])),
        pickup_location: Set("Terminal 3".to_string()),
        dropoff_location: Set("Hotel Puente Romano".to_string()),
        contact_phone: Set("+34 600 111 222".to_string()),
        flight_number: Set(Some("IB3456".to_string())),
        special_requirements: Set(None),
        total_price: Set(trip.price),
        status: Set(status),
        payment_status: Set(PaymentStatus::Pending),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert reservation")
}
