//! Spreadsheet export: join trips, reservations and drivers in memory and
//! flatten them into three fixed-column sheets.

mod xlsx;

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::entities::{driver, reservation, trip};
use crate::utils::format::{datetime_es, yes_no_es};

pub use xlsx::to_xlsx;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Currency(f64),
    Empty,
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn opt_text(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Cell::Text(v.to_string()),
            _ => Cell::Empty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub sheets: Vec<Sheet>,
}

impl Report {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

pub const RESERVATIONS_SHEET: &str = "Reservas";
pub const TRIPS_SHEET: &str = "Viajes";
pub const DRIVERS_SHEET: &str = "Conductores";

const RESERVATION_HEADERS: &[&str] = &[
    "Código",
    "Fecha de reserva",
    "Estado",
    "Estado de pago",
    "Origen",
    "Destino",
    "Fecha de salida",
    "Pasajeros",
    "Nombres de pasajeros",
    "Recogida",
    "Destino final",
    "Teléfono",
    "Vuelo",
    "Requisitos especiales",
    "Conductor",
    "Total",
];

const TRIP_HEADERS: &[&str] = &[
    "Origen",
    "Destino",
    "Fecha de salida",
    "Duración (min)",
    "Precio",
    "Máx. pasajeros",
    "Categoría",
    "Estado",
    "Conductor",
    "Reservas",
];

const DRIVER_HEADERS: &[&str] = &[
    "Nombre",
    "Email",
    "Teléfono",
    "Licencia",
    "Tipo de licencia",
    "Años de experiencia",
    "Vehículo",
    "Matrícula",
    "Categoría",
    "Capacidad",
    "Aire acondicionado",
    "WiFi",
    "Silla infantil",
    "Activo",
    "Viajes asignados",
];

pub fn build_report(
    trips: &[trip::Model],
    reservations: &[reservation::Model],
    drivers: &[driver::Model],
) -> Report {
    let trips_by_id: HashMap<Uuid, &trip::Model> = trips.iter().map(|t| (t.id, t)).collect();
    let drivers_by_id: HashMap<Uuid, &driver::Model> = drivers.iter().map(|d| (d.id, d)).collect();

    let driver_name = |trip: Option<&trip::Model>| -> Cell {
        trip.and_then(|t| t.driver_id)
            .and_then(|id| drivers_by_id.get(&id))
            .map(|d| Cell::text(d.name.clone()))
            .unwrap_or(Cell::Empty)
    };

    // Newest reservation first
    let mut sorted_reservations: Vec<&reservation::Model> = reservations.iter().collect();
    sorted_reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let reservation_rows = sorted_reservations
        .into_iter()
        .map(|r| {
            let trip = trips_by_id.get(&r.trip_id).copied();
            vec![
                Cell::text(r.confirmation_code.clone()),
                Cell::text(datetime_es(&r.created_at.with_timezone(&Utc))),
                Cell::text(r.status.label_es()),
                Cell::text(r.payment_status.label_es()),
                Cell::opt_text(trip.map(|t| t.origin.as_str())),
                Cell::opt_text(trip.map(|t| t.destination.as_str())),
                trip.map(|t| Cell::text(datetime_es(&t.departure_time.with_timezone(&Utc))))
                    .unwrap_or(Cell::Empty),
                Cell::Integer(r.passenger_count as i64),
                Cell::text(r.passenger_name_list().join(", ")),
                Cell::text(r.pickup_location.clone()),
                Cell::text(r.dropoff_location.clone()),
                Cell::text(r.contact_phone.clone()),
                Cell::opt_text(r.flight_number.as_deref()),
                Cell::opt_text(r.special_requirements.as_deref()),
                driver_name(trip),
                Cell::Currency(r.total_price),
            ]
        })
        .collect();

    let mut reservations_per_trip: HashMap<Uuid, i64> = HashMap::new();
    for r in reservations {
        *reservations_per_trip.entry(r.trip_id).or_default() += 1;
    }

    let mut sorted_trips: Vec<&trip::Model> = trips.iter().collect();
    sorted_trips.sort_by(|a, b| a.departure_time.cmp(&b.departure_time));

    let trip_rows = sorted_trips
        .into_iter()
        .map(|t| {
            vec![
                Cell::text(t.origin.clone()),
                Cell::text(t.destination.clone()),
                Cell::text(datetime_es(&t.departure_time.with_timezone(&Utc))),
                Cell::Integer(t.estimated_duration_minutes as i64),
                Cell::Currency(t.price),
                Cell::Integer(t.max_passengers as i64),
                Cell::text(t.vehicle_category.label_es()),
                Cell::text(t.status.label_es()),
                driver_name(Some(t)),
                Cell::Integer(reservations_per_trip.get(&t.id).copied().unwrap_or(0)),
            ]
        })
        .collect();

    let mut trips_per_driver: HashMap<Uuid, i64> = HashMap::new();
    for driver_id in trips.iter().filter_map(|t| t.driver_id) {
        *trips_per_driver.entry(driver_id).or_default() += 1;
    }

    let mut sorted_drivers: Vec<&driver::Model> = drivers.iter().collect();
    sorted_drivers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let driver_rows = sorted_drivers
        .into_iter()
        .map(|d| {
            vec![
                Cell::text(d.name.clone()),
                Cell::text(d.email.clone()),
                Cell::text(d.phone.clone()),
                Cell::text(d.license_number.clone()),
                Cell::text(d.license_type.clone()),
                Cell::Integer(d.years_experience as i64),
                Cell::text(format!("{} {} ({})", d.vehicle_brand, d.vehicle_model, d.vehicle_year)),
                Cell::text(d.vehicle_plate.clone()),
                Cell::text(d.vehicle_category.label_es()),
                Cell::Integer(d.vehicle_capacity as i64),
                Cell::text(yes_no_es(d.has_air_conditioning)),
                Cell::text(yes_no_es(d.has_wifi)),
                Cell::text(yes_no_es(d.has_child_seat)),
                Cell::text(yes_no_es(d.is_active)),
                Cell::Integer(trips_per_driver.get(&d.id).copied().unwrap_or(0)),
            ]
        })
        .collect();

    Report {
        sheets: vec![
            Sheet {
                name: RESERVATIONS_SHEET,
                headers: RESERVATION_HEADERS,
                rows: reservation_rows,
            },
            Sheet {
                name: TRIPS_SHEET,
                headers: TRIP_HEADERS,
                rows: trip_rows,
            },
            Sheet {
                name: DRIVERS_SHEET,
                headers: DRIVER_HEADERS,
                rows: driver_rows,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::reservation::{PaymentStatus, ReservationStatus};
    use crate::entities::trip::{TripStatus, VehicleCategory};
    use chrono::{Duration, TimeZone};

    fn driver(name: &str) -> driver::Model {
        driver::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: "600000000".to_string(),
            license_number: "B-123".to_string(),
            license_type: "D".to_string(),
            years_experience: 8,
            vehicle_brand: "Mercedes".to_string(),
            vehicle_model: "Vito".to_string(),
            vehicle_year: 2021,
            vehicle_plate: "1234-KLM".to_string(),
            vehicle_category: VehicleCategory::Van,
            vehicle_capacity: 7,
            has_air_conditioning: true,
            has_wifi: false,
            has_child_seat: true,
            is_active: true,
            user_id: None,
            created_at: Utc::now().into(),
        }
    }

    fn trip(driver_id: Option<Uuid>) -> trip::Model {
        trip::Model {
            id: Uuid::new_v4(),
            origin: "Aeropuerto".to_string(),
            destination: "Centro".to_string(),
            departure_time: Utc.with_ymd_and_hms(2025, 6, 1, 14, 30, 0).unwrap().into(),
            estimated_duration_minutes: 45,
            price: 1250.5,
            max_passengers: 7,
            vehicle_category: VehicleCategory::Van,
            status: TripStatus::Booked,
            driver_id,
            created_at: Utc::now().into(),
        }
    }

    fn reservation(trip_id: Uuid, code: &str, age_minutes: i64) -> reservation::Model {
        reservation::Model {
            id: Uuid::new_v4(),
            confirmation_code: code.to_string(),
            trip_id,
            user_id: Uuid::new_v4(),
            passenger_count: 2,
            passenger_names: r#"["Ana","Luis"]"#.to_string(),
            pickup_location: "Terminal 4".to_string(),
            dropoff_location: "Hotel Sol".to_string(),
            contact_phone: "611111111".to_string(),
            flight_number: Some("IB3456".to_string()),
            special_requirements: None,
            total_price: 1250.5,
            status: ReservationStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            created_at: (Utc::now() - Duration::minutes(age_minutes)).into(),
        }
    }

    #[test]
    fn test_three_sheets_with_fixed_headers() {
        let report = build_report(&[], &[], &[]);

        let names: Vec<&str> = report.sheets.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Reservas", "Viajes", "Conductores"]);
        for sheet in &report.sheets {
            assert!(sheet.rows.is_empty());
        }
    }

    #[test]
    fn test_reservation_row_joins_trip_and_driver() {
        let d = driver("Marta");
        let t = trip(Some(d.id));
        let r = reservation(t.id, "TR-AAAAAA", 0);

        let report = build_report(&[t], &[r], &[d]);
        let sheet = report.sheet(RESERVATIONS_SHEET).unwrap();
        let row = &sheet.rows[0];

        assert_eq!(row.len(), sheet.headers.len());
        assert_eq!(row[0], Cell::Text("TR-AAAAAA".into()));
        assert_eq!(row[2], Cell::Text("Confirmada".into()));
        assert_eq!(row[3], Cell::Text("Pagado".into()));
        assert_eq!(row[4], Cell::Text("Aeropuerto".into()));
        assert_eq!(row[6], Cell::Text("01/06/2025 14:30".into()));
        assert_eq!(row[8], Cell::Text("Ana, Luis".into()));
        assert_eq!(row[13], Cell::Empty);
        assert_eq!(row[14], Cell::Text("Marta".into()));
        assert_eq!(row[15], Cell::Currency(1250.5));
    }

    #[test]
    fn test_orphan_reservation_keeps_its_row() {
        let r = reservation(Uuid::new_v4(), "TR-BBBBBB", 0);

        let report = build_report(&[], &[r], &[]);
        let row = &report.sheet(RESERVATIONS_SHEET).unwrap().rows[0];

        assert_eq!(row[4], Cell::Empty);
        assert_eq!(row[14], Cell::Empty);
    }

    #[test]
    fn test_counts_and_ordering() {
        let d = driver("Zoe");
        let other = driver("alberto");
        let t = trip(Some(d.id));
        let older = reservation(t.id, "TR-OLDER2", 30);
        let newer = reservation(t.id, "TR-NEWER2", 1);

        let report = build_report(&[t], &[older, newer], &[d, other]);

        let reservations = report.sheet(RESERVATIONS_SHEET).unwrap();
        assert_eq!(reservations.rows[0][0], Cell::Text("TR-NEWER2".into()));

        let trips = report.sheet(TRIPS_SHEET).unwrap();
        assert_eq!(trips.rows[0][9], Cell::Integer(2));

        let drivers = report.sheet(DRIVERS_SHEET).unwrap();
        assert_eq!(drivers.rows[0][0], Cell::Text("alberto".into()));
        assert_eq!(drivers.rows[0][14], Cell::Integer(0));
        assert_eq!(drivers.rows[1][14], Cell::Integer(1));
        assert_eq!(drivers.rows[1][12], Cell::Text("Sí".into()));
    }
}
