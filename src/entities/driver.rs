use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::trip::VehicleCategory;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "driver")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub license_number: String,
    pub license_type: String,
    pub years_experience: i32,
    pub vehicle_brand: String,
    pub vehicle_model: String,
    pub vehicle_year: i32,
    pub vehicle_plate: String,
    pub vehicle_category: VehicleCategory,
    pub vehicle_capacity: i32,
    pub has_air_conditioning: bool,
    pub has_wifi: bool,
    pub has_child_seat: bool,
    pub is_active: bool,
    /// Login account of the driver, if they have one.
    pub user_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

/// Vehicle descriptor embedded in a driver row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub plate: String,
    pub category: VehicleCategory,
    pub capacity: i32,
    #[serde(default)]
    pub has_air_conditioning: bool,
    #[serde(default)]
    pub has_wifi: bool,
    #[serde(default)]
    pub has_child_seat: bool,
}

impl Vehicle {
    /// "Toyota Hiace (2021) · 1234-ABC"
    pub fn describe(&self) -> String {
        format!("{} {} ({}) · {}", self.brand, self.model, self.year, self.plate)
    }
}

impl Model {
    pub fn vehicle(&self) -> Vehicle {
        Vehicle {
            brand: self.vehicle_brand.clone(),
            model: self.vehicle_model.clone(),
            year: self.vehicle_year,
            plate: self.vehicle_plate.clone(),
            category: self.vehicle_category,
            capacity: self.vehicle_capacity,
            has_air_conditioning: self.has_air_conditioning,
            has_wifi: self.has_wifi,
            has_child_seat: self.has_child_seat,
        }
    }
}

impl ActiveModel {
    pub fn set_vehicle(&mut self, vehicle: Vehicle) {
        use sea_orm::Set;

        self.vehicle_brand = Set(vehicle.brand);
        self.vehicle_model = Set(vehicle.model);
        self.vehicle_year = Set(vehicle.year);
        self.vehicle_plate = Set(vehicle.plate);
        self.vehicle_category = Set(vehicle.category);
        self.vehicle_capacity = Set(vehicle.capacity);
        self.has_air_conditioning = Set(vehicle.has_air_conditioning);
        self.has_wifi = Set(vehicle.has_wifi);
        self.has_child_seat = Set(vehicle.has_child_seat);
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::trip::Entity")]
    Trips,
    #[sea_orm(has_many = "super::rating::Entity")]
    Ratings,
}

impl Related<super::trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
