pub mod driver;
pub mod email_log;
pub mod rating;
pub mod reservation;
pub mod trip;
pub mod user;
