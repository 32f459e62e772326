pub mod admin;
pub mod bookings;
pub mod classes;
pub mod health;
pub mod packages;
pub mod users;
