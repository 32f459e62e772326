pub mod booking;
pub mod class;
pub mod package;
pub mod template;
pub mod user;
