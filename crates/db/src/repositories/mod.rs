pub mod booking;
pub mod class;
pub mod maintenance;
pub mod package;
pub mod template;
pub mod user;
