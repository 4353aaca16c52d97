pub mod auth;
pub mod health;
pub mod profile;
pub mod tenant;
pub mod users;
