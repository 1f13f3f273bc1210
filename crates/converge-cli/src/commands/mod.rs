pub mod apply;
pub mod auth;
pub mod inventory;
pub mod resources;
