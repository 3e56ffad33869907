pub mod channels;
pub mod menu;
pub mod models;
pub mod session;
pub mod store;
