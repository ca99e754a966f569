pub mod connection;
pub mod itinerary;
pub mod user;
