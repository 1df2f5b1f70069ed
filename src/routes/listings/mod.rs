mod handler;
mod model;

pub use handler::{create_listing, list_listings};
