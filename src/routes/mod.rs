pub mod aurora;
pub mod contact;
pub mod health;
pub mod listings;
pub mod sponsors;
