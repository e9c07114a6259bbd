//! Domain layer - core business logic and entities

pub mod dex;
pub mod quote;
pub mod token;
