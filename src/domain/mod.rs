// Domain layer - Entities and pure rules
pub mod category;
pub mod dashboard;
pub mod reading;
pub mod station;
