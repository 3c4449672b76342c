// Application layer - Use cases over the repository and cache ports
pub mod air_quality_service;
pub mod cache;
pub mod dashboard_service;
pub mod error;
pub mod monitoring_repository;
pub mod station_service;

#[cfg(test)]
pub(crate) mod testing;
