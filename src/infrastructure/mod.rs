// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_response;
pub mod memory_cache;
pub mod postgres_repository;
pub mod redis_cache;
pub mod telemetry;
