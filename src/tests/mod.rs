// Test modules

pub mod common;
mod http_surface_test;
mod routing_service_test;
