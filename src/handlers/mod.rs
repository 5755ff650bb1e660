pub mod api;
pub mod proxy;
pub mod statement;
