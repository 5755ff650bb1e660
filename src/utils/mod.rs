pub mod error;
pub mod http;

pub use error::{ApiError, ApiResult};
