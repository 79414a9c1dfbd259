mod client;
mod error;

pub use client::{ApiClient, OrderApi, DEFAULT_SERVER_URL};
pub use error::{ApiError, ApiResult};
