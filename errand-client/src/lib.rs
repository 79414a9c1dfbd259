// Library interface for the errand client
#[macro_use]
pub mod logging;

pub mod api;
pub mod config;
pub mod page;
pub mod server_config;
pub mod session;
pub mod storage;
