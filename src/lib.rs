pub mod analysis;
pub mod archive;
pub mod completion;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pagination;
pub mod response;
pub mod server;

pub use config::Config;
pub use error::{ApiError, Result};
pub use server::create_app;
