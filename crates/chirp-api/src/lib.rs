pub mod adapters;
pub mod error;
pub mod handlers;

pub use error::ApiError;
pub use handlers::App;
