// HTTP API.

pub mod drafts;
pub mod error;
pub mod health;

pub use drafts::draft_routes;
pub use error::ApiError;
pub use health::health_routes;
