pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use pipeline::{ExtractionResult, FieldExtractor};
pub use routes::{build_router, ExtractRequest};
pub use state::AppState;
