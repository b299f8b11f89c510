//! HTTP surface: read-only status and product-code lookups.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use routes::{build_router, with_timeouts};
pub use server::serve;
pub use state::AppState;
