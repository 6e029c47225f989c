//! `medrag-server` is the HTTP front end of the medical question answering
//! service: an HTML form at `/`, answers at `POST /get_response` and bundled
//! assets under `/static`.

pub mod error;
pub mod server;

pub use error::{ApiError, ErrorBody};
pub use server::{AppState, QueryForm, ServerConfig, app_router, run_server};
