//! Route handlers for the clinic API Lambda functions.
//!
//! Each binary under `src/bin` serves one resource; the handlers live here so
//! they can be exercised without the Lambda runtime.

pub mod router;
pub mod routes;
pub mod schemas;
pub mod state;

pub use state::AppState;
