//! # vaq-api
//!
//! HTTP layer of the VAQ payment bridge.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Hosted-checkout and direct-charge endpoints
//! - ePayco webhook handlers that hand the user back to the app
//! - Firestore persistence of payment outcomes
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/start-checkout` | Signed hosted-checkout payload |
//! | POST | `/charge-appointment` | Direct card charge |
//! | GET/POST | `/payment-response` | Deep-link redirect page |
//! | GET/POST | `/payment-confirmation` | Gateway notification (acknowledged) |

pub mod charge;
pub mod claims;
pub mod firestore;
pub mod google;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
