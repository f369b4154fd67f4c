pub mod auth;
pub mod campaigns;
pub mod error;
pub mod extract;
pub mod payments;
pub mod router;
pub mod services;
pub mod state;
pub mod storage;
pub mod transactions;
pub mod users;
pub mod views;

pub use router::router;
pub use state::{AppState, AppStateInner};
