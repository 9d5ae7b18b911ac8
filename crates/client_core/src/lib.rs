//! Client side of MarketPulse: the backend API contract, its HTTP
//! implementation, the dashboard repository and the dashboard view-model.

pub mod api;
pub mod dashboard;
pub mod error;
pub mod repository;

pub use api::{HttpMarketPulseApi, MarketPulseApi};
pub use dashboard::{DashboardPhase, DashboardState, DashboardViewModel, UNKNOWN_ERROR_MESSAGE};
pub use error::ApiClientError;
pub use repository::DashboardRepository;
