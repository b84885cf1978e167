pub mod account_handlers;
pub mod accounts;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod password;
pub mod policy;
pub mod policy_handlers;
pub mod role_handlers;
pub mod seed;
pub mod store;
pub mod user_handlers;

pub use app::{router, AppState, HttpSettings};
