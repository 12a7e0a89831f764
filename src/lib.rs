pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
mod network;
mod server;
mod service;
mod store;
mod utils;

pub use config::{Config, InitOptions};
pub use error::{Error, ErrorType, Result};
pub use network::local_ip;
pub use server::Server;
pub use service::{BillingService, Lookup};
pub use store::{FileStore, Store, StorePaths};
