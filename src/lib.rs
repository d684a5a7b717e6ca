#![doc = "The `taskhub` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication, authorization predicates, routing configuration"]
#![doc = "and error handling for the TaskHub task and project service. The binary"]
#![doc = "(`main.rs`) wires them into an actix-web server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod permissions;
pub mod routes;

pub use crate::config::{AuthConfig, Config};
pub use crate::error::AppError;
