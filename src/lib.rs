//! Client core for the clinic platform admin tooling: token storage, keycloak
//! login, and bearer-authenticated gateway calls. The binary in `main.rs` is
//! just a thin front end over these pieces.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
