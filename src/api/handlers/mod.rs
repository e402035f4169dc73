//! API handlers for custos.
//!
//! This module organizes the service's route handlers: the authentication
//! core under [`auth`] plus liveness endpoints.

pub mod auth;
pub mod health;
pub mod root;
