//! HTTP route handlers.

pub mod health;
pub mod invitations;
pub mod metrics;
pub mod organizations;
pub mod rentals;
