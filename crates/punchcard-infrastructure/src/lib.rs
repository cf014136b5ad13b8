// Infrastructure layer - Technical implementations
// Depends on the domain layer, implements its seams

pub mod config;
pub mod http;
pub mod logging;
pub mod notification;
pub mod persistence;
pub mod sites;
