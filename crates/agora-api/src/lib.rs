pub mod auth;
pub mod config;
pub mod contact;
pub mod error;
pub mod google;
pub mod intelligence;
pub mod journal;
pub mod projects;
pub mod routes;
pub mod session;
pub mod state;
