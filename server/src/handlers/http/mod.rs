pub mod account;
pub mod auth;
pub mod codes;
pub mod profile;
pub mod routes;
pub mod utils;
