pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod money;
pub mod routes;
pub mod schema;
pub mod service;
pub mod status;
pub mod store;
pub mod swagger;

#[cfg(test)]
mod test;
