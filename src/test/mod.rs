//! Shared test infrastructure.

pub mod db;

pub use db::TestDb;
