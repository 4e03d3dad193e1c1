// Library exports for Pahina
// Integration tests build the router through these modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod flash;
pub mod forms;
pub mod mail;
pub mod routes;
pub mod state;
pub mod uploads;
