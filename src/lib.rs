pub mod audit;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod pricing;
pub mod rating;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod stock;
