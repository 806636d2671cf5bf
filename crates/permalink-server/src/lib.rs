pub mod access;
pub mod api_key_repository;
pub mod audit;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod rest;
pub mod service;
pub mod telemetry;
