pub mod cache;
pub mod confidence;
pub mod config;
pub mod error;
pub mod filters;
pub mod gaps;
pub mod generator;
pub mod montecarlo;
pub mod service;
pub mod strategy;
