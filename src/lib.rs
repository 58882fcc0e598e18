pub mod app;
pub mod catalog;
pub mod cmr;
pub mod config;
pub mod domain;
pub mod error;
pub mod eumetsat;
pub mod geostationary;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod polar;
pub mod store;
