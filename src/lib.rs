pub mod config;
pub mod cost;
pub mod data;
pub mod grid;
pub mod model;
pub mod rooms;
pub mod search;
pub mod server;
pub mod solver;
pub mod workload;
