pub mod communication;
pub mod control_system;
pub mod global_variables;
pub mod models;
pub mod monitoring;
pub mod perception;
