// src/lib.rs
pub mod api;
pub mod app;
pub mod binding;
pub mod bus;
pub mod calendar;
pub mod config;
pub mod dom;
pub mod errors;
pub mod logging;
pub mod markup;
pub mod observer;
pub mod podcast;
pub mod state_cell;
pub mod toggle;
pub mod ui;
