//! Terminal front end: one module per command.

pub mod acquire;
pub mod propagate;
pub mod rates;
pub mod setup;
pub mod stock;
pub mod ui;
pub mod value;
