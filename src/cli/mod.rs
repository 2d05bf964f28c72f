//! Command implementations and terminal presentation

pub mod add;
pub mod amounts;
pub mod check;
pub mod currencies;
pub mod setup;
pub mod ui;
