//! Domain types for GridLab

pub mod bar;
pub mod book;
pub mod fill;
pub mod signal;

pub use bar::Bar;
pub use book::{BookSnapshot, PositionBook};
pub use fill::Fill;
pub use signal::{Signal, SignalAction};
