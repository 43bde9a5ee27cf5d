use serde::{Deserialize, Serialize};

/// Fill record: one accepted entry into the book.
///
/// Only [`PositionBook::add_fill`](super::PositionBook::add_fill) creates
/// fills, and it never creates one with non-positive lots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: f64,
    pub lots: f64,
}
