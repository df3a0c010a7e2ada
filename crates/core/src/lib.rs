pub mod geometry;
pub mod money;

pub use geometry::{NormalizedBox, Point, Quad};
pub use money::{Money, MoneyError};
