//! Grid level locator.

/// Round `price` to the nearest multiple of `grid_size`.
///
/// Exact ties go to the even multiple (banker's rounding), so a close of
/// 4437.5 on a 25 grid maps to 4450 and 4462.5 also maps to 4450.
pub fn nearest_level(price: f64, grid_size: f64) -> f64 {
    (price / grid_size).round_ties_even() * grid_size
}
