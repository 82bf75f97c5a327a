/// Bin counts and positions are small enough to be exact in an `f64`.
pub(crate) const fn f64_from_usize(x: usize) -> f64 {
    x as f64
}
