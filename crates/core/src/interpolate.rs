//! Linear interpolation between two known prices.

/// Price at `target_time` on the line through `(time_before, price_before)`
/// and `(time_after, price_after)`.
///
/// Returns `price_before` when both times are equal. Targets outside
/// `[time_before, time_after]` are linearly extrapolated, not rejected.
pub fn interpolate(
    target_time: u64,
    time_before: u64,
    price_before: f64,
    time_after: u64,
    price_after: f64,
) -> f64 {
    if time_after == time_before {
        return price_before;
    }
    let span = time_after as f64 - time_before as f64;
    let offset = target_time as f64 - time_before as f64;
    price_before + (price_after - price_before) * (offset / span)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    #[test]
    fn test_midpoint_examples() {
        assert_eq!(interpolate(150, 100, 1.0, 200, 3.0), 2.0);
        assert_eq!(interpolate(15 * DAY, 10 * DAY, 5.0, 20 * DAY, 15.0), 10.0);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(interpolate(100, 100, 1.5, 200, 9.0), 1.5);
        assert_eq!(interpolate(200, 100, 1.5, 200, 9.0), 9.0);
    }

    #[test]
    fn test_degenerate_interval() {
        assert_eq!(interpolate(500, 300, 4.2, 300, 7.0), 4.2);
    }

    #[test]
    fn test_monotone_between_endpoints() {
        let mut last = f64::MIN;
        for t in 1_000..=2_000 {
            let p = interpolate(t, 1_000, 3.0, 2_000, 8.0);
            assert!(p >= last);
            assert!((3.0..=8.0).contains(&p));
            last = p;
        }

        let mut last = f64::MAX;
        for t in (1_000..=2_000).step_by(7) {
            let p = interpolate(t, 1_000, 8.0, 2_000, 3.0);
            assert!(p <= last);
            last = p;
        }
    }

    #[test]
    fn test_extrapolates_outside_interval() {
        assert_eq!(interpolate(300, 100, 1.0, 200, 2.0), 3.0);
        assert_eq!(interpolate(0, 100, 1.0, 200, 2.0), 0.0);
    }
}
