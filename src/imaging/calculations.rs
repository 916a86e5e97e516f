//! Pure dimension math for the transcode step.
//!
//! No I/O here; everything is unit testable with plain numbers.

/// Longest-edge tiers, largest first. A source whose longer edge exceeds a
/// tier is scaled down to exactly that tier; the first matching tier wins.
pub const RESIZE_TIERS: &[u32] = &[1280, 480];

/// Output dimensions for a `(width, height)` source under the tier policy.
///
/// - longer edge > 1280 → longer edge becomes 1280
/// - longer edge > 480 → longer edge becomes 480
/// - otherwise unchanged
///
/// Aspect ratio is preserved; the shorter edge is rounded and never drops
/// below one pixel.
///
/// ```
/// # use image_barn::imaging::target_dimensions;
/// assert_eq!(target_dimensions((2000, 1500)), (1280, 960));
/// assert_eq!(target_dimensions((300, 200)), (300, 200));
/// ```
pub fn target_dimensions(source: (u32, u32)) -> (u32, u32) {
    let (width, height) = source;
    let longer = width.max(height);

    let Some(&target) = RESIZE_TIERS.iter().find(|&&tier| longer > tier) else {
        return source;
    };

    let scale = target as f64 / longer as f64;
    let shorter = |edge: u32| ((edge as f64 * scale).round() as u32).max(1);

    if width >= height {
        (target, shorter(height))
    } else {
        (shorter(width), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_landscape_scales_to_1280() {
        // scale 0.64
        assert_eq!(target_dimensions((2000, 1000)), (1280, 640));
        assert_eq!(target_dimensions((2000, 1500)), (1280, 960));
    }

    #[test]
    fn large_portrait_scales_to_1280() {
        assert_eq!(target_dimensions((3024, 4032)), (960, 1280));
    }

    #[test]
    fn medium_scales_to_480() {
        // 400 * 480/700 = 274.28
        assert_eq!(target_dimensions((700, 400)), (480, 274));
        assert_eq!(target_dimensions((400, 700)), (274, 480));
    }

    #[test]
    fn exactly_on_a_tier_is_not_scaled_to_that_tier() {
        // 1280 is not > 1280, but is > 480
        assert_eq!(target_dimensions((1280, 640)), (480, 240));
        assert_eq!(target_dimensions((480, 320)), (480, 320));
    }

    #[test]
    fn small_is_unchanged() {
        assert_eq!(target_dimensions((300, 200)), (300, 200));
        assert_eq!(target_dimensions((1, 1)), (1, 1));
    }

    #[test]
    fn square_scales_both_edges() {
        assert_eq!(target_dimensions((5000, 5000)), (1280, 1280));
    }

    #[test]
    fn extreme_aspect_keeps_at_least_one_pixel() {
        assert_eq!(target_dimensions((10000, 2)), (1280, 1));
    }
}
