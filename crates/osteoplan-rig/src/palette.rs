//! Display colors assigned while building the working set.

/// Semi-transparent bone white for the working copies.
pub const TRANSPARENT_BONE: [f32; 4] = [1.0, 1.0, 1.0, 0.5];

/// Printable-guide blue.
pub const GUIDE: [f32; 4] = [0.25, 0.55, 0.85, 1.0];

const SEGMENT_COLORS: [[f32; 4]; 6] = [
    [0.90, 0.35, 0.30, 1.0],
    [0.35, 0.75, 0.40, 1.0],
    [0.95, 0.75, 0.25, 1.0],
    [0.45, 0.50, 0.90, 1.0],
    [0.80, 0.45, 0.80, 1.0],
    [0.35, 0.75, 0.75, 1.0],
];

/// Color for fibula segment `index`, cycling through a fixed palette.
pub fn segment_color(index: usize) -> [f32; 4] {
    SEGMENT_COLORS[index % SEGMENT_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_colors_cycle() {
        assert_eq!(segment_color(0), segment_color(6));
        assert_ne!(segment_color(0), segment_color(1));
    }
}
