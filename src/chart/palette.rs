//! Colours assigned to newly discovered variables.

/// Fixed palette, cycled in discovery order.
pub const PALETTE: &[&str] = &[
    "#FF6384", // red
    "#36A2EB", // blue
    "#FFCE56", // yellow
    "#4BC0C0", // teal
    "#9966FF", // purple
    "#FF9F40", // orange
    "#C9CBCF", // grey
    "#2E8B57", // sea green
    "#8B4513", // brown
    "#1E90FF", // dodger blue
];

/// Colour for the `index`-th discovered variable.
pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles() {
        assert_eq!(color_for(0), "#FF6384");
        assert_eq!(color_for(1), "#36A2EB");
        assert_eq!(color_for(PALETTE.len()), color_for(0));
        assert_eq!(color_for(PALETTE.len() * 3 + 2), color_for(2));
    }
}
