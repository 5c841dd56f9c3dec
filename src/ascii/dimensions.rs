//! Render-region geometry.

use std::fmt;

/// Default render width in characters when none is requested.
pub const DEFAULT_DISPLAY_WIDTH: u16 = 70;

/// Default render height in characters when none is requested.
pub const DEFAULT_DISPLAY_HEIGHT: u16 = 35;

/// Effective terminal render size, one character per decoded pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u16,
    pub height: u16,
}

impl DisplayGeometry {
    /// Clamp a requested size so neither side is below its minimum.
    ///
    /// # Example
    /// ```ignore
    /// let geometry = DisplayGeometry::clamped(0, 0, 20, 10);
    /// assert_eq!((geometry.width, geometry.height), (20, 10));
    /// ```
    pub fn clamped(width: u16, height: u16, min_width: u16, min_height: u16) -> Self {
        Self {
            width: width.max(min_width).max(1),
            height: height.max(min_height).max(1),
        }
    }

    /// Byte size of one raw single-channel frame at this geometry.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self {
            width: DEFAULT_DISPLAY_WIDTH,
            height: DEFAULT_DISPLAY_HEIGHT,
        }
    }
}

impl fmt::Display for DisplayGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_raises_to_minimums() {
        let geometry = DisplayGeometry::clamped(0, 0, 20, 10);
        assert_eq!(geometry, DisplayGeometry { width: 20, height: 10 });
    }

    #[test]
    fn test_clamped_keeps_larger_sizes() {
        let geometry = DisplayGeometry::clamped(120, 40, 20, 10);
        assert_eq!(geometry, DisplayGeometry { width: 120, height: 40 });
    }

    #[test]
    fn test_clamped_never_zero() {
        let geometry = DisplayGeometry::clamped(0, 0, 0, 0);
        assert_eq!(geometry.frame_len(), 1);
    }

    #[test]
    fn test_frame_len_and_display() {
        let geometry = DisplayGeometry::default();
        assert_eq!(geometry.frame_len(), 70 * 35);
        assert_eq!(geometry.to_string(), "70x35");
    }
}
