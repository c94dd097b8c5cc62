//! Viewport Geometry
//!
//! Scroll and size information reported by the virtualizer, and the render
//! window handed back to it.

use std::ops::Range;

/// Viewport state at one scroll/resize tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    /// Scroll offset from the top, in pixels
    pub scroll_top: f32,
    /// Visible height, in pixels
    pub viewport_height: f32,
    /// Fixed row height, in pixels
    pub row_height: f32,
    /// Rows rendered beyond each edge of the viewport
    pub overscan_rows: usize,
}

/// Rows to render plus the spacer heights around them
#[derive(Debug, Clone, PartialEq)]
pub struct RenderWindow {
    pub rows: Range<usize>,
    pub pad_top: f32,
    pub pad_bottom: f32,
}

impl ViewportGeometry {
    pub fn new(scroll_top: f32, viewport_height: f32, row_height: f32, overscan_rows: usize) -> Self {
        Self {
            scroll_top,
            viewport_height,
            row_height,
            overscan_rows,
        }
    }

    /// Same geometry scrolled to a new offset
    pub fn scrolled_to(self, scroll_top: f32) -> Self {
        Self { scroll_top, ..self }
    }

    /// Same geometry with a new viewport height
    pub fn resized(self, viewport_height: f32) -> Self {
        Self {
            viewport_height,
            ..self
        }
    }

    fn row_height(&self) -> f32 {
        self.row_height.max(1.0)
    }

    fn scroll_top(&self) -> f32 {
        self.scroll_top.max(0.0)
    }

    /// Pixel offset of the furthest row the user may see soon
    pub fn lookahead_offset(&self) -> f32 {
        self.scroll_top()
            + self.viewport_height.max(0.0)
            + self.overscan_rows as f32 * self.row_height()
    }

    /// Page that the lookahead edge falls into, before clamping
    pub fn lookahead_page(&self, page_size: usize) -> usize {
        let page_height = page_size.max(1) as f32 * self.row_height();
        (self.lookahead_offset() / page_height).floor() as usize
    }

    /// Rows to render for a table of `total_rows`, with overscan on both sides
    pub fn render_window(&self, total_rows: usize) -> RenderWindow {
        let row_height = self.row_height();
        let first_visible = (self.scroll_top() / row_height).floor() as usize;
        let last_visible =
            ((self.scroll_top() + self.viewport_height.max(0.0)) / row_height).ceil() as usize;

        let end = last_visible
            .saturating_add(self.overscan_rows)
            .min(total_rows);
        let start = first_visible.saturating_sub(self.overscan_rows).min(end);

        RenderWindow {
            pad_top: start as f32 * row_height,
            pad_bottom: (total_rows - end) as f32 * row_height,
            rows: start..end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookahead_page() {
        // 20 rows visible, 10 overscan, page of 100 rows at 24px
        let geometry = ViewportGeometry::new(0.0, 480.0, 24.0, 10);
        assert_eq!(geometry.lookahead_page(100), 0);

        // bottom edge + overscan at row 230
        let geometry = geometry.scrolled_to(200.0 * 24.0);
        assert_eq!(geometry.lookahead_page(100), 2);
    }

    #[test]
    fn test_render_window_in_middle() {
        let geometry = ViewportGeometry::new(100.0 * 24.0, 480.0, 24.0, 5);
        let window = geometry.render_window(1000);
        assert_eq!(window.rows, 95..125);
        assert_eq!(window.pad_top, 95.0 * 24.0);
        assert_eq!(window.pad_bottom, 875.0 * 24.0);
    }

    #[test]
    fn test_render_window_clamps_to_table() {
        let geometry = ViewportGeometry::new(5_000.0, 480.0, 24.0, 5);
        let window = geometry.render_window(10);
        assert_eq!(window.rows, 10..10);
        assert_eq!(window.pad_bottom, 0.0);
    }

    #[test]
    fn test_negative_scroll_is_top() {
        let geometry = ViewportGeometry::new(-40.0, 48.0, 24.0, 0);
        assert_eq!(geometry.render_window(100).rows, 0..2);
    }
}
