//! Single-item chart carousel.

use serde::Serialize;
use time::OffsetDateTime;

/// A chart produced by a tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRecord {
    /// Data URI, blob URL or remote URL
    pub url: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

/// Append-only chart list with a cursor selecting the visible chart.
///
/// The cursor stays within `[0, max(0, len - 1)]`.
#[derive(Debug, Clone, Default)]
pub struct ChartCarousel {
    charts: Vec<ChartRecord>,
    cursor: usize,
}

impl ChartCarousel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chart and show it.
    pub fn add_chart(&mut self, url: impl Into<String>) {
        self.charts.push(ChartRecord {
            url: url.into(),
            created_at: OffsetDateTime::now_utc(),
        });
        self.cursor = self.charts.len() - 1;
    }

    pub fn show_previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn show_next(&mut self) {
        let last = self.charts.len().saturating_sub(1);
        self.cursor = (self.cursor + 1).min(last);
    }

    /// The chart under the cursor.
    pub fn current(&self) -> Option<&ChartRecord> {
        self.charts.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn charts(&self) -> &[ChartRecord] {
        &self.charts
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.charts.len()
    }

    pub fn clear(&mut self) {
        self.charts.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_in_bounds(carousel: &ChartCarousel) {
        assert!(carousel.cursor() <= carousel.len().saturating_sub(1));
    }

    #[test]
    fn test_empty_carousel_navigation_is_noop() {
        let mut carousel = ChartCarousel::new();
        carousel.show_next();
        carousel.show_previous();
        assert_eq!(carousel.cursor(), 0);
        assert!(carousel.current().is_none());
    }

    #[test]
    fn test_add_moves_cursor_to_newest() {
        let mut carousel = ChartCarousel::new();
        carousel.add_chart("a.png");
        carousel.add_chart("b.png");
        assert_eq!(carousel.cursor(), 1);
        assert_eq!(carousel.current().unwrap().url, "b.png");

        carousel.show_previous();
        carousel.add_chart("c.png");
        assert_eq!(carousel.cursor(), 2);
    }

    #[test]
    fn test_boundaries_are_noops() {
        let mut carousel = ChartCarousel::new();
        carousel.add_chart("a.png");
        carousel.add_chart("b.png");

        carousel.show_next();
        assert_eq!(carousel.cursor(), 1);
        assert!(!carousel.has_next());

        carousel.show_previous();
        carousel.show_previous();
        assert_eq!(carousel.cursor(), 0);
        assert!(!carousel.has_previous());
        assert_eq!(carousel.current().unwrap().url, "a.png");
    }

    #[test]
    fn test_cursor_stays_in_bounds_for_mixed_sequence() {
        let mut carousel = ChartCarousel::new();
        let ops = "nppanpnaaannnppppan";
        for op in ops.chars() {
            match op {
                'a' => carousel.add_chart(format!("{}.png", carousel.len())),
                'n' => carousel.show_next(),
                _ => carousel.show_previous(),
            }
            assert_in_bounds(&carousel);
        }
    }

    #[test]
    fn test_clear_resets_cursor() {
        let mut carousel = ChartCarousel::new();
        carousel.add_chart("a.png");
        carousel.add_chart("b.png");
        carousel.clear();
        assert!(carousel.is_empty());
        assert_eq!(carousel.cursor(), 0);
    }
}
