//! Edge-triggered near-bottom detection for infinite scroll

/// Default distance from the bottom that counts as "near" (pixels)
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 100.0;

/// Viewport geometry reported by the scroll container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub content_height: f64,
}

impl ScrollPosition {
    pub fn new(scroll_top: f64, viewport_height: f64, content_height: f64) -> Self {
        Self {
            scroll_top,
            viewport_height,
            content_height,
        }
    }

    /// Pixels between the bottom of the viewport and the end of the content
    pub fn distance_to_bottom(&self) -> f64 {
        (self.content_height - (self.scroll_top + self.viewport_height)).max(0.0)
    }
}

/// Fires once each time the viewport enters the near-bottom zone.
///
/// The trigger re-arms only after the viewport leaves the zone again, so a
/// burst of scroll events inside the zone yields a single fetch.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    threshold: f64,
    armed: bool,
}

impl ScrollTrigger {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            armed: true,
        }
    }

    /// Feed a scroll event; returns true when a fetch should start
    pub fn observe(&mut self, position: ScrollPosition) -> bool {
        let near_bottom = position.distance_to_bottom() <= self.threshold;
        if near_bottom && self.armed {
            self.armed = false;
            true
        } else {
            if !near_bottom {
                self.armed = true;
            }
            false
        }
    }

    /// Re-arm after the content is replaced (e.g. a reset load)
    pub fn rearm(&mut self) {
        self.armed = true;
    }
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_per_crossing() {
        let mut trigger = ScrollTrigger::default();

        assert!(!trigger.observe(ScrollPosition::new(0.0, 600.0, 2000.0)));
        assert!(trigger.observe(ScrollPosition::new(1350.0, 600.0, 2000.0)));
        // Still inside the zone
        assert!(!trigger.observe(ScrollPosition::new(1380.0, 600.0, 2000.0)));
        assert!(!trigger.observe(ScrollPosition::new(1400.0, 600.0, 2000.0)));

        // Content grew after the fetch, viewport is outside the zone again
        assert!(!trigger.observe(ScrollPosition::new(1400.0, 600.0, 3000.0)));
        assert!(trigger.observe(ScrollPosition::new(2350.0, 600.0, 3000.0)));
    }

    #[test]
    fn test_short_content_is_near_bottom() {
        let position = ScrollPosition::new(0.0, 800.0, 500.0);
        assert_eq!(position.distance_to_bottom(), 0.0);
    }
}
