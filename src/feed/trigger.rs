//! Visibility triggers for the list sentinels.
//!
//! A sentinel is a zero-content row placed after the last post (forward) or
//! before the first (backward). The trigger watches its geometry against the
//! viewport and fires once per visibility event.

/// A vertical extent in layout pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub top: f64,
    pub height: f64,
}

impl Span {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Fraction of `self` that lies inside `other`, in `[0, 1]`.
    pub fn visible_fraction(&self, other: &Span) -> f64 {
        if self.height <= 0.0 {
            // A zero-height sentinel counts as fully visible once inside
            return if self.top >= other.top && self.top <= other.bottom() {
                1.0
            } else {
                0.0
            };
        }
        let overlap = self.bottom().min(other.bottom()) - self.top.max(other.top);
        (overlap / self.height).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerConfig {
    /// Margin added above and below the viewport, in pixels.
    pub root_margin: f64,
    /// Fraction of the sentinel that must be inside the expanded viewport.
    pub threshold: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            root_margin: 200.0,
            threshold: 0.5,
        }
    }
}

/// Edge-triggered observer for one sentinel.
#[derive(Debug, Clone)]
pub struct VisibilityTrigger {
    config: TriggerConfig,
    armed: bool,
    window_key: Option<usize>,
}

impl VisibilityTrigger {
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            armed: true,
            window_key: None,
        }
    }

    pub fn is_visible(&self, sentinel: Span, viewport: Span) -> bool {
        let expanded = Span::new(
            viewport.top - self.config.root_margin,
            viewport.height + 2.0 * self.config.root_margin,
        );
        sentinel.visible_fraction(&expanded) >= self.config.threshold
    }

    /// Feed one observation. Returns true when the slide should be requested.
    ///
    /// `window_key` identifies the current window (its start); a change re-arms
    /// the trigger so that a sentinel still on screen after a slide can fire
    /// again.
    pub fn observe(
        &mut self,
        sentinel: Span,
        viewport: Span,
        has_more: bool,
        busy: bool,
        window_key: usize,
    ) -> bool {
        if self.window_key != Some(window_key) {
            self.window_key = Some(window_key);
            self.armed = true;
        }
        if !self.is_visible(sentinel, viewport) {
            self.armed = true;
            return false;
        }
        if !self.armed || !has_more || busy {
            return false;
        }
        self.armed = false;
        true
    }

    /// Allow the next observation to fire again, e.g. after a slide was
    /// refused because of the cooldown.
    pub fn rearm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Default for VisibilityTrigger {
    fn default() -> Self {
        Self::new(TriggerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Span = Span {
        top: 0.0,
        height: 800.0,
    };

    #[test]
    fn test_visible_fraction() {
        let sentinel = Span::new(950.0, 100.0);
        let expanded = Span::new(-200.0, 1200.0);
        assert_eq!(sentinel.visible_fraction(&expanded), 0.5);
        assert_eq!(Span::new(2000.0, 100.0).visible_fraction(&expanded), 0.0);
        assert_eq!(Span::new(0.0, 100.0).visible_fraction(&expanded), 1.0);
    }

    #[test]
    fn test_margin_extends_viewport() {
        let trigger = VisibilityTrigger::default();
        // Below the viewport but inside the 200px margin
        assert!(trigger.is_visible(Span::new(900.0, 48.0), VIEWPORT));
        assert!(!trigger.is_visible(Span::new(1100.0, 48.0), VIEWPORT));
    }

    #[test]
    fn test_fires_once_per_visibility_event() {
        let mut trigger = VisibilityTrigger::default();
        let sentinel = Span::new(700.0, 48.0);

        assert!(trigger.observe(sentinel, VIEWPORT, true, false, 0));
        assert!(!trigger.observe(sentinel, VIEWPORT, true, false, 0));

        // Leaving and re-entering fires again
        let far = Span::new(5000.0, 48.0);
        assert!(!trigger.observe(far, VIEWPORT, true, false, 0));
        assert!(trigger.observe(sentinel, VIEWPORT, true, false, 0));
    }

    #[test]
    fn test_window_move_rearms() {
        let mut trigger = VisibilityTrigger::default();
        let sentinel = Span::new(700.0, 48.0);

        assert!(trigger.observe(sentinel, VIEWPORT, true, false, 0));
        assert!(trigger.observe(sentinel, VIEWPORT, true, false, 20));
    }

    #[test]
    fn test_guards_do_not_consume_event() {
        let mut trigger = VisibilityTrigger::default();
        let sentinel = Span::new(700.0, 48.0);

        assert!(!trigger.observe(sentinel, VIEWPORT, false, false, 0));
        assert!(!trigger.observe(sentinel, VIEWPORT, true, true, 0));
        assert!(trigger.observe(sentinel, VIEWPORT, true, false, 0));
    }

    #[test]
    fn test_rearm_after_refusal() {
        let mut trigger = VisibilityTrigger::default();
        let sentinel = Span::new(700.0, 48.0);

        assert!(trigger.observe(sentinel, VIEWPORT, true, false, 0));
        trigger.rearm();
        assert!(trigger.is_armed());
        assert!(trigger.observe(sentinel, VIEWPORT, true, false, 0));
    }
}
