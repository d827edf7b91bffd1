//! Scroll-trigger geometry: where on the page a section-bound animation
//! starts and ends, and how far through that range the page currently is.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fraction of the remaining gap a scrub still leaves after `scrub` seconds.
const SCRUB_RESIDUAL: f64 = 0.02;

/// Below this gap a scrubbed value snaps onto the raw progress.
const SCRUB_SNAP_EPSILON: f64 = 1e-4;

/// A point along an element or along the viewport.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Anchor {
    /// Fraction of the extent: `top` = 0, `center` = 0.5, `bottom` = 1.
    Fraction(f64),
    /// Absolute offset from the top, in CSS pixels.
    Pixels(f64),
}

impl Anchor {
    pub const TOP: Anchor = Anchor::Fraction(0.0);
    pub const CENTER: Anchor = Anchor::Fraction(0.5);
    pub const BOTTOM: Anchor = Anchor::Fraction(1.0);

    pub fn offset(self, extent: f64) -> f64 {
        match self {
            Anchor::Fraction(f) => f * extent,
            Anchor::Pixels(px) => px,
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "top" => return Some(Anchor::TOP),
            "center" => return Some(Anchor::CENTER),
            "bottom" => return Some(Anchor::BOTTOM),
            _ => {}
        }
        if let Some(pct) = token.strip_suffix('%') {
            return pct
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| Anchor::Fraction(v / 100.0));
        }
        if let Some(px) = token.strip_suffix("px") {
            return px
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Anchor::Pixels);
        }
        None
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Anchor::Fraction(v) if v == 0.0 => write!(f, "top"),
            Anchor::Fraction(v) if v == 0.5 => write!(f, "center"),
            Anchor::Fraction(v) if v == 1.0 => write!(f, "bottom"),
            Anchor::Fraction(v) => write!(f, "{}%", v * 100.0),
            Anchor::Pixels(px) => write!(f, "{px}px"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeParseError {
    pub input: String,
    pub reason: &'static str,
}

impl fmt::Display for EdgeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid scroll edge {:?}: {}", self.input, self.reason)
    }
}

impl std::error::Error for EdgeParseError {}

/// `"<element-anchor> <viewport-anchor>"`, e.g. `"top bottom"`: fires when
/// the element's top meets the viewport's bottom.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScrollEdge {
    pub element: Anchor,
    pub viewport: Anchor,
}

impl ScrollEdge {
    pub const fn new(element: Anchor, viewport: Anchor) -> Self {
        Self { element, viewport }
    }

    /// Element top enters the viewport from below.
    pub const TOP_BOTTOM: ScrollEdge = ScrollEdge::new(Anchor::TOP, Anchor::BOTTOM);

    /// Element top reaches the top of the viewport.
    pub const TOP_TOP: ScrollEdge = ScrollEdge::new(Anchor::TOP, Anchor::TOP);

    /// Page scroll offset at which this edge is crossed.
    pub fn scroll_position(&self, section: SectionBounds, viewport_height: f64) -> f64 {
        section.top + self.element.offset(section.height) - self.viewport.offset(viewport_height)
    }
}

impl FromStr for ScrollEdge {
    type Err = EdgeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| EdgeParseError {
            input: s.to_string(),
            reason,
        };
        let mut tokens = s.split_whitespace();
        let first = tokens.next().ok_or_else(|| err("empty edge"))?;
        let second = tokens.next();
        if tokens.next().is_some() {
            return Err(err("expected at most two anchors"));
        }
        let element = Anchor::parse(first).ok_or_else(|| err("unknown element anchor"))?;
        let viewport = match second {
            Some(tok) => Anchor::parse(tok).ok_or_else(|| err("unknown viewport anchor"))?,
            None => element,
        };
        Ok(Self { element, viewport })
    }
}

impl fmt::Display for ScrollEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.element, self.viewport)
    }
}

/// Position of a page section, in document coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SectionBounds {
    pub top: f64,
    pub height: f64,
}

impl SectionBounds {
    pub fn new(top: f64, height: f64) -> Self {
        Self {
            top,
            height: height.max(0.0),
        }
    }
}

/// Read access to the page geometry triggers are resolved against.
pub trait PageLayout {
    fn section(&self, selector: &str) -> Option<SectionBounds>;
    fn viewport_height(&self) -> f64;
}

/// A measured snapshot of the page. The web front end re-measures on resize;
/// tests build one by hand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutSnapshot {
    sections: BTreeMap<String, SectionBounds>,
    viewport_height: f64,
}

impl LayoutSnapshot {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            sections: BTreeMap::new(),
            viewport_height: viewport_height.max(0.0),
        }
    }

    pub fn with_section(mut self, selector: impl Into<String>, bounds: SectionBounds) -> Self {
        self.insert(selector, bounds);
        self
    }

    pub fn insert(&mut self, selector: impl Into<String>, bounds: SectionBounds) {
        self.sections.insert(selector.into(), bounds);
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl PageLayout for LayoutSnapshot {
    fn section(&self, selector: &str) -> Option<SectionBounds> {
        self.sections.get(selector).copied()
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }
}

/// Seconds a scrubbed animation takes to catch up with the scrollbar.
/// Zero tracks the scrollbar exactly.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Scrub(pub f64);

impl Scrub {
    pub const NONE: Scrub = Scrub(0.0);

    /// Moves `applied` toward `raw` for a frame of `dt_s` seconds.
    pub fn step(self, applied: f64, raw: f64, dt_s: f64) -> f64 {
        if self.0 <= 0.0 || !self.0.is_finite() {
            return raw;
        }
        let rate = -SCRUB_RESIDUAL.ln() / self.0;
        let alpha = 1.0 - (-rate * dt_s.max(0.0)).exp();
        let next = applied + (raw - applied) * alpha;
        if (raw - next).abs() < SCRUB_SNAP_EPSILON {
            raw
        } else {
            next
        }
    }
}

/// Binds an animation's progress to the scroll range of a page section.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollTrigger {
    pub selector: String,
    pub start: ScrollEdge,
    pub end: ScrollEdge,
    pub scrub: Scrub,
}

impl ScrollTrigger {
    pub fn new(selector: impl Into<String>, start: ScrollEdge, end: ScrollEdge, scrub: Scrub) -> Self {
        Self {
            selector: selector.into(),
            start,
            end,
            scrub,
        }
    }

    /// Scroll offsets where progress is 0 and 1. `None` while the section
    /// is not part of the layout.
    pub fn range(&self, layout: &dyn PageLayout) -> Option<(f64, f64)> {
        let section = layout.section(&self.selector)?;
        let vh = layout.viewport_height();
        Some((
            self.start.scroll_position(section, vh),
            self.end.scroll_position(section, vh),
        ))
    }

    /// Unsmoothed progress in `[0, 1]` for the given scroll offset.
    pub fn raw_progress(&self, scroll_y: f64, layout: &dyn PageLayout) -> Option<f64> {
        let (start, end) = self.range(layout)?;
        if end <= start {
            return Some(if scroll_y >= start { 1.0 } else { 0.0 });
        }
        Some(((scroll_y - start) / (end - start)).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn layout() -> LayoutSnapshot {
        LayoutSnapshot::new(800.0)
            .with_section(".sound-section", SectionBounds::new(1000.0, 900.0))
            .with_section(".display-section", SectionBounds::new(2000.0, 900.0))
    }

    #[test]
    fn parses_keyword_percent_and_pixel_anchors() {
        assert_eq!("top bottom".parse::<ScrollEdge>().unwrap(), ScrollEdge::TOP_BOTTOM);
        assert_eq!("top top".parse::<ScrollEdge>().unwrap(), ScrollEdge::TOP_TOP);
        assert_eq!(
            "25% 100px".parse::<ScrollEdge>().unwrap(),
            ScrollEdge::new(Anchor::Fraction(0.25), Anchor::Pixels(100.0))
        );
        assert_eq!(
            "center".parse::<ScrollEdge>().unwrap(),
            ScrollEdge::new(Anchor::CENTER, Anchor::CENTER)
        );
    }

    #[test]
    fn rejects_malformed_edges() {
        assert!("".parse::<ScrollEdge>().is_err());
        assert!("top bottom left".parse::<ScrollEdge>().is_err());
        let err = "middle top".parse::<ScrollEdge>().unwrap_err();
        assert_eq!(err.reason, "unknown element anchor");
        assert!("top nanpx".parse::<ScrollEdge>().is_err());
    }

    #[test]
    fn edge_display_round_trips_keywords() {
        assert_eq!(ScrollEdge::TOP_BOTTOM.to_string(), "top bottom");
    }

    #[test]
    fn top_bottom_to_top_top_spans_one_viewport() {
        let trigger = ScrollTrigger::new(
            ".display-section",
            ScrollEdge::TOP_BOTTOM,
            ScrollEdge::TOP_TOP,
            Scrub(2.0),
        );
        assert_eq!(trigger.range(&layout()), Some((1200.0, 2000.0)));
        assert_eq!(trigger.raw_progress(0.0, &layout()), Some(0.0));
        assert_eq!(trigger.raw_progress(1600.0, &layout()), Some(0.5));
        assert_eq!(trigger.raw_progress(5000.0, &layout()), Some(1.0));
    }

    #[test]
    fn missing_section_is_inactive() {
        let trigger = ScrollTrigger::new(".nope", ScrollEdge::TOP_BOTTOM, ScrollEdge::TOP_TOP, Scrub::NONE);
        assert_eq!(trigger.raw_progress(100.0, &layout()), None);
    }

    #[test]
    fn degenerate_range_is_a_step() {
        let trigger = ScrollTrigger::new(
            ".sound-section",
            ScrollEdge::TOP_TOP,
            ScrollEdge::TOP_TOP,
            Scrub::NONE,
        );
        assert_eq!(trigger.raw_progress(999.0, &layout()), Some(0.0));
        assert_eq!(trigger.raw_progress(1000.0, &layout()), Some(1.0));
    }

    #[test]
    fn scrub_lags_then_settles() {
        let scrub = Scrub(2.0);
        let first = scrub.step(0.0, 1.0, 1.0 / 60.0);
        assert!(first > 0.0 && first < 0.1);

        let mut applied = 0.0;
        for _ in 0..120 {
            applied = scrub.step(applied, 1.0, 1.0 / 60.0);
        }
        assert!((1.0 - applied) <= SCRUB_RESIDUAL + 1e-9);

        for _ in 0..600 {
            applied = scrub.step(applied, 1.0, 1.0 / 60.0);
        }
        assert_eq!(applied, 1.0);
    }

    #[test]
    fn zero_scrub_tracks_raw_progress() {
        assert_eq!(Scrub::NONE.step(0.1, 0.7, 0.016), 0.7);
    }
}
