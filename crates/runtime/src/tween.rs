use std::fmt;
use std::rc::Rc;

use foundation::math::Vec3;
use foundation::time::{Time, TimeSpan};
use tracing::debug;

use crate::ease::Ease;
use crate::frame::Frame;
use crate::scroll::{PageLayout, ScrollTrigger};

/// A `Vec3` property a tween can read and write.
///
/// Implementations are shared handles (`&self` setters); the tween engine
/// never owns the animated value.
pub trait TweenTarget {
    fn get(&self) -> Vec3;
    fn set(&self, value: Vec3);
}

/// Invoked synchronously after every step that writes a value.
pub type UpdateCallback = Rc<dyn Fn()>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TweenId(u64);

/// What moves a tween's progress forward.
#[derive(Debug, Clone, PartialEq)]
pub enum TweenDriver {
    /// Wall-clock tween over a fixed duration.
    Timed { duration_s: f64 },
    /// Progress follows the scroll position through a section.
    Scroll(ScrollTrigger),
}

pub struct TweenSpec {
    target: Rc<dyn TweenTarget>,
    to: Vec3,
    driver: TweenDriver,
    ease: Ease,
    on_update: Option<UpdateCallback>,
    channel: Option<&'static str>,
    immediate_render: bool,
}

impl TweenSpec {
    pub fn timed(target: Rc<dyn TweenTarget>, to: Vec3, duration_s: f64) -> Self {
        Self {
            target,
            to,
            driver: TweenDriver::Timed {
                duration_s: duration_s.max(0.0),
            },
            ease: Ease::Power1Out,
            on_update: None,
            channel: None,
            immediate_render: false,
        }
    }

    pub fn scroll(target: Rc<dyn TweenTarget>, to: Vec3, trigger: ScrollTrigger) -> Self {
        Self {
            target,
            to,
            driver: TweenDriver::Scroll(trigger),
            ease: Ease::Linear,
            on_update: None,
            channel: None,
            immediate_render: false,
        }
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn on_update(mut self, callback: UpdateCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    /// Tweens sharing a channel replace each other: adding one cancels any
    /// in-flight tween already on the channel.
    pub fn channel(mut self, channel: &'static str) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Capture the start value and render progress 0 at registration
    /// instead of on the first step.
    pub fn immediate_render(mut self, immediate: bool) -> Self {
        self.immediate_render = immediate;
        self
    }

    pub fn destination(&self) -> Vec3 {
        self.to
    }

    pub fn driver(&self) -> &TweenDriver {
        &self.driver
    }
}

impl fmt::Debug for TweenSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenSpec")
            .field("to", &self.to)
            .field("driver", &self.driver)
            .field("ease", &self.ease)
            .field("channel", &self.channel)
            .field("immediate_render", &self.immediate_render)
            .finish_non_exhaustive()
    }
}

struct ActiveTween {
    id: TweenId,
    spec: TweenSpec,
    /// Start value; captured on first render.
    from: Option<Vec3>,
    /// Timed tweens only: when the clock started.
    span: Option<TimeSpan>,
    /// Scroll tweens only: scrub-smoothed progress last applied.
    applied: f64,
}

impl ActiveTween {
    fn render(&mut self, progress: f64) {
        let from = *self.from.get_or_insert_with(|| self.spec.target.get());
        let value = from.lerp(self.spec.to, self.spec.ease.apply(progress));
        self.spec.target.set(value);
        if let Some(cb) = &self.spec.on_update {
            cb();
        }
    }
}

/// Per-step outcome, mostly for logging and tests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct StepSummary {
    pub writes: usize,
    pub completed: usize,
}

/// Drives timed and scroll-bound tweens, one step per frame.
///
/// Tweens run in registration order, so when two tweens write the same
/// property in one step the later-registered one wins.
#[derive(Default)]
pub struct TweenEngine {
    next_id: u64,
    tweens: Vec<ActiveTween>,
    now: Time,
    scroll_y: f64,
    scroll_suspended: bool,
}

impl TweenEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, spec: TweenSpec) -> TweenId {
        if let Some(channel) = spec.channel {
            let cancelled = self.cancel_channel(channel);
            if cancelled > 0 {
                debug!("tween channel {channel}: cancelled {cancelled} in-flight tween(s)");
            }
        }

        let id = TweenId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let span = match spec.driver {
            TweenDriver::Timed { duration_s } => Some(TimeSpan::starting_at(self.now, duration_s)),
            TweenDriver::Scroll(_) => None,
        };
        let immediate = spec.immediate_render;
        let mut tween = ActiveTween {
            id,
            spec,
            from: None,
            span,
            applied: 0.0,
        };
        if immediate {
            tween.render(0.0);
        }
        self.tweens.push(tween);
        id
    }

    /// Removes every tween on `channel`, returning how many were dropped.
    pub fn cancel_channel(&mut self, channel: &str) -> usize {
        let before = self.tweens.len();
        self.tweens.retain(|t| t.spec.channel != Some(channel));
        before - self.tweens.len()
    }

    pub fn set_scroll(&mut self, scroll_y: f64) {
        if scroll_y.is_finite() {
            self.scroll_y = scroll_y.max(0.0);
        }
    }

    pub fn scroll(&self) -> f64 {
        self.scroll_y
    }

    /// Suspended scroll tweens neither advance nor write; timed tweens are
    /// unaffected.
    pub fn set_scroll_suspended(&mut self, suspended: bool) {
        self.scroll_suspended = suspended;
    }

    pub fn is_scroll_suspended(&self) -> bool {
        self.scroll_suspended
    }

    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    pub fn contains(&self, id: TweenId) -> bool {
        self.tweens.iter().any(|t| t.id == id)
    }

    pub fn timed_in_flight(&self) -> usize {
        self.tweens.iter().filter(|t| t.span.is_some()).count()
    }

    pub fn step(&mut self, frame: Frame, layout: &dyn PageLayout) -> StepSummary {
        self.now = frame.time;
        let mut summary = StepSummary::default();
        let scroll_y = self.scroll_y;
        let suspended = self.scroll_suspended;

        for tween in &mut self.tweens {
            if let Some(span) = tween.span {
                let progress = span.progress_at(frame.time);
                tween.render(progress);
                summary.writes += 1;
                if progress >= 1.0 {
                    summary.completed += 1;
                }
                continue;
            }
            if suspended {
                continue;
            }
            let TweenDriver::Scroll(trigger) = &tween.spec.driver else {
                continue;
            };
            let Some(raw) = trigger.raw_progress(scroll_y, layout) else {
                continue;
            };
            let next = trigger.scrub.step(tween.applied, raw, frame.dt_s);
            // A scroll tween stays dormant until its progress first leaves
            // zero, and skips frames where nothing moved.
            let unchanged = next == tween.applied;
            if unchanged && (tween.from.is_some() || next == 0.0) {
                continue;
            }
            tween.applied = next;
            tween.render(next);
            summary.writes += 1;
        }

        if summary.completed > 0 {
            self.tweens.retain(|t| match t.span {
                Some(span) => span.progress_at(frame.time) < 1.0,
                None => true,
            });
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll::{LayoutSnapshot, ScrollEdge, Scrub, SectionBounds};
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Probe {
        value: RefCell<Vec3>,
        writes: Cell<usize>,
    }

    impl TweenTarget for Probe {
        fn get(&self) -> Vec3 {
            *self.value.borrow()
        }

        fn set(&self, value: Vec3) {
            *self.value.borrow_mut() = value;
            self.writes.set(self.writes.get() + 1);
        }
    }

    fn layout() -> LayoutSnapshot {
        LayoutSnapshot::new(1000.0).with_section(".section", SectionBounds::new(1000.0, 1000.0))
    }

    fn trigger(scrub: f64) -> ScrollTrigger {
        ScrollTrigger::new(".section", ScrollEdge::TOP_BOTTOM, ScrollEdge::TOP_TOP, Scrub(scrub))
    }

    fn counter() -> (UpdateCallback, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (Rc::new(move || c.set(c.get() + 1)), count)
    }

    #[test]
    fn timed_tween_reaches_destination_and_retires() {
        let probe = Rc::new(Probe::default());
        let (cb, updates) = counter();
        let mut engine = TweenEngine::new();
        engine.add(TweenSpec::timed(probe.clone(), Vec3::new(2.0, 0.0, 0.0), 1.0).on_update(cb));

        let layout = layout();
        let mut frame = Frame::origin();
        frame = frame.advance(0.5);
        engine.step(frame, &layout);
        let mid = probe.get().x;
        assert!(mid > 1.0 && mid < 2.0, "ease-out leads linear: {mid}");

        frame = frame.advance(0.5);
        let summary = engine.step(frame, &layout);
        assert_eq!(summary.completed, 1);
        assert_eq!(probe.get(), Vec3::new(2.0, 0.0, 0.0));
        assert!(engine.is_empty());
        assert_eq!(updates.get(), 2);
    }

    #[test]
    fn start_value_is_captured_on_first_step() {
        let probe = Rc::new(Probe::default());
        let mut engine = TweenEngine::new();
        engine.add(TweenSpec::timed(probe.clone(), Vec3::new(10.0, 0.0, 0.0), 1.0).ease(Ease::Linear));
        probe.set(Vec3::new(4.0, 0.0, 0.0));

        engine.step(Frame::origin().advance(0.5), &layout());
        assert!(probe.get().approx_eq(Vec3::new(7.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn channel_cancels_in_flight_tween() {
        let probe = Rc::new(Probe::default());
        let mut engine = TweenEngine::new();
        let first = engine.add(TweenSpec::timed(probe.clone(), Vec3::new(1.0, 1.0, 1.0), 2.0).channel("pose"));
        let second = engine.add(TweenSpec::timed(probe.clone(), Vec3::new(5.0, 5.0, 5.0), 2.0).channel("pose"));
        assert!(!engine.contains(first));
        assert!(engine.contains(second));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn unchannelled_tweens_race_and_the_later_one_wins() {
        let probe = Rc::new(Probe::default());
        let (cb_a, a) = counter();
        let (cb_b, b) = counter();
        let mut engine = TweenEngine::new();
        engine.add(TweenSpec::timed(probe.clone(), Vec3::new(1.0, 0.0, 0.0), 1.0).on_update(cb_a));
        engine.add(TweenSpec::timed(probe.clone(), Vec3::new(9.0, 0.0, 0.0), 1.0).on_update(cb_b));

        let mut frame = Frame::origin();
        for _ in 0..4 {
            frame = frame.advance(0.25);
            engine.step(frame, &layout());
        }
        assert_eq!(probe.get(), Vec3::new(9.0, 0.0, 0.0));
        assert_eq!(a.get(), 4);
        assert_eq!(b.get(), 4);
    }

    #[test]
    fn scroll_tween_is_dormant_until_its_section_is_reached() {
        let probe = Rc::new(Probe::default());
        let mut engine = TweenEngine::new();
        engine.add(TweenSpec::scroll(probe.clone(), Vec3::new(0.0, 10.0, 0.0), trigger(0.0)));

        engine.set_scroll(0.0);
        engine.step(Frame::origin().advance(0.016), &layout());
        assert_eq!(probe.writes.get(), 0);

        engine.set_scroll(500.0);
        engine.step(Frame::origin().advance(0.016), &layout());
        assert!(probe.get().approx_eq(Vec3::new(0.0, 5.0, 0.0), 1e-12));

        // No scroll movement: no redundant write.
        engine.step(Frame::origin().advance(0.016), &layout());
        assert_eq!(probe.writes.get(), 1);

        // Scrolling back above the section restores the captured start.
        engine.set_scroll(0.0);
        engine.step(Frame::origin().advance(0.016), &layout());
        assert_eq!(probe.get(), Vec3::ZERO);
    }

    #[test]
    fn scrubbed_scroll_tween_lags_behind_the_page() {
        let probe = Rc::new(Probe::default());
        let mut engine = TweenEngine::new();
        engine.add(TweenSpec::scroll(probe.clone(), Vec3::new(0.0, 10.0, 0.0), trigger(2.0)));
        engine.set_scroll(1000.0);

        let mut frame = Frame::origin();
        frame = frame.advance(1.0 / 60.0);
        engine.step(frame, &layout());
        assert!(probe.get().y > 0.0 && probe.get().y < 1.0);

        for _ in 0..1200 {
            frame = frame.advance(1.0 / 60.0);
            engine.step(frame, &layout());
        }
        assert_eq!(probe.get(), Vec3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn suspended_scroll_tweens_do_not_write() {
        let probe = Rc::new(Probe::default());
        let mut engine = TweenEngine::new();
        engine.add(TweenSpec::scroll(probe.clone(), Vec3::new(0.0, 10.0, 0.0), trigger(0.0)));
        engine.set_scroll_suspended(true);
        engine.set_scroll(1000.0);
        engine.step(Frame::origin().advance(0.016), &layout());
        assert_eq!(probe.writes.get(), 0);

        engine.set_scroll_suspended(false);
        engine.step(Frame::origin().advance(0.016), &layout());
        assert_eq!(probe.get(), Vec3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn immediate_render_writes_start_value_on_add() {
        let probe = Rc::new(Probe::default());
        probe.set(Vec3::new(1.0, 2.0, 3.0));
        let (cb, updates) = counter();
        let mut engine = TweenEngine::new();
        engine.add(
            TweenSpec::scroll(probe.clone(), Vec3::ZERO, trigger(0.0))
                .immediate_render(true)
                .on_update(cb),
        );
        assert_eq!(probe.writes.get(), 2);
        assert_eq!(probe.get(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(updates.get(), 1);
    }
}
