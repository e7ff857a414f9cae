//! The two-press selection machine.
//!
//! First press of a digit arms the matching on-screen card and highlights it;
//! a second press of the same digit opens it. Anything that makes the armed
//! card's position untrustworthy - scrolling, page mutations, the card
//! leaving the viewport - invalidates the arming instead of opening the wrong
//! thing. Deliberate dismissals (Escape, clicking elsewhere, switching to a
//! different digit) fade the highlight out; invalidations and opens clear it
//! instantly.

use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::geometry;
use crate::highlight::{self, HighlightSpec};
use crate::page::{ElementId, Page};
use crate::scanner;
use crate::timers::{TaskKind, TaskQueue};

/// Two Escape presses at most this far apart navigate home.
pub const DOUBLE_ESC_WINDOW_MS: u64 = 400;

/// An armed card below this area-visibility is scrolled toward the viewport
/// center, so the user can see what a confirming press would open.
const SCROLL_INTO_VIEW_BELOW: f64 = 0.5;

/// The first three indices are always near the top of the screen already and
/// never auto-scroll.
const AUTO_SCROLL_FROM_INDEX: usize = 3;

/// The armed candidate: an index into the most recent scan plus the element
/// that occupied it. Holding both is what makes a same-key second press
/// verifiable - the element must still sit at the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Armed {
    pub index: usize,
    pub element: ElementId,
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    element: ElementId,
    started: Instant,
}

/// What a transition did, for the caller's status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Armed { index: usize },
    Opened { index: usize },
    WentHome,
    Cleared,
}

#[derive(Default)]
pub struct SelectionMachine {
    armed: Option<Armed>,
    /// Last digit pressed; a repeat of it while armed confirms the open.
    pending_key: Option<u8>,
    last_escape: Option<Instant>,
    /// Highlight currently fading out. At most one; a new highlight waits
    /// behind it rather than overlapping.
    fade: Option<Fade>,
    /// Digit to arm once the running fade completes.
    queued_arm: Option<u8>,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> Option<Armed> {
        self.armed
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// A digit key 1-9 was pressed.
    pub fn handle_digit(
        &mut self,
        digit: u8,
        page: &mut dyn Page,
        tasks: &mut TaskQueue,
        settings: &Settings,
        now: Instant,
    ) -> Effect {
        if !settings.enable_number_keys || !(1..=9).contains(&digit) {
            return Effect::None;
        }

        match self.armed {
            Some(armed) if self.pending_key == Some(digit) => {
                if self.confirm_is_valid(armed, page) {
                    self.clear_immediate(page, tasks);
                    if let Err(err) = page.open(armed.element) {
                        log::warn!("selection: open failed: {err:#}");
                    }
                    highlight::refresh_badges(page, settings, None);
                    Effect::Opened { index: armed.index }
                } else {
                    // The page shifted under the arming; drop it and treat
                    // this press as a fresh first press.
                    log::debug!("selection: stale arming at index {}", armed.index);
                    self.clear_immediate(page, tasks);
                    self.arm(digit, page, settings)
                }
            }
            Some(_) => {
                // Different digit: fade the old highlight out, arm the new
                // index when the fade completes.
                self.begin_fade(tasks, now);
                self.queued_arm = Some(digit);
                self.pending_key = Some(digit);
                Effect::None
            }
            None => self.arm(digit, page, settings),
        }
    }

    /// Escape: dismiss an armed selection, or advance the double-press-home
    /// protocol when idle.
    pub fn handle_escape(
        &mut self,
        page: &mut dyn Page,
        tasks: &mut TaskQueue,
        settings: &Settings,
        now: Instant,
    ) -> Effect {
        if self.armed.is_some() || self.queued_arm.is_some() {
            // Dismissing a selection leaves the double-press window alone.
            self.queued_arm = None;
            self.begin_fade(tasks, now);
            highlight::refresh_badges(page, settings, None);
            return Effect::Cleared;
        }

        if !settings.enable_double_esc {
            return Effect::None;
        }

        let window = Duration::from_millis(DOUBLE_ESC_WINDOW_MS);
        match self.last_escape {
            Some(previous) if now.duration_since(previous) <= window => {
                self.last_escape = None;
                if let Err(err) = page.go_home() {
                    log::warn!("selection: navigate home failed: {err:#}");
                }
                Effect::WentHome
            }
            _ => {
                self.last_escape = Some(now);
                Effect::None
            }
        }
    }

    /// A pointer press at viewport coordinates. Clicks inside the armed card
    /// are left alone; anywhere else dismisses the selection.
    pub fn handle_click(
        &mut self,
        x: f64,
        y: f64,
        page: &mut dyn Page,
        tasks: &mut TaskQueue,
        settings: &Settings,
        now: Instant,
    ) -> Effect {
        let Some(armed) = self.armed else {
            return Effect::None;
        };
        let inside = page
            .measure(armed.element)
            .is_some_and(|rect| rect.contains(x, y));
        if inside {
            return Effect::None;
        }
        self.queued_arm = None;
        self.begin_fade(tasks, now);
        highlight::refresh_badges(page, settings, None);
        Effect::Cleared
    }

    /// A scroll key went down. The scroll session itself is the caller's; the
    /// machine's part is dropping the arming before the page starts moving.
    pub fn handle_scroll_key(
        &mut self,
        page: &mut dyn Page,
        tasks: &mut TaskQueue,
        settings: &Settings,
    ) {
        if self.armed.is_some() || self.fade.is_some() {
            self.clear_immediate(page, tasks);
            highlight::refresh_badges(page, settings, None);
        }
    }

    /// A scheduled deadline fired.
    pub fn handle_task(
        &mut self,
        kind: TaskKind,
        page: &mut dyn Page,
        tasks: &mut TaskQueue,
        settings: &Settings,
    ) -> Effect {
        match kind {
            TaskKind::FadeOut => {
                if let Some(fade) = self.fade.take() {
                    page.clear_highlight(fade.element);
                }
                match self.queued_arm.take() {
                    Some(digit) => self.arm(digit, page, settings),
                    None => Effect::None,
                }
            }
            TaskKind::ScrollSettle | TaskKind::MutationSettle => {
                // Positions are no longer trustworthy without rescanning.
                if self.armed.is_some() || self.fade.is_some() {
                    self.clear_immediate(page, tasks);
                }
                highlight::refresh_badges(page, settings, None);
                Effect::None
            }
        }
    }

    /// Advance the fade animation. Call once per frame while
    /// [`SelectionMachine::is_fading`].
    pub fn tick(&mut self, page: &mut dyn Page, now: Instant) {
        if let Some(fade) = self.fade {
            let elapsed = now.duration_since(fade.started).as_secs_f64() * 1000.0;
            let opacity = (1.0 - elapsed / highlight::FADE_OUT_MS as f64).max(0.0);
            page.set_highlight_opacity(fade.element, opacity);
        }
    }

    /// Settings changed externally: restyle the armed highlight and redraw
    /// badges under the new snapshot.
    pub fn apply_settings(&mut self, page: &mut dyn Page, settings: &Settings) {
        if let Some(armed) = self.armed {
            page.apply_highlight(armed.element, &HighlightSpec::from_settings(settings));
        }
        highlight::refresh_badges(page, settings, self.armed.map(|a| a.element));
    }

    fn arm(&mut self, digit: u8, page: &mut dyn Page, settings: &Settings) -> Effect {
        if self.fade.is_some() {
            // Never two highlights at once: wait for the out-fade.
            self.queued_arm = Some(digit);
            self.pending_key = Some(digit);
            return Effect::None;
        }

        let index = usize::from(digit - 1);
        let sequence = scanner::scan(&*page);
        let Some(candidate) = sequence.get(index).copied() else {
            self.pending_key = None;
            return Effect::None;
        };

        self.armed = Some(Armed {
            index,
            element: candidate.element,
        });
        self.pending_key = Some(digit);
        page.apply_highlight(candidate.element, &HighlightSpec::from_settings(settings));

        // Cards far down the sequence may be barely peeking into the
        // viewport; pull them into view so the user sees what they armed.
        if index >= AUTO_SCROLL_FROM_INDEX {
            let area = geometry::visible_area_ratio(&candidate.rect, &page.viewport());
            if area < SCROLL_INTO_VIEW_BELOW {
                page.scroll_into_view(candidate.element);
            }
        }

        highlight::refresh_badges(page, settings, Some(candidate.element));
        log::debug!("selection: armed index {index}");
        Effect::Armed { index }
    }

    /// A same-key second press only opens if the armed element is still
    /// attached, still sufficiently visible, and still the occupant of the
    /// armed index in a fresh scan.
    fn confirm_is_valid(&self, armed: Armed, page: &dyn Page) -> bool {
        let Some(rect) = page.measure(armed.element) else {
            return false;
        };
        if !geometry::is_sufficiently_visible(&rect, &page.viewport()) {
            return false;
        }
        scanner::scan(page)
            .get(armed.index)
            .map(|candidate| candidate.element)
            == Some(armed.element)
    }

    /// Move the armed highlight into a fade-out. Keeps an already-running
    /// fade; the queued-arm slot is managed by the caller.
    fn begin_fade(&mut self, tasks: &mut TaskQueue, now: Instant) {
        if let Some(armed) = self.armed.take() {
            self.pending_key = None;
            self.fade = Some(Fade {
                element: armed.element,
                started: now,
            });
            tasks.schedule(
                TaskKind::FadeOut,
                now + Duration::from_millis(highlight::FADE_OUT_MS),
            );
        }
    }

    /// Drop every highlight and pending replacement right now. Used when a
    /// fade would leave stale styling on a moving page, or ahead of opening.
    fn clear_immediate(&mut self, page: &mut dyn Page, tasks: &mut TaskQueue) {
        tasks.cancel(TaskKind::FadeOut);
        if let Some(fade) = self.fade.take() {
            page.clear_highlight(fade.element);
        }
        if let Some(armed) = self.armed.take() {
            page.clear_highlight(armed.element);
        }
        self.queued_arm = None;
        self.pending_key = None;
    }
}
