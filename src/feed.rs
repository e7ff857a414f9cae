//! Simulated video feed.
//!
//! A synthetic page the playground can scroll and select against: rows of
//! video cards laid out in a virtual pixel space, generated deterministically
//! from a seed. More rows appear as the scroll position approaches the
//! bottom, which the page reports as a mutation, the way an infinite feed
//! re-renders under a real browser extension.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::Rect;
use crate::highlight::HighlightSpec;
use crate::page::{Badge, ElementId, Page, PageError};

/// Card-shape and layout tuning. The card shapes are the compatibility
/// surface with the page being simulated; keep them in one place.
pub mod layout {
    /// Everything is laid out against this virtual page width.
    pub const PAGE_WIDTH: f64 = 1000.0;
    pub const MARGIN: f64 = 20.0;
    pub const GUTTER: f64 = 20.0;

    /// Standard grid rows: three thumbnails across.
    pub const GRID_COLUMNS: u64 = 3;
    pub const GRID_ROW_HEIGHT: f64 = 180.0;

    /// Full-width list rows, one video each.
    pub const LIST_ROW_HEIGHT: f64 = 120.0;

    /// Compact recommendation rail: four small cards across.
    pub const RAIL_COLUMNS: u64 = 4;
    pub const RAIL_ROW_HEIGHT: f64 = 100.0;

    pub const ROW_SPACING: f64 = 36.0;

    /// Append more rows once the feed bottom is this close to the viewport.
    pub const APPEND_THRESHOLD: f64 = 600.0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardShape {
    Grid,
    List,
    Rail,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub id: ElementId,
    pub title: String,
    pub channel: String,
    pub duration: String,
    pub url: String,
    pub shape: CardShape,
    /// Position in page coordinates; subtract the scroll offset for the
    /// viewport-relative rect.
    pub rect: Rect,
}

struct HighlightState {
    element: ElementId,
    spec: HighlightSpec,
    opacity: f64,
}

pub struct Feed {
    seed: u64,
    rng: StdRng,
    cards: Vec<Card>,
    next_id: u64,
    content_height: f64,
    scroll_y: f64,
    viewport_height: f64,
    mutated: bool,
    scrolled: bool,
    notice: Option<String>,
    highlight: Option<HighlightState>,
    badges: Vec<Badge>,
}

const CHANNELS: [&str; 8] = [
    "Orbit Labs",
    "Daily Circuit",
    "The Long Take",
    "Midnight Kitchen",
    "Trail & Summit",
    "Paper Planes",
    "Studio Nine",
    "Field Notes",
];

const TOPICS: [&str; 12] = [
    "Building a Mechanical Keyboard",
    "The Physics of Juggling",
    "Sourdough, Start to Finish",
    "Restoring a 1970s Synth",
    "Night Trains Across Europe",
    "Why Bridges Don't Fall",
    "Urban Sketching Basics",
    "A Week in the Alps",
    "Inside a Vinyl Pressing Plant",
    "Fermentation for Beginners",
    "How Elevators Think",
    "Mapping the Deep Sea",
];

const QUALIFIERS: [&str; 6] = [
    "Explained",
    "in 12 Minutes",
    "(Full Documentary)",
    "- Part 2",
    "You Can Try Today",
    "Behind the Scenes",
];

impl Feed {
    pub fn new(seed: u64) -> Self {
        let mut feed = Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            cards: Vec::new(),
            next_id: 1,
            content_height: layout::MARGIN,
            scroll_y: 0.0,
            viewport_height: 600.0,
            mutated: false,
            scrolled: false,
            notice: None,
            highlight: None,
            badges: Vec::new(),
        };
        feed.ensure_content();
        feed
    }

    /// The terminal resized; the viewport follows it.
    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height.max(1.0);
        self.ensure_content();
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_y
    }

    pub fn card(&self, id: ElementId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Cards intersecting the viewport, paired with their viewport-relative
    /// rects, for drawing.
    pub fn visible_cards(&self) -> Vec<(&Card, Rect)> {
        let viewport = self.viewport();
        self.cards
            .iter()
            .filter_map(|card| {
                let rect = self.relative_rect(card);
                let overlaps = rect.y < viewport.bottom() && rect.bottom() > viewport.y;
                overlaps.then_some((card, rect))
            })
            .collect()
    }

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    /// Highlight state for drawing: element, spec, current opacity.
    pub fn highlight(&self) -> Option<(ElementId, HighlightSpec, f64)> {
        self.highlight
            .as_ref()
            .map(|h| (h.element, h.spec, h.opacity))
    }

    /// True once per burst of feed growth; the caller debounces it into a
    /// mutation-settle signal.
    pub fn take_mutation(&mut self) -> bool {
        std::mem::take(&mut self.mutated)
    }

    /// True when the scroll offset moved since the last call, whether from
    /// keys, the wheel, or a programmatic scroll-into-view.
    pub fn take_scroll(&mut self) -> bool {
        std::mem::take(&mut self.scrolled)
    }

    /// One-shot user-facing message (opened a video, went home).
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    fn relative_rect(&self, card: &Card) -> Rect {
        Rect::new(
            card.rect.x,
            card.rect.y - self.scroll_y,
            card.rect.width,
            card.rect.height,
        )
    }

    fn set_scroll(&mut self, target: f64) {
        // Scrolling down always finds more feed: grow first, then clamp.
        if target > self.scroll_y {
            self.grow_to(target + self.viewport_height + layout::APPEND_THRESHOLD);
        }
        let max = (self.content_height - self.viewport_height).max(0.0);
        let clamped = target.clamp(0.0, max);
        if (clamped - self.scroll_y).abs() > f64::EPSILON {
            self.scroll_y = clamped;
            self.scrolled = true;
        }
    }

    /// Keep at least one viewport of feed below the fold.
    fn ensure_content(&mut self) {
        self.grow_to(self.scroll_y + self.viewport_height + layout::APPEND_THRESHOLD);
    }

    fn grow_to(&mut self, limit: f64) {
        let mut appended = false;
        while self.content_height < limit {
            self.append_row();
            appended = true;
        }
        if appended {
            self.mutated = true;
        }
    }

    fn append_row(&mut self) {
        let shape = match self.rng.gen_range(0..6) {
            0..=2 => CardShape::Grid,
            3..=4 => CardShape::List,
            _ => CardShape::Rail,
        };
        let y = self.content_height;
        match shape {
            CardShape::Grid => self.append_columns(layout::GRID_COLUMNS, layout::GRID_ROW_HEIGHT, y, shape),
            CardShape::List => self.append_columns(1, layout::LIST_ROW_HEIGHT, y, shape),
            CardShape::Rail => self.append_columns(layout::RAIL_COLUMNS, layout::RAIL_ROW_HEIGHT, y, shape),
        }
    }

    fn append_columns(&mut self, columns: u64, height: f64, y: f64, shape: CardShape) {
        let usable = layout::PAGE_WIDTH - 2.0 * layout::MARGIN;
        let width = (usable - (columns - 1) as f64 * layout::GUTTER) / columns as f64;
        for col in 0..columns {
            let x = layout::MARGIN + col as f64 * (width + layout::GUTTER);
            let card = self.make_card(Rect::new(x, y, width, height), shape);
            self.cards.push(card);
        }
        self.content_height = y + height + layout::ROW_SPACING;
    }

    fn make_card(&mut self, rect: Rect, shape: CardShape) -> Card {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        let topic = TOPICS[self.rng.gen_range(0..TOPICS.len())];
        let qualifier = QUALIFIERS[self.rng.gen_range(0..QUALIFIERS.len())];
        let channel = CHANNELS[self.rng.gen_range(0..CHANNELS.len())];
        let minutes = self.rng.gen_range(2..48);
        let seconds = self.rng.gen_range(0..60);
        Card {
            id,
            title: format!("{topic} {qualifier}"),
            channel: channel.to_string(),
            duration: format!("{minutes}:{seconds:02}"),
            url: format!("https://videos.example/watch?v={}", id.0),
            shape,
            rect,
        }
    }
}

impl Page for Feed {
    fn candidates(&self) -> Vec<ElementId> {
        self.cards.iter().map(|card| card.id).collect()
    }

    fn measure(&self, id: ElementId) -> Option<Rect> {
        self.card(id).map(|card| self.relative_rect(card))
    }

    fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, layout::PAGE_WIDTH, self.viewport_height)
    }

    fn open(&mut self, id: ElementId) -> Result<()> {
        let card = self.card(id).ok_or(PageError::Detached)?;
        let title = card.title.clone();
        let url = card.url.clone();
        match webbrowser::open(&url) {
            Ok(()) => self.notice = Some(format!("Opening \"{title}\" in your browser…")),
            Err(err) => {
                // No browser available: surface the URL instead of failing.
                log::warn!("feed: browser launch failed: {err}");
                self.notice = Some(format!("Browser unavailable · {url}"));
            }
        }
        Ok(())
    }

    fn go_home(&mut self) -> Result<()> {
        // Back to the top of a fresh feed, like following the home control.
        let viewport = self.viewport_height;
        *self = Feed::new(self.seed);
        self.set_viewport_height(viewport);
        self.mutated = true;
        self.scrolled = true;
        self.notice = Some("Back to the top of the feed.".to_string());
        Ok(())
    }

    fn scroll_by(&mut self, dy: f64) {
        self.set_scroll(self.scroll_y + dy);
    }

    fn scroll_into_view(&mut self, id: ElementId) {
        if let Some(card) = self.card(id) {
            let center = card.rect.y + card.rect.height / 2.0;
            self.set_scroll(center - self.viewport_height / 2.0);
        }
    }

    fn apply_highlight(&mut self, id: ElementId, spec: &HighlightSpec) {
        self.highlight = Some(HighlightState {
            element: id,
            spec: *spec,
            opacity: 1.0,
        });
    }

    fn set_highlight_opacity(&mut self, id: ElementId, opacity: f64) {
        if let Some(state) = self.highlight.as_mut() {
            if state.element == id {
                state.opacity = opacity.clamp(0.0, 1.0);
            }
        }
    }

    fn clear_highlight(&mut self, id: ElementId) {
        if self.highlight.as_ref().is_some_and(|h| h.element == id) {
            self.highlight = None;
        }
    }

    fn set_badges(&mut self, badges: &[Badge]) {
        self.badges = badges.to_vec();
    }

    fn clear_badges(&mut self) {
        self.badges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_builds_the_same_feed() {
        let a = Feed::new(7);
        let b = Feed::new(7);
        assert_eq!(a.cards.len(), b.cards.len());
        for (left, right) in a.cards.iter().zip(&b.cards) {
            assert_eq!(left.title, right.title);
            assert_eq!(left.rect, right.rect);
            assert_eq!(left.shape, right.shape);
        }
    }

    #[test]
    fn measure_follows_the_scroll_offset() {
        let mut feed = Feed::new(1);
        let id = feed.candidates()[0];
        let before = feed.measure(id).unwrap();
        feed.scroll_by(100.0);
        let after = feed.measure(id).unwrap();
        assert!((before.y - after.y - 100.0).abs() < 1e-9);
        assert_eq!(before.x, after.x);
    }

    #[test]
    fn scroll_clamps_at_the_top() {
        let mut feed = Feed::new(1);
        feed.scroll_by(-500.0);
        assert_eq!(feed.scroll_offset(), 0.0);
    }

    #[test]
    fn scrolling_near_the_bottom_appends_and_reports_mutation() {
        let mut feed = Feed::new(1);
        feed.take_mutation();
        let before = feed.cards.len();
        feed.scroll_by(5000.0);
        assert!(feed.cards.len() > before);
        assert!(feed.take_mutation());
        // Drained until the next growth.
        assert!(!feed.take_mutation());
    }

    #[test]
    fn scroll_movement_is_reported_once() {
        let mut feed = Feed::new(1);
        assert!(!feed.take_scroll());
        feed.scroll_by(50.0);
        assert!(feed.take_scroll());
        assert!(!feed.take_scroll());
    }

    #[test]
    fn scroll_into_view_centers_the_card() {
        let mut feed = Feed::new(1);
        feed.scroll_by(3000.0);
        let id = *feed.candidates().last().unwrap();
        feed.scroll_into_view(id);
        let rect = feed.measure(id).unwrap();
        let center = rect.y + rect.height / 2.0;
        // Centered, unless clamping at an edge won out.
        let max = (feed.content_height - feed.viewport_height).max(0.0);
        if feed.scroll_offset() > 0.0 && feed.scroll_offset() < max {
            assert!((center - feed.viewport_height / 2.0).abs() < 1.0);
        }
    }

    #[test]
    fn go_home_restores_the_initial_feed() {
        let mut feed = Feed::new(42);
        let first_title = feed.cards[0].title.clone();
        let initial_len = Feed::new(42).cards.len();
        feed.scroll_by(4000.0);
        feed.go_home().unwrap();
        assert_eq!(feed.scroll_offset(), 0.0);
        assert_eq!(feed.cards.len(), initial_len);
        assert_eq!(feed.cards[0].title, first_title);
    }

    #[test]
    fn open_of_an_unknown_id_is_an_error() {
        let mut feed = Feed::new(1);
        assert!(feed.open(ElementId(9999)).is_err());
    }

    #[test]
    fn highlight_tracks_one_element() {
        let mut feed = Feed::new(1);
        let settings = crate::config::Settings::default();
        let spec = HighlightSpec::from_settings(&settings);
        let ids = feed.candidates();
        feed.apply_highlight(ids[0], &spec);
        feed.set_highlight_opacity(ids[0], 0.5);
        assert_eq!(feed.highlight().unwrap().2, 0.5);
        // Opacity for a different element is ignored.
        feed.set_highlight_opacity(ids[1], 0.1);
        assert_eq!(feed.highlight().unwrap().2, 0.5);
        feed.clear_highlight(ids[0]);
        assert!(feed.highlight().is_none());
    }

    #[test]
    fn cards_stay_inside_the_page_width() {
        let feed = Feed::new(3);
        for card in &feed.cards {
            assert!(card.rect.x >= layout::MARGIN - 1e-9);
            assert!(card.rect.right() <= layout::PAGE_WIDTH - layout::MARGIN + 1e-9);
        }
    }
}
