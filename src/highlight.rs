//! Highlight presentation and badge construction.
//!
//! The selection machine only knows "this element is highlighted at this
//! opacity". Everything the user actually sees - the four border styles, the
//! color, the numbered badges - is derived here and handed to the page.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::page::{Badge, ElementId, Page};
use crate::scanner::{self, Candidate};

/// Fixed fade-out duration for a dismissed highlight, in milliseconds.
/// Fade-in is immediate when nothing was highlighted before.
pub const FADE_OUT_MS: u64 = 200;

/// Period of the glow style's pulse, in milliseconds.
pub const GLOW_PULSE_MS: u64 = 2000;

pub const DEFAULT_COLOR: &str = "#d4a853";

/// Preset swatches offered by the settings form.
pub const PRESET_COLORS: [(&str, &str); 6] = [
    ("Gold", "#d4a853"),
    ("Blue", "#3b82f6"),
    ("Green", "#22c55e"),
    ("Purple", "#a855f7"),
    ("Red", "#ef4444"),
    ("Cyan", "#06b6d4"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightStyle {
    #[default]
    GradientBottom,
    GradientTop,
    Solid,
    Glow,
}

impl HighlightStyle {
    pub fn all() -> [HighlightStyle; 4] {
        [
            HighlightStyle::GradientBottom,
            HighlightStyle::GradientTop,
            HighlightStyle::Solid,
            HighlightStyle::Glow,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            HighlightStyle::GradientBottom => "Gradient ↓",
            HighlightStyle::GradientTop => "Gradient ↑",
            HighlightStyle::Solid => "Solid",
            HighlightStyle::Glow => "Glow",
        }
    }

    pub fn next(self) -> Self {
        match self {
            HighlightStyle::GradientBottom => HighlightStyle::GradientTop,
            HighlightStyle::GradientTop => HighlightStyle::Solid,
            HighlightStyle::Solid => HighlightStyle::Glow,
            HighlightStyle::Glow => HighlightStyle::GradientBottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex color pattern"));

pub fn is_valid_hex(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

pub fn parse_hex(value: &str) -> Option<Rgb> {
    if !is_valid_hex(value) {
        return None;
    }
    let bytes = hex::decode(&value[1..]).ok()?;
    Some(Rgb {
        r: bytes[0],
        g: bytes[1],
        b: bytes[2],
    })
}

/// Everything the page needs to draw one highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpec {
    pub color: Rgb,
    pub style: HighlightStyle,
}

impl HighlightSpec {
    /// A malformed color in settings falls back to the default; presentation
    /// must never fail out of the state machine's control path.
    pub fn from_settings(settings: &Settings) -> Self {
        let color = parse_hex(&settings.highlight_color)
            .or_else(|| parse_hex(DEFAULT_COLOR))
            .unwrap_or(Rgb {
                r: 0xd4,
                g: 0xa8,
                b: 0x53,
            });
        Self {
            color,
            style: settings.highlight_style,
        }
    }
}

/// Opacity multiplier for the glow style at `elapsed_ms` into its pulse:
/// a cosine dip to 70% and back, once per [`GLOW_PULSE_MS`].
pub fn glow_pulse(elapsed_ms: u64) -> f64 {
    let phase = (elapsed_ms % GLOW_PULSE_MS) as f64 / GLOW_PULSE_MS as f64;
    let dip = (1.0 - (phase * std::f64::consts::TAU).cos()) / 2.0;
    1.0 - 0.3 * dip
}

/// One badge per candidate of the sequence, numbered 1-9 in selection order.
pub fn build_badges(sequence: &[Candidate], armed: Option<ElementId>) -> Vec<Badge> {
    sequence
        .iter()
        .enumerate()
        .map(|(index, candidate)| Badge {
            element: candidate.element,
            number: index as u8 + 1,
            armed: armed == Some(candidate.element),
        })
        .collect()
}

/// Rescan and fully replace the page's badge set. Idempotent: calling it
/// twice with no page change renders the same badges.
pub fn refresh_badges(page: &mut dyn Page, settings: &Settings, armed: Option<ElementId>) {
    if !settings.show_badges || !settings.enable_number_keys {
        page.clear_badges();
        return;
    }
    let sequence = scanner::scan(&*page);
    let badges = build_badges(&sequence, armed);
    page.set_badges(&badges);
}
