//! Capability surface of the host page.
//!
//! The navigation engine never touches a live document directly. Everything
//! it needs from the page - which cards exist, where they are, how to open
//! one, how to show a highlight or a badge - goes through this trait, so the
//! scanner and the selection machine can be exercised against synthetic
//! rectangles.

use anyhow::Result;

use crate::geometry::Rect;
use crate::highlight::HighlightSpec;

/// Opaque handle to one selectable element. Identity is structural: two ids
/// are the same candidate iff they are equal, and an id stays valid for the
/// lifetime of the underlying element only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// One numbered marker over a visible candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub element: ElementId,
    /// Digit shown to the user, 1-9.
    pub number: u8,
    /// The badge over the armed candidate is drawn distinguished.
    pub armed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("element is no longer attached")]
    Detached,
    #[error("no navigation target available")]
    NoTarget,
}

pub trait Page {
    /// Every element currently matching one of the page's known card shapes,
    /// in document order. Visibility filtering is the scanner's job.
    fn candidates(&self) -> Vec<ElementId>;

    /// Viewport-relative bounds of an element, or `None` once it has left
    /// the document. Callers must treat `None` as a recoverable staleness
    /// signal, never as an error.
    fn measure(&self, id: ElementId) -> Option<Rect>;

    fn viewport(&self) -> Rect;

    /// Follow the element's primary link. Whether that means an anchor click
    /// or a fallback click on the element itself is the page's concern.
    fn open(&mut self, id: ElementId) -> Result<()>;

    /// Activate the page's home control, falling back to direct navigation
    /// when the control is missing.
    fn go_home(&mut self) -> Result<()>;

    fn scroll_by(&mut self, dy: f64);

    /// Bring an element toward the center of the viewport.
    fn scroll_into_view(&mut self, id: ElementId);

    fn apply_highlight(&mut self, id: ElementId, spec: &HighlightSpec);

    fn set_highlight_opacity(&mut self, id: ElementId, opacity: f64);

    fn clear_highlight(&mut self, id: ElementId);

    /// Replace-all badge render. The page attaches each badge to the
    /// candidate's thumbnail slot, or to the candidate's own root when no
    /// slot can be found.
    fn set_badges(&mut self, badges: &[Badge]);

    fn clear_badges(&mut self);
}
