//! Visibility scanner: which cards are on screen, and in what order the
//! digit keys address them.

use crate::geometry::{self, Rect};
use crate::page::{ElementId, Page};

/// Digit keys 1-9 address at most this many candidates.
pub const MAX_SELECTABLE: usize = 9;

/// Candidates whose tops are within this many units of a row's first member
/// belong to that row.
pub const ROW_BAND: f64 = 50.0;

/// A visible card captured by one scan. Transient: positions are only valid
/// until the page scrolls or mutates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub element: ElementId,
    pub rect: Rect,
    pub ratio: f64,
}

/// Scan the page for selectable candidates.
///
/// Collects every candidate element, keeps the ones sufficiently visible in
/// the viewport, orders them rows-top-to-bottom / left-to-right within a row,
/// and truncates to the first [`MAX_SELECTABLE`]. Pure with respect to the
/// page; the dominant cost is the page's own layout queries, so callers
/// should not invoke it on every frame.
pub fn scan(page: &dyn Page) -> Vec<Candidate> {
    let viewport = page.viewport();

    let mut visible: Vec<Candidate> = page
        .candidates()
        .into_iter()
        .filter_map(|id| page.measure(id).map(|rect| (id, rect)))
        .filter(|(_, rect)| geometry::is_sufficiently_visible(rect, &viewport))
        .map(|(element, rect)| Candidate {
            element,
            rect,
            ratio: geometry::visible_ratio(&rect, &viewport),
        })
        .collect();

    // Sort by (top, left) first so row grouping is independent of the order
    // the page reported the elements in.
    visible.sort_by(|a, b| {
        a.rect
            .y
            .total_cmp(&b.rect.y)
            .then(a.rect.x.total_cmp(&b.rect.x))
    });

    // Group into rows anchored at each row's topmost member, then order each
    // row left-to-right. Anchoring (rather than pairwise comparison) keeps
    // the order total when card tops form a chain of near misses.
    let mut rows: Vec<Vec<Candidate>> = Vec::new();
    let mut anchor = f64::NEG_INFINITY;
    for candidate in visible {
        if rows.is_empty() || candidate.rect.y - anchor >= ROW_BAND {
            anchor = candidate.rect.y;
            rows.push(Vec::new());
        }
        rows.last_mut().expect("row exists").push(candidate);
    }

    let mut ordered: Vec<Candidate> = Vec::new();
    for mut row in rows {
        row.sort_by(|a, b| a.rect.x.total_cmp(&b.rect.x));
        ordered.extend(row);
    }

    ordered.truncate(MAX_SELECTABLE);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::testing::FakePage;

    fn ids(sequence: &[Candidate]) -> Vec<u64> {
        sequence.iter().map(|c| c.element.0).collect()
    }

    #[test]
    fn orders_grid_rows_then_columns() {
        let page = FakePage::grid(6);
        assert_eq!(ids(&scan(&page)), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn order_is_independent_of_reporting_order() {
        let mut page = FakePage::new(Rect::new(0.0, 0.0, 1000.0, 600.0));
        // Insert in a scrambled order; scan must still read top-left first.
        let rects = [
            (4, Rect::new(20.0, 220.0, 300.0, 180.0)),
            (1, Rect::new(20.0, 10.0, 300.0, 180.0)),
            (3, Rect::new(660.0, 14.0, 300.0, 180.0)),
            (2, Rect::new(340.0, 12.0, 300.0, 180.0)),
        ];
        for (id, rect) in rects {
            page.insert(ElementId(id), rect);
        }
        assert_eq!(ids(&scan(&page)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn tops_within_band_share_a_row() {
        let mut page = FakePage::new(Rect::new(0.0, 0.0, 1000.0, 600.0));
        page.insert(ElementId(1), Rect::new(400.0, 100.0, 200.0, 150.0));
        page.insert(ElementId(2), Rect::new(100.0, 140.0, 200.0, 150.0));
        // Same band: ordered by x, so element 2 comes first.
        assert_eq!(ids(&scan(&page)), vec![2, 1]);
    }

    #[test]
    fn tops_past_band_split_rows() {
        let mut page = FakePage::new(Rect::new(0.0, 0.0, 1000.0, 600.0));
        page.insert(ElementId(1), Rect::new(400.0, 100.0, 200.0, 150.0));
        page.insert(ElementId(2), Rect::new(100.0, 155.0, 200.0, 150.0));
        // 55 units apart: two rows, top one first despite larger x.
        assert_eq!(ids(&scan(&page)), vec![1, 2]);
    }

    #[test]
    fn row_band_anchors_at_first_member() {
        let mut page = FakePage::new(Rect::new(0.0, 0.0, 1000.0, 600.0));
        // Tops at 0, 40, 80: 40 joins the row anchored at 0, but 80 is a new
        // row even though it is within 50 of 40.
        page.insert(ElementId(1), Rect::new(500.0, 0.0, 200.0, 150.0));
        page.insert(ElementId(2), Rect::new(300.0, 40.0, 200.0, 150.0));
        page.insert(ElementId(3), Rect::new(100.0, 80.0, 200.0, 150.0));
        assert_eq!(ids(&scan(&page)), vec![2, 1, 3]);
    }

    #[test]
    fn truncates_to_nine() {
        // Twelve fully visible cards; only the first nine are addressable.
        let mut page = FakePage::new(Rect::new(0.0, 0.0, 1000.0, 900.0));
        for i in 0..12u64 {
            let row = i / 3;
            let col = i % 3;
            page.insert(
                ElementId(i + 1),
                Rect::new(col as f64 * 320.0, row as f64 * 200.0, 300.0, 180.0),
            );
        }
        let sequence = scan(&page);
        assert_eq!(sequence.len(), MAX_SELECTABLE);
        assert_eq!(ids(&sequence), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn filters_insufficiently_visible_cards() {
        let mut page = FakePage::new(Rect::new(0.0, 0.0, 1000.0, 600.0));
        page.insert(ElementId(1), Rect::new(0.0, 10.0, 300.0, 180.0));
        // 30% exactly: excluded by the strict rule.
        page.insert(ElementId(2), Rect::new(340.0, 546.0, 300.0, 180.0));
        // Mostly above the viewport, under 30% showing.
        page.insert(ElementId(3), Rect::new(680.0, -140.0, 300.0, 180.0));
        assert_eq!(ids(&scan(&page)), vec![1]);
    }

    #[test]
    fn detached_elements_are_skipped() {
        let mut page = FakePage::grid(3);
        page.detach(ElementId(2));
        assert_eq!(ids(&scan(&page)), vec![1, 3]);
    }
}
