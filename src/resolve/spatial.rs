//! Reading-order sort for image boxes: rows top to bottom, left to right
//! within a row.

use std::cmp::Ordering;

use crate::model::Rect;

/// A candidate joins a row when the vertical overlap exceeds this share of
/// the shorter of the two spans.
const ROW_OVERLAP_RATIO: f32 = 0.5;

/// A candidate joins a row only if neither height exceeds the other by more
/// than this factor.
const ROW_HEIGHT_RATIO: f32 = 2.0;

/// Union of the boxes already in a row.
#[derive(Debug, Clone, Copy)]
struct RowEnvelope {
    span: Rect,
}

impl RowEnvelope {
    fn of(rect: &Rect) -> Self {
        Self { span: *rect }
    }

    fn accepts(&self, rect: &Rect) -> bool {
        let overlap = self.span.vertical_overlap(rect);
        let (row_h, cand_h) = (self.span.height(), rect.height());
        let shorter = row_h.min(cand_h);
        let taller = row_h.max(cand_h);

        overlap > ROW_OVERLAP_RATIO * shorter && taller <= ROW_HEIGHT_RATIO * shorter
    }

    fn extend(&mut self, rect: &Rect) {
        self.span = Rect::new(
            self.span.left.min(rect.left),
            self.span.bottom.min(rect.bottom),
            self.span.right.max(rect.right),
            self.span.top.max(rect.top),
        );
    }
}

/// Reading-order permutation of `rects`: `result[k]` is the index of the
/// k-th rectangle to read.
///
/// Equal keys keep their input order, so the result is deterministic.
pub fn spatial_order(rects: &[Rect]) -> Vec<usize> {
    let mut by_top: Vec<usize> = (0..rects.len()).collect();
    by_top.sort_by(|&a, &b| rects[b].top.total_cmp(&rects[a].top));

    let mut rows: Vec<(RowEnvelope, Vec<usize>)> = Vec::new();
    for idx in by_top {
        let rect = &rects[idx];
        match rows.last_mut() {
            Some((envelope, members)) if envelope.accepts(rect) => {
                envelope.extend(rect);
                members.push(idx);
            }
            _ => rows.push((RowEnvelope::of(rect), vec![idx])),
        }
    }

    rows.into_iter()
        .flat_map(|(_, mut members)| {
            members.sort_by(|&a, &b| {
                rects[a]
                    .left
                    .partial_cmp(&rects[b].left)
                    .unwrap_or(Ordering::Equal)
            });
            members
        })
        .collect()
}

/// Sort arbitrary items into reading order by their rectangles.
pub fn sort_spatially<T, F>(items: Vec<T>, rect_of: F) -> Vec<T>
where
    F: Fn(&T) -> Rect,
{
    let rects: Vec<Rect> = items.iter().map(&rect_of).collect();
    let order = spatial_order(&rects);

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}
