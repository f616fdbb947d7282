//! Append-only light trails.

use std::ops::{Index, IndexMut};

use crate::segment::Segment;
use crate::{Color, Vec2, WHITE};

/// The wall a cycle leaves behind: dash segments in chronological order.
///
/// Segments are never reordered or removed. Only the last segment's end is
/// mutated, and only while the dash it was opened in is still being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail {
    segments: Vec<Segment>,
    color: Color,
    /// Dash number the last segment was opened in.
    dash: Option<u64>,
}

impl Trail {
    pub fn new(color: Color) -> Self {
        Self {
            segments: Vec::new(),
            color,
            dash: None,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Push a segment that no dash will stretch.
    pub fn append(&mut self, segment: Segment) {
        self.segments.push(segment);
        self.dash = None;
    }

    /// Dash number the last segment belongs to, if it was drawn by a world.
    pub fn dash(&self) -> Option<u64> {
        self.dash
    }

    /// Stretch the segment of `dash` to `point`, or open one there.
    ///
    /// A trail that missed the tick `dash` opened on still ends in an older,
    /// closed segment; that one is left alone and a zero-length segment is
    /// started instead.
    pub(crate) fn draw(&mut self, dash: u64, point: Vec2) {
        match self.segments.last_mut() {
            Some(segment) if self.dash == Some(dash) => segment.end = point,
            _ => {
                self.segments.push(Segment::new(point, point));
                self.dash = Some(dash);
            }
        }
    }
}

impl Default for Trail {
    fn default() -> Self {
        Self::new(WHITE)
    }
}

impl Index<usize> for Trail {
    type Output = Segment;

    fn index(&self, idx: usize) -> &Segment {
        &self.segments[idx]
    }
}

impl IndexMut<usize> for Trail {
    fn index_mut(&mut self, idx: usize) -> &mut Segment {
        &mut self.segments[idx]
    }
}
