use nalgebra::Point2;

use crate::tracker::rect::Rect;
use crate::tracker::track::TrackId;

/// One labeled detection from an external detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Bounding box (stored TLWH, usually built from TLBR corners)
    pub bbox: Rect,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Class or identity label assigned by the detector, e.g. `"pad_6"`
    pub identity: String,
    /// Center point in whole pixels
    pub center: Point2<i32>,
    /// Box area in square pixels
    pub area: f32,
    /// Track this detection belongs to, stamped by the tracker
    pub track_id: Option<TrackId>,
}

impl Detection {
    /// Build a detection from TLBR corners; center and area are derived.
    pub fn new(
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        confidence: f32,
        identity: impl Into<String>,
    ) -> Self {
        Self::from_rect(Rect::from_tlbr(x1, y1, x2, y2), confidence, identity)
    }

    pub fn from_rect(bbox: Rect, confidence: f32, identity: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            identity: identity.into(),
            center: bbox.center(),
            area: bbox.area(),
            track_id: None,
        }
    }

    /// Center as a float point for distance computations.
    pub(crate) fn center_f32(&self) -> Point2<f32> {
        Point2::new(self.center.x as f32, self.center.y as f32)
    }
}
