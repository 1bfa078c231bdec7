use crate::tracker::Detection;

/// A per-frame detector: pad markers, crops, disease spots.
///
/// Implementations label every detection with its identity (e.g. `"pad_6"`
/// or `"strawberry_ripe"`); the tracker only associates by position.
///
/// ```ignore
/// struct PadMarkers;
///
/// impl DetectionSource for PadMarkers {
///     type Error = anyhow::Error;
///
///     fn detect(&mut self, frame: &[u8], w: u32, h: u32) -> anyhow::Result<Vec<Detection>> {
///         Ok(vec![DetectionBuilder::new().xywh(320.0, 240.0, 80.0, 80.0).pad(1).build()])
///     }
/// }
/// ```
pub trait DetectionSource {
    type Error;

    /// Detect objects in one frame of `width` x `height` pixels. The byte
    /// layout of `frame` is up to the implementation.
    fn detect(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, Self::Error>;
}

impl<D: DetectionSource + ?Sized> DetectionSource for Box<D> {
    type Error = D::Error;

    fn detect(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, Self::Error> {
        (**self).detect(frame, width, height)
    }
}
