//! TrackerPipeline for combining detection with tracking.

use std::time::Instant;

use crate::tracker::{Detection, SharedTracker, TrackerConfig};

use super::DetectionSource;

/// Bundles one detector with a (possibly shared) tracker.
///
/// Several pipelines may hold clones of the same [`SharedTracker`]; their
/// updates are serialized by its mutex.
pub struct TrackerPipeline<D: DetectionSource> {
    detector: D,
    tracker: SharedTracker,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    /// Create a new tracking pipeline with its own tracker.
    pub fn new(detector: D, config: TrackerConfig) -> Self {
        Self::with_tracker(detector, SharedTracker::new(config))
    }

    /// Create a pipeline that feeds an existing tracker.
    pub fn with_tracker(detector: D, tracker: SharedTracker) -> Self {
        Self { detector, tracker }
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D) -> Self {
        Self::new(detector, TrackerConfig::default())
    }

    /// Detect on one frame and return the tracker's active detections.
    ///
    /// A detector error leaves the tracker untouched.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
        now: Instant,
    ) -> Result<Vec<Detection>, D::Error> {
        let detections = self.detector.detect(input, width, height)?;
        Ok(self.tracker.update(detections, now))
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn tracker(&self) -> &SharedTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::DetectionBuilder;
    use std::time::Duration;

    struct MockDetector {
        detections: Vec<Detection>,
        fail: bool,
    }

    impl DetectionSource for MockDetector {
        type Error = anyhow::Error;

        fn detect(
            &mut self,
            _input: &[u8],
            _width: u32,
            _height: u32,
        ) -> Result<Vec<Detection>, Self::Error> {
            if self.fail {
                anyhow::bail!("inference backend unavailable");
            }
            Ok(self.detections.clone())
        }
    }

    fn strawberry(cx: f32) -> Detection {
        DetectionBuilder::new()
            .xywh(cx, 50.0, 20.0, 20.0)
            .confidence(0.9)
            .identity("strawberry_ripe")
            .build()
    }

    #[test]
    fn test_tracker_pipeline_keeps_ids() {
        let detector = MockDetector {
            detections: vec![strawberry(100.0)],
            fail: false,
        };

        let mut pipeline = TrackerPipeline::with_default_config(detector);
        let t0 = Instant::now();
        let first = pipeline.process_frame(&[], 640, 480, t0).unwrap();
        let second = pipeline
            .process_frame(&[], 640, 480, t0 + Duration::from_millis(33))
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].track_id, second[0].track_id);
        assert_eq!(pipeline.tracker().lock().tracks().next().unwrap().update_count, 2);
    }

    #[test]
    fn test_detector_error_propagates() {
        let detector = MockDetector {
            detections: vec![],
            fail: true,
        };
        let mut pipeline = TrackerPipeline::with_default_config(detector);
        assert!(pipeline.process_frame(&[], 640, 480, Instant::now()).is_err());
        assert!(pipeline.tracker().lock().is_empty());
    }

    #[test]
    fn test_boxed_detector() {
        let detector: Box<dyn DetectionSource<Error = anyhow::Error>> = Box::new(MockDetector {
            detections: vec![strawberry(100.0), strawberry(300.0)],
            fail: false,
        });
        let mut pipeline = TrackerPipeline::with_default_config(detector);
        let active = pipeline.process_frame(&[], 640, 480, Instant::now()).unwrap();
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn test_pipelines_share_tracker() {
        let shared = SharedTracker::new(TrackerConfig::default());
        let mut crops = TrackerPipeline::with_tracker(
            MockDetector { detections: vec![strawberry(100.0)], fail: false },
            shared.clone(),
        );
        let mut disease = TrackerPipeline::with_tracker(
            MockDetector { detections: vec![strawberry(500.0)], fail: false },
            shared.clone(),
        );
        let now = Instant::now();
        crops.process_frame(&[], 640, 480, now).unwrap();
        let active = disease.process_frame(&[], 640, 480, now).unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(shared.lock().len(), 2);
    }
}
