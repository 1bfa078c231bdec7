use std::time::{Duration, Instant};

use pad_patrol::{Detection, TrackState, Tracker, TrackerConfig};

fn square(cx: f32, cy: f32, confidence: f32) -> Detection {
    Detection::new(cx - 20.0, cy - 20.0, cx + 20.0, cy + 20.0, confidence, "strawberry_ripe")
}

#[test]
fn test_basic_tracking() {
    let mut tracker = Tracker::new(TrackerConfig::default());
    let t0 = Instant::now();

    // Frame 1: one new object
    let frame1 = tracker.update(vec![square(100.0, 100.0, 0.9)], t0);
    assert_eq!(frame1.len(), 1);
    let id = frame1[0].track_id.expect("tracked detection carries its id");

    // Frame 2: moved 30 px, inside the 60 px threshold
    let frame2 = tracker.update(vec![square(130.0, 100.0, 0.9)], t0 + Duration::from_millis(100));
    assert_eq!(frame2.len(), 1);
    assert_eq!(frame2[0].track_id, Some(id));
    assert_eq!(tracker.get(id).unwrap().update_count, 2);

    // Frame 3: object missing, track coasts but is still reported
    let frame3 = tracker.update(vec![], t0 + Duration::from_millis(1500));
    assert_eq!(frame3.len(), 1);
    assert_eq!(tracker.get(id).unwrap().state, TrackState::Coasting);

    // Frame 4: reappears near the last known center
    let frame4 = tracker.update(vec![square(140.0, 105.0, 0.9)], t0 + Duration::from_millis(1800));
    assert_eq!(frame4[0].track_id, Some(id));
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_far_detection_starts_new_track() {
    let mut tracker = Tracker::new(TrackerConfig::default());
    let t0 = Instant::now();

    let first = tracker.update(vec![square(100.0, 100.0, 0.9)], t0);
    let second = tracker.update(vec![square(160.0, 100.0, 0.9)], t0 + Duration::from_millis(50));

    // Exactly at the threshold is not a match
    assert_eq!(tracker.len(), 2);
    assert_eq!(second.len(), 2);
    let old_id = first[0].track_id.unwrap();
    let new_id = tracker.tracks().map(|t| t.id).max().unwrap();
    assert!(new_id > old_id);
    assert_eq!(tracker.get(old_id).unwrap().update_count, 1);
}

#[test]
fn test_expiry_boundary() {
    let config = TrackerConfig::new(60.0, Duration::from_secs(2));
    let mut tracker = Tracker::new(config);
    let t0 = Instant::now();
    tracker.update(vec![square(100.0, 100.0, 0.9)], t0);

    // age == timeout is still active
    let at_boundary = tracker.update(vec![], t0 + Duration::from_secs(2));
    assert_eq!(at_boundary.len(), 1);

    let past = tracker.update(vec![], t0 + Duration::from_millis(2001));
    assert!(past.is_empty());
    assert!(tracker.is_empty());
}

#[test]
fn test_stability_needs_sustained_confidence() {
    let mut tracker = Tracker::new(TrackerConfig::default());
    let t0 = Instant::now();

    let mut id = None;
    for i in 0..5u64 {
        let detection = square(100.0 + i as f32, 100.0, 0.9);
        let active = tracker.update(vec![detection], t0 + Duration::from_millis(i * 100));
        id = active[0].track_id;
    }
    let id = id.unwrap();
    let track = tracker.get(id).unwrap();
    assert_eq!(track.update_count, 5);
    assert!(track.is_stable());

    // One weak reading pulls it back below the bar
    tracker.update(vec![square(105.0, 100.0, 0.5)], t0 + Duration::from_millis(500));
    assert!(!tracker.get(id).unwrap().is_stable());
}

#[test]
fn test_closest_pairs_win() {
    let mut tracker = Tracker::new(TrackerConfig::default());
    let t0 = Instant::now();
    tracker.update(vec![square(100.0, 100.0, 0.9), square(300.0, 100.0, 0.9)], t0);
    let ids: Vec<_> = tracker.tracks().map(|t| t.id).collect();

    let active = tracker.update(
        vec![square(290.0, 100.0, 0.8), square(110.0, 100.0, 0.8)],
        t0 + Duration::from_millis(100),
    );
    assert_eq!(active.len(), 2);
    assert_eq!(tracker.get(ids[0]).unwrap().last_center().x, 110);
    assert_eq!(tracker.get(ids[1]).unwrap().last_center().x, 290);
}
