//! End-to-end pipeline behaviour across frames

use collision_sense::{
    run_replay, AppConfig, CollisionPipeline, Detection, DetectionFrame, FrameAssessment, SkipReason,
};
use risk_engine::{BoundingBox, TrackId, Velocity};
use std::sync::Arc;

const WIDTH: f64 = 1920.0;
const HEIGHT: f64 = 1080.0;

/// Car box of the given pixel width centered in frame
fn car(id: u64, width: f64) -> Detection {
    Detection {
        id: TrackId(id),
        bbox: BoundingBox::new(960.0 - width / 2.0, 490.0, 960.0 + width / 2.0, 590.0),
        label: "car".to_string(),
        confidence: 0.9,
    }
}

fn frame(index: u64, timestamp_ms: u64, detections: Vec<Detection>) -> DetectionFrame {
    DetectionFrame {
        frame_index: index,
        timestamp_ms,
        image_width: WIDTH,
        image_height: HEIGHT,
        detections,
    }
}

fn object(out: &FrameAssessment, id: u64) -> &collision_sense::ObjectAssessment {
    out.objects
        .iter()
        .find(|o| o.id == TrackId(id))
        .expect("object assessed")
}

#[test]
fn test_approaching_car_across_frames() {
    let pipeline = CollisionPipeline::new(&AppConfig::default()).unwrap();

    // 180px -> 10m, then 200px -> 9m, 100ms apart: closing at 10 m/s
    pipeline.process_frame(&frame(0, 0, vec![car(1, 180.0)]));
    let out = pipeline.process_frame(&frame(1, 100, vec![car(1, 200.0)]));

    let obj = object(&out, 1);
    assert!((obj.position.z - 9.0).abs() < 1e-9);
    assert!(obj.velocity.vx.abs() < 1e-9);
    assert!((obj.velocity.vz + 10.0).abs() < 1e-9);
    assert!((obj.kinematics.ttc.unwrap() - 0.9).abs() < 1e-9);
    assert_eq!(obj.risk.value(), 69);
}

#[test]
fn test_repeated_timestamp_reuses_last_velocity() {
    let pipeline = CollisionPipeline::new(&AppConfig::default()).unwrap();

    pipeline.process_frame(&frame(0, 0, vec![car(1, 180.0)]));
    pipeline.process_frame(&frame(1, 100, vec![car(1, 200.0)]));
    let out = pipeline.process_frame(&frame(2, 100, vec![car(1, 200.0)]));

    let obj = object(&out, 1);
    assert!((obj.velocity.vz + 10.0).abs() < 1e-9);
    assert_eq!(obj.risk.value(), 69);
}

#[test]
fn test_missed_frame_evicts_history() {
    let pipeline = CollisionPipeline::new(&AppConfig::default()).unwrap();

    pipeline.process_frame(&frame(0, 0, vec![car(1, 180.0), car(2, 90.0)]));
    pipeline.process_frame(&frame(1, 100, vec![car(1, 200.0), car(2, 90.0)]));

    // Track 1 missing for a frame
    let gap = pipeline.process_frame(&frame(2, 200, vec![car(2, 90.0)]));
    assert_eq!(gap.evicted, 1);
    assert_eq!(pipeline.tracked_count(), 1);

    // Reappears: no history, so no velocity across the gap
    let out = pipeline.process_frame(&frame(3, 300, vec![car(1, 220.0), car(2, 90.0)]));
    let obj = object(&out, 1);
    assert_eq!(obj.velocity, Velocity::ZERO);
    assert_eq!(obj.risk.value(), 0);
}

#[test]
fn test_empty_frame_clears_all_tracks() {
    let pipeline = CollisionPipeline::new(&AppConfig::default()).unwrap();
    pipeline.process_frame(&frame(0, 0, vec![car(1, 180.0), car(2, 90.0), car(3, 60.0)]));

    let out = pipeline.process_frame(&frame(1, 100, vec![]));
    assert_eq!(out.evicted, 3);
    assert_eq!(pipeline.tracked_count(), 0);
}

#[test]
fn test_invalid_detection_is_evicted_not_kept_stale() {
    let pipeline = CollisionPipeline::new(&AppConfig::default()).unwrap();
    pipeline.process_frame(&frame(0, 0, vec![car(1, 180.0)]));

    let mut broken = car(1, 180.0);
    broken.bbox = BoundingBox::new(900.0, 490.0, 900.0, 590.0);
    let out = pipeline.process_frame(&frame(1, 100, vec![broken]));

    assert!(out.objects.is_empty());
    assert!(matches!(out.skipped[0].reason, SkipReason::InvalidGeometry(_)));
    assert_eq!(pipeline.tracked_count(), 0);
}

#[test]
fn test_class_width_lookup() {
    let pipeline = CollisionPipeline::new(&AppConfig::default()).unwrap();

    // 30px person 200px right of center: z = 0.15 * 1000 / 30 = 5m, x = 1m
    let person = Detection {
        id: TrackId(8),
        bbox: BoundingBox::new(1145.0, 500.0, 1175.0, 580.0),
        label: "person".to_string(),
        confidence: 0.8,
    };
    let out = pipeline.process_frame(&frame(0, 0, vec![person]));

    let obj = object(&out, 8);
    assert!((obj.position.z - 5.0).abs() < 1e-9);
    assert!((obj.position.x - 1.0).abs() < 1e-9);
    assert!(obj.in_lane);
    assert!((obj.bearing_deg - 1.0f64.atan2(5.0).to_degrees()).abs() < 1e-9);
}

#[tokio::test]
async fn test_replay_emits_json_lines() {
    let pipeline = Arc::new(CollisionPipeline::new(&AppConfig::default()).unwrap());

    let frames = [
        frame(0, 0, vec![car(1, 180.0)]),
        frame(1, 100, vec![car(1, 200.0)]),
    ];
    let mut input = String::new();
    for f in &frames {
        input.push_str(&serde_json::to_string(f).unwrap());
        input.push('\n');
    }
    input.push_str("not json\n\n");

    let mut output = Vec::new();
    let summary = run_replay(
        tokio::io::BufReader::new(std::io::Cursor::new(input.into_bytes())),
        pipeline,
        0.0,
        &mut output,
    )
    .await
    .unwrap();

    assert_eq!(summary.frames_processed, 2);
    assert_eq!(summary.malformed_lines, 1);
    assert_eq!(summary.frames_emitted + summary.frames_dropped, 2);

    // Latest frame always reaches the consumer
    let text = String::from_utf8(output).unwrap();
    let last: FrameAssessment = serde_json::from_str(text.lines().last().unwrap()).unwrap();
    assert_eq!(last.frame_index, 1);
    assert_eq!(last.objects[0].risk.value(), 69);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_history_holds_only_assessed_tracks(
            frames in proptest::collection::vec(
                proptest::collection::btree_map(0u64..8, 20.0f64..400.0, 0..6),
                1..10,
            ),
        ) {
            let pipeline = CollisionPipeline::new(&AppConfig::default()).unwrap();

            for (i, tracks) in frames.iter().enumerate() {
                let detections = tracks.iter().map(|(id, w)| car(*id, *w)).collect();
                let out = pipeline.process_frame(&frame(i as u64, i as u64 * 33, detections));

                prop_assert_eq!(out.objects.len(), tracks.len());
                prop_assert_eq!(pipeline.tracked_count(), tracks.len());
                for obj in &out.objects {
                    prop_assert!(obj.position.z > 0.0);
                    prop_assert!(obj.risk.value() <= 100);
                }
            }
        }
    }
}
