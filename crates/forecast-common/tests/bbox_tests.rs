//! Tests for BoundingBox parsing and buffering.

use forecast_common::bbox::{BboxParseError, BoundingBox};

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(-125.0, -87.0, 25.0, 52.0);
    assert_eq!(bbox.west, -125.0);
    assert_eq!(bbox.east, -87.0);
    assert_eq!(bbox.south, 25.0);
    assert_eq!(bbox.north, 52.0);
    assert_eq!(bbox.width(), 38.0);
    assert_eq!(bbox.height(), 27.0);
}

#[test]
fn test_bbox_from_ranges() {
    let bbox = BoundingBox::from_ranges((-110.0, -100.0), (35.0, 42.0));
    assert_eq!(bbox, BoundingBox::new(-110.0, -100.0, 35.0, 42.0));
}

#[test]
fn test_default_extent() {
    assert_eq!(BoundingBox::default(), BoundingBox::new(-135.0, -80.0, 20.0, 60.0));
}

#[test]
fn test_parse_extent() {
    let bbox: BoundingBox = "-125, -87.5, 25, 52".parse().unwrap();
    assert_eq!(bbox, BoundingBox::new(-125.0, -87.5, 25.0, 52.0));
}

#[test]
fn test_parse_extent_wrong_count() {
    let result: Result<BoundingBox, _> = "-125,-87,25".parse();
    assert!(matches!(result, Err(BboxParseError::InvalidFormat(_))));
}

#[test]
fn test_parse_extent_bad_number() {
    let result: Result<BoundingBox, _> = "-125,east,25,52".parse();
    assert!(matches!(result, Err(BboxParseError::InvalidNumber(_))));
}

#[test]
fn test_parse_extent_inverted() {
    let result: Result<BoundingBox, _> = "-80,-125,25,52".parse();
    assert!(matches!(result, Err(BboxParseError::Inverted(_))));
}

#[test]
fn test_parse_extent_off_globe() {
    let result: Result<BoundingBox, _> = "-125,-80,25,95".parse();
    assert!(matches!(result, Err(BboxParseError::OutOfRange(_))));
}

#[test]
fn test_display_round_trips() {
    let bbox = BoundingBox::new(-126.5, -86.0, 24.0, 53.25);
    let parsed: BoundingBox = bbox.to_string().parse().unwrap();
    assert_eq!(parsed, bbox);
}
