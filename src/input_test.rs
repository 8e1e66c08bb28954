#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

// =============================================================
// Tool
// =============================================================

#[test]
fn tool_default_is_none() {
    assert_eq!(Tool::default(), Tool::None);
}

#[test]
fn tool_deserializes_from_tagged_json() {
    let t: Tool = serde_json::from_value(json!({"tool": "draw", "shape": "circle"})).unwrap();
    assert_eq!(t, Tool::Draw(ShapeKind::Circle));
    let t: Tool = serde_json::from_value(json!({"tool": "measure"})).unwrap();
    assert_eq!(t, Tool::Measure);
}

// =============================================================
// InputState
// =============================================================

#[test]
fn input_state_default_is_idle() {
    assert_eq!(InputState::default(), InputState::Idle);
}

#[test]
fn input_state_tool_mapping() {
    assert_eq!(InputState::Idle.tool(), Tool::None);
    assert_eq!(InputState::PanDragging { last_screen: Point::ORIGIN }.tool(), Tool::None);
    assert_eq!(InputState::Measuring(MeasurePhase::AwaitingFirst).tool(), Tool::Measure);
    assert_eq!(
        InputState::Drawing { shape: ShapeKind::Rect, vertices: Vec::new() }.tool(),
        Tool::Draw(ShapeKind::Rect)
    );
}

#[test]
fn is_dragging_only_for_drags() {
    assert!(InputState::PanDragging { last_screen: Point::ORIGIN }.is_dragging());
    assert!(InputState::TokenDragging { id: "t".into(), last_world: Point::ORIGIN }.is_dragging());
    assert!(!InputState::Idle.is_dragging());
    assert!(!InputState::Measuring(MeasurePhase::AwaitingFirst).is_dragging());
}

#[test]
fn dragged_token_reports_id() {
    let s = InputState::TokenDragging { id: "token-3".into(), last_world: Point::ORIGIN };
    assert_eq!(s.dragged_token(), Some("token-3"));
    assert_eq!(InputState::Idle.dragged_token(), None);
}

// =============================================================
// InputEvent serde
// =============================================================

#[test]
fn input_event_pointer_down_from_json() {
    let e: InputEvent = serde_json::from_value(json!({"type": "pointer_down", "at": {"x": 1.0, "y": 2.0}})).unwrap();
    assert_eq!(e, InputEvent::PointerDown { at: Point::new(1.0, 2.0) });
}

#[test]
fn input_event_pointer_leave_from_json() {
    let e: InputEvent = serde_json::from_value(json!({"type": "pointer_leave"})).unwrap();
    assert_eq!(e, InputEvent::PointerLeave);
}

// =============================================================
// Measurement and pinch helpers
// =============================================================

#[test]
fn measurement_between_three_four_five() {
    let m = Measurement::between(Point::new(0.0, 0.0), Point::new(30.0, 40.0), 1.0);
    assert_eq!(m.units, 10.0);
}

#[test]
fn measurement_between_same_units_at_any_zoom() {
    for zoom in [0.5, 2.0, 3.0] {
        let m = Measurement::between(Point::new(0.0, 0.0), Point::new(30.0, 40.0), zoom);
        assert_eq!(m.units, 10.0);
    }
}

#[test]
fn touch_distance_needs_two_touches() {
    assert_eq!(touch_distance(&[]), None);
    assert_eq!(touch_distance(&[Point::new(0.0, 0.0)]), None);
    assert_eq!(touch_distance(&[Point::new(0.0, 0.0), Point::new(3.0, 4.0)]), Some(5.0));
}

#[test]
fn pinch_zoom_scales_by_ratio() {
    let p = Pinch { initial_distance: 100.0, initial_zoom: 1.5 };
    assert_eq!(p.zoom_for(200.0), 3.0);
    assert_eq!(p.zoom_for(50.0), 0.75);
}
