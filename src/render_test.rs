#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{DrawStyle, Layer, NewToken, SequentialIds, ShapeKind};

fn board() -> BoardModel {
    BoardModel::with_ids(Box::new(SequentialIds::default()))
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn board_with_everything() -> BoardModel {
    let mut b = board();
    b.set_image(Some("https://maps.example/dungeon.png".into()));
    b.add_token(NewToken::generic(pt(100.0, 50.0), "Knight"));
    b.add_token(NewToken::generic(pt(10.0, 10.0), "Rat"));
    b.commit_drawing(Shape::Line { points: vec![pt(0.0, 0.0), pt(10.0, 0.0)] }, &DrawStyle::default());
    b
}

// =============================================================
// Layers
// =============================================================

#[test]
fn all_layers_visible_projects_everything() {
    let b = board_with_everything();
    let scene = project(&b, &UiState::default(), &InputState::Idle);
    assert!(scene.background.is_some());
    assert_eq!(scene.tokens.len(), 2);
    assert_eq!(scene.drawings.len(), 1);
    assert!(scene.draft.is_none());
    assert!(scene.measurement.is_none());
}

#[test]
fn hidden_tokens_layer_omits_tokens_and_restores_unchanged() {
    let mut b = board_with_everything();
    let before = project(&b, &UiState::default(), &InputState::Idle);

    b.toggle_layer(Layer::Tokens);
    let hidden = project(&b, &UiState::default(), &InputState::Idle);
    assert!(hidden.tokens.is_empty());
    assert_eq!(b.tokens().len(), 2);
    assert_eq!(hidden.drawings, before.drawings);

    b.toggle_layer(Layer::Tokens);
    let restored = project(&b, &UiState::default(), &InputState::Idle);
    assert_eq!(restored.tokens, before.tokens);
}

#[test]
fn hidden_background_and_annotations_are_omitted() {
    let mut b = board_with_everything();
    b.toggle_layer(Layer::Background);
    b.toggle_layer(Layer::Annotations);
    let scene = project(&b, &UiState::default(), &InputState::Idle);
    assert!(scene.background.is_none());
    assert!(scene.drawings.is_empty());
    assert_eq!(scene.tokens.len(), 2);
}

// =============================================================
// Transforms
// =============================================================

#[test]
fn tokens_projected_through_viewport() {
    let mut b = board_with_everything();
    b.set_viewport(Viewport { zoom: 2.0, pan: pt(10.0, 20.0) });
    let scene = project(&b, &UiState::default(), &InputState::Idle);
    let knight = &scene.tokens[0];
    assert_eq!(knight.center, pt(210.0, 120.0));
    assert_eq!(knight.radius, 40.0);
    assert_eq!(knight.label, "Knight");
    let bg = scene.background.unwrap();
    assert_eq!(bg.origin, pt(10.0, 20.0));
    assert_eq!(bg.scale, 2.0);
}

#[test]
fn committed_drawing_scales_stroke() {
    let mut b = board_with_everything();
    b.set_viewport(Viewport { zoom: 1.5, pan: pt(0.0, 0.0) });
    let scene = project(&b, &UiState::default(), &InputState::Idle);
    assert_eq!(scene.drawings[0].stroke_width, 3.0);
    assert!(scene.drawings[0].committed);
    assert_eq!(scene.drawings[0].id.as_deref(), Some("drawing-3"));
}

// =============================================================
// Path data
// =============================================================

#[test]
fn line_path_data() {
    let shape = Shape::Line { points: vec![pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 5.0)] };
    assert_eq!(path_data(&shape, &Viewport::default()), "M 0.00 0.00 L 10.00 0.00 L 10.00 5.00");
}

#[test]
fn rect_path_data_with_zoom() {
    let shape = Shape::Rect { from: pt(1.0, 2.0), to: pt(3.0, 4.0) };
    let v = Viewport { zoom: 2.0, pan: pt(0.0, 0.0) };
    assert_eq!(path_data(&shape, &v), "M 2.00 4.00 L 6.00 4.00 L 6.00 8.00 L 2.00 8.00 Z");
}

#[test]
fn circle_path_data_uses_rim_distance_as_radius() {
    let shape = Shape::Circle { center: pt(50.0, 50.0), rim: pt(53.0, 54.0) };
    assert_eq!(
        path_data(&shape, &Viewport::default()),
        "M 45.00 50.00 A 5.00 5.00 0 1 0 55.00 50.00 A 5.00 5.00 0 1 0 45.00 50.00 Z"
    );
}

// =============================================================
// In-progress overlays
// =============================================================

#[test]
fn draft_drawing_is_uncommitted() {
    let b = board();
    let input = InputState::Drawing { shape: ShapeKind::Rect, vertices: vec![pt(0.0, 0.0), pt(5.0, 5.0)] };
    let scene = project(&b, &UiState::default(), &input);
    let draft = scene.draft.unwrap();
    assert!(!draft.committed);
    assert!(draft.id.is_none());
    assert!(scene.drawings.is_empty());
}

#[test]
fn armed_draw_tool_has_no_draft() {
    let b = board();
    let input = InputState::Drawing { shape: ShapeKind::Line, vertices: Vec::new() };
    assert!(project(&b, &UiState::default(), &input).draft.is_none());
}

#[test]
fn measurement_overlay_while_awaiting_second_point() {
    let b = board();
    let input = InputState::Measuring(MeasurePhase::AwaitingSecond { start: pt(0.0, 0.0), current: pt(30.0, 40.0) });
    let overlay = project(&b, &UiState::default(), &input).measurement.unwrap();
    assert_eq!(overlay.units, 10.0);
    assert_eq!(overlay.end, pt(30.0, 40.0));
}

#[test]
fn no_measurement_overlay_before_first_point() {
    let b = board();
    let input = InputState::Measuring(MeasurePhase::AwaitingFirst);
    assert!(project(&b, &UiState::default(), &input).measurement.is_none());
}

// =============================================================
// Grid
// =============================================================

#[test]
fn grid_hidden_by_default() {
    let b = board();
    let ui = UiState { container_size: Size { width: 200.0, height: 100.0 }, ..UiState::default() };
    assert!(project(&b, &ui, &InputState::Idle).grid.is_empty());
}

#[test]
fn grid_lines_cover_container() {
    let lines = grid_lines(&Viewport::default(), Size { width: 100.0, height: 50.0 });
    // x = 0, 50, 100 and y = 0, 50
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], GridLine { from: pt(0.0, 0.0), to: pt(0.0, 50.0) });
}

#[test]
fn grid_lines_follow_pan_and_zoom() {
    let v = Viewport { zoom: 2.0, pan: pt(30.0, 0.0) };
    let lines = grid_lines(&v, Size { width: 250.0, height: 10.0 });
    let xs: Vec<f64> = lines.iter().filter(|l| l.from.y == 0.0 && l.to.y == 10.0).map(|l| l.from.x).collect();
    assert_eq!(xs, vec![30.0, 130.0, 230.0]);
}

#[test]
fn grid_needs_container_size() {
    assert!(grid_lines(&Viewport::default(), Size::default()).is_empty());
}

#[test]
fn grid_refuses_oversized_container() {
    let v = Viewport { zoom: 0.5, pan: Point::new(0.0, 0.0) };
    assert!(grid_lines(&v, Size { width: 1e12, height: 600.0 }).is_empty());
    assert!(grid_lines(&v, Size { width: 800.0, height: f64::INFINITY }).is_empty());

    let lines = grid_lines(&v, Size { width: MAX_CONTAINER_PX, height: MAX_CONTAINER_PX });
    let per_axis = (MAX_CONTAINER_PX / (GRID_SPACING * 0.5)) as usize + 1;
    assert_eq!(lines.len(), 2 * per_axis);
}
