use super::*;

// =============================================================================
// parse_roster
// =============================================================================

#[test]
fn parse_roster_assigns_kinds_in_order() {
    let body = r#"{
        "characters": [{"id": "c1", "displayName": "Mira", "imageReference": "https://img.example/mira.png"}],
        "creatures": [{"id": "m1", "displayName": "Owlbear"}]
    }"#;
    let entries = parse_roster(body).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, TokenKind::Character);
    assert_eq!(entries[0].image_reference.as_deref(), Some("https://img.example/mira.png"));
    assert_eq!(entries[1].kind, TokenKind::Creature);
    assert_eq!(entries[1].display_name, "Owlbear");
    assert!(entries[1].image_reference.is_none());
}

#[test]
fn parse_roster_missing_lists_are_empty() {
    assert!(parse_roster("{}").unwrap().is_empty());
    let only_creatures = parse_roster(r#"{"creatures": [{"id": "m1", "displayName": "Rat"}]}"#).unwrap();
    assert_eq!(only_creatures.len(), 1);
}

#[test]
fn parse_roster_rejects_malformed_body() {
    let err = parse_roster("<html>").unwrap_err();
    assert!(matches!(err, RosterError::Parse(_)));
    let err = parse_roster(r#"{"characters": [{"id": 5}]}"#).unwrap_err();
    assert!(matches!(err, RosterError::Parse(_)));
}

// =============================================================================
// Token conversion
// =============================================================================

fn entry(image: Option<&str>) -> RosterEntry {
    RosterEntry {
        id: "c1".into(),
        display_name: "Mira".into(),
        image_reference: image.map(str::to_owned),
        kind: TokenKind::Character,
    }
}

#[test]
fn entry_with_image_becomes_image_token() {
    let token = entry(Some("https://img.example/mira.png")).to_new_token(Point::new(5.0, 6.0));
    assert_eq!(token.visual, Some(TokenVisual::Image("https://img.example/mira.png".into())));
    assert_eq!(token.linked_entity_id.as_deref(), Some("c1"));
    assert_eq!(token.kind, TokenKind::Character);
    assert_eq!(token.position, Point::new(5.0, 6.0));
}

#[test]
fn entry_without_image_leaves_visual_to_board() {
    assert!(entry(None).to_new_token(Point::ORIGIN).visual.is_none());
}

#[test]
fn find_by_entity_id() {
    let entries = vec![entry(None)];
    assert!(find(&entries, "c1").is_some());
    assert!(find(&entries, "c2").is_none());
}

// =============================================================================
// Providers
// =============================================================================

#[tokio::test]
async fn static_roster_returns_entries_for_any_campaign() {
    let roster = StaticRoster::new(vec![entry(None)]);
    assert_eq!(roster.roster("any").await.unwrap(), vec![entry(None)]);
    assert!(StaticRoster::default().roster("any").await.unwrap().is_empty());
}

#[test]
fn http_roster_url_trims_trailing_slash() {
    let roster = HttpRoster::new("https://roster.example/api/", Duration::from_secs(5)).unwrap();
    assert_eq!(roster.url("camp-1"), "https://roster.example/api/campaigns/camp-1/roster");
}
