#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::doc::Token;

/// The topmost token whose hit region contains `world_pt`.
///
/// A token's hit region is the disc of its radius around its centre. Tokens
/// later in the list are drawn above earlier ones, so the search runs back to
/// front.
#[must_use]
pub fn token_at(world_pt: Point, tokens: &[Token]) -> Option<&Token> {
    tokens
        .iter()
        .rev()
        .find(|t| t.position.distance(world_pt) <= t.radius)
}
