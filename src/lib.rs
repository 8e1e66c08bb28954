//! Interaction and synchronization engine for a shared tabletop board.
//!
//! Several participants of a game session view one board: a map image,
//! tokens for characters and creatures, freehand annotations, and a distance
//! measurement tool. Each participant's [`session::BoardSession`] turns raw
//! pointer and touch input into board mutations, merges snapshots written by
//! others, and persists local edits through a debounced writer.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`camera`] | Points, viewport transform, zoom clamping, game units |
//! | [`input`] | Tools, input commands and the gesture state machine states |
//! | [`engine`] | [`engine::Engine`]: board model plus tool state machine |
//! | [`doc`] | Board model, tokens, drawings, layers, snapshots |
//! | [`hit`] | Token hit testing |
//! | [`reconcile`] | Field-level merge of remote snapshots |
//! | [`render`] | Projection of board state into screen-space primitives |
//! | [`persistence`] | Debounced snapshot writer |
//! | [`store`] | Snapshot storage and change feed (memory, Postgres) |
//! | [`roster`] | Character and creature roster lookup |
//! | [`upload`] | Background image upload with local fallback |
//! | [`session`] | Event loop tying the above together |
//! | [`config`] | Environment configuration |
//! | [`db`] | Postgres pool and migrations |
//! | [`consts`] | Shared numeric constants |

pub mod camera;
pub mod config;
pub mod consts;
pub mod db;
pub mod doc;
pub mod engine;
pub mod hit;
pub mod input;
pub mod persistence;
pub mod reconcile;
pub mod render;
pub mod roster;
pub mod session;
pub mod store;
pub mod upload;
