//! Core engine for a fog-of-war maze race.
//!
//! A human player and up to two autonomous agents race to a goal cell under
//! partial observability. This crate holds the algorithmic core every front
//! end shares: maze generation and validation, breadth-first connectivity,
//! the fog-of-war visibility mask, a wall-following explorer with memory and
//! loop detection, an A* pathfinding rival, and the turn-based session that
//! ties them together. Rendering, menus, and transport are the caller's
//! business.

mod agents;
mod clock;
mod connectivity;
mod error;
mod game;
mod generator;
mod maze;
mod validator;
mod visibility;

pub use agents::{
    Explorer, ExplorerMemory, ExplorerStrategy, OpponentRule, PathfindingAgent, compute_path,
};
pub use clock::{Clock, SystemClock};
pub use connectivity::reachable;
pub use error::MazeError;
pub use game::{GameConfig, GameSession, MoveEvent, MoveOutcome, PlayerState};
pub use generator::{MIN_SIZE, PickupSet, ensure_pickup, generate, generate_with};
pub use maze::{Cell, Direction, Maze, Position};
pub use validator::{ValidationResult, validate};
pub use visibility::{BASE_VIEW_RADIUS, TORCH_VIEW_RADIUS, VisibilityMask, compute_mask};
