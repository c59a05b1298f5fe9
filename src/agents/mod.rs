mod explorer;
mod memory;
mod pathfinder;

pub use explorer::{Explorer, ExplorerStrategy};
pub use memory::ExplorerMemory;
pub use pathfinder::{PathfindingAgent, compute_path};

/// How an agent treats the cell occupied by its opponent. The original
/// behaviors disagree (planning blocks, movement passes through), so both
/// stay configurable instead of being silently unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpponentRule {
    /// The opponent's cell is non-traversable.
    Block,
    /// The opponent's cell is just another walkable cell.
    PassThrough,
}
