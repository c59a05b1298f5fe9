use rand::{Rng, rngs::StdRng};

use super::memory::ExplorerMemory;
use crate::generator::get_rng;
use crate::maze::{Cell, Direction, Maze, Position};
use crate::visibility::BASE_VIEW_RADIUS;

/// Visits after which the simple policy declares a loop.
const LOOP_VISIT_LIMIT: u32 = 5;
/// Consecutive stays after which the simple policy declares a loop.
const LOOP_STAY_LIMIT: u32 = 3;
/// The simple right-hand rule skips cells visited this often.
const RIGHT_HAND_VISIT_CAP: u32 = 3;
/// Consecutive stalls before the memory policy marks a dead end.
const DEAD_END_STALL_LIMIT: u32 = 2;
/// Loop escape picks randomly among this many least-visited neighbors.
const LOOP_ESCAPE_CHOICES: usize = 3;

/// Navigation policy for the [`Explorer`]. One agent type, two selectable
/// behaviors, chosen by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplorerStrategy {
    /// Fog-aware navigation over remembered cells, visit counts, and
    /// permanent dead-end marks.
    #[default]
    MemoryBased,
    /// Ground-truth right-hand rule with a randomized loop escape. No fog,
    /// no remembered cells.
    SimpleLoopBreaker,
}

/// A stateful wall-following navigator. Each [`Explorer::step`] observes,
/// updates its private memory, and moves at most one cell.
pub struct Explorer {
    position: Position,
    facing: Direction,
    strategy: ExplorerStrategy,
    memory: ExplorerMemory,
    view_radius: u8,
    same_position_count: u32,
    last_position: Option<Position>,
    rng: StdRng,
}

impl Explorer {
    pub fn new(start: Position, strategy: ExplorerStrategy, seed: Option<u64>) -> Self {
        Explorer {
            position: start,
            facing: Direction::Right,
            strategy,
            memory: ExplorerMemory::new(),
            view_radius: BASE_VIEW_RADIUS,
            same_position_count: 0,
            last_position: None,
            rng: get_rng(seed),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn memory(&self) -> &ExplorerMemory {
        &self.memory
    }

    pub fn set_view_radius(&mut self, radius: u8) {
        self.view_radius = radius;
    }

    /// Forgets everything and restarts from `start`, for a full game reset.
    pub fn reset(&mut self, start: Position) {
        self.position = start;
        self.facing = Direction::Right;
        self.memory.clear();
        self.same_position_count = 0;
        self.last_position = None;
    }

    /// Advances the agent by at most one cell. A step with no passable
    /// direction is a no-op: position and facing stay put.
    pub fn step(&mut self, maze: &Maze) {
        match self.strategy {
            ExplorerStrategy::MemoryBased => self.step_memory(maze),
            ExplorerStrategy::SimpleLoopBreaker => self.step_simple(maze),
        }
    }

    fn step_memory(&mut self, maze: &Maze) {
        // Record the ground truth of every cell inside the view window.
        // This is the only place memory learns about the maze.
        let radius = self.view_radius as usize;
        let size = maze.size();
        let row_end = (self.position.row + radius).min(size.saturating_sub(1));
        let col_end = (self.position.col + radius).min(size.saturating_sub(1));
        for row in self.position.row.saturating_sub(radius)..=row_end {
            for col in self.position.col.saturating_sub(radius)..=col_end {
                let pos = Position::new(row, col);
                self.memory.remember_cell(pos, maze[pos]);
            }
        }

        if self.last_position == Some(self.position) {
            self.same_position_count += 1;
        } else {
            self.same_position_count = 0;
        }
        self.last_position = Some(self.position);

        // A stalled agent with at most one way out writes the cell off for
        // good. The mark survives even if the true code is open floor.
        let open_directions = Direction::ALL
            .into_iter()
            .filter(|direction| self.passable(maze, *direction).is_some())
            .count();
        if open_directions <= 1
            && self.same_position_count > DEAD_END_STALL_LIMIT
            && !self.memory.is_dead_end(self.position)
        {
            tracing::debug!("[explorer] marking {:?} as a dead end", self.position);
            self.memory.mark_dead_end(self.position);
        }

        let priority = [
            self.facing.right(),
            self.facing,
            self.facing.left(),
            self.facing.opposite(),
        ];

        // Unexplored cells win outright; otherwise take the least-visited
        // passable one. Both tie-break along the right-hand rotation.
        let chosen = priority
            .into_iter()
            .filter_map(|direction| {
                self.passable(maze, direction)
                    .map(|dest| (direction, dest))
            })
            .find(|(_, dest)| !self.memory.has_explored(*dest))
            .or_else(|| {
                priority
                    .into_iter()
                    .filter_map(|direction| {
                        self.passable(maze, direction)
                            .map(|dest| (direction, dest))
                    })
                    .min_by_key(|(_, dest)| self.memory.visit_count(*dest))
            });

        if let Some((direction, dest)) = chosen {
            self.facing = direction;
            self.position = dest;
            self.memory.record_position(dest);
        }
    }

    /// Whether the memory policy may move one step in `direction`: the
    /// destination must be in bounds, not a known dead end, and open per the
    /// best available knowledge. Inside the view window the ground truth
    /// decides; outside, memory decides, and never-seen cells count as open.
    fn passable(&self, maze: &Maze, direction: Direction) -> Option<Position> {
        let dest = maze.neighbor(self.position, direction)?;
        if self.memory.is_dead_end(dest) {
            return None;
        }
        let in_view = self.position.chebyshev(dest) <= self.view_radius as usize;
        let open = if in_view {
            maze[dest] != Cell::Wall
        } else {
            !matches!(self.memory.remembered_cell(dest), Some(Cell::Wall))
        };
        open.then_some(dest)
    }

    fn step_simple(&mut self, maze: &Maze) {
        if self.last_position == Some(self.position) {
            self.same_position_count += 1;
        } else {
            self.same_position_count = 0;
        }
        self.last_position = Some(self.position);
        self.memory.record_position(self.position);

        let visits = self.memory.visit_count(self.position);
        if visits > LOOP_VISIT_LIMIT || self.same_position_count > LOOP_STAY_LIMIT {
            if self.escape_loop(maze) {
                return;
            }
        }

        // Right-hand rule: relative right, forward, left while the
        // destination is still fresh, then a u-turn with no freshness check
        // since a dead end leaves no other option.
        for direction in [self.facing.right(), self.facing, self.facing.left()] {
            if let Some(dest) = self.free_neighbor(maze, direction) {
                if self.memory.visit_count(dest) < RIGHT_HAND_VISIT_CAP {
                    self.facing = direction;
                    self.position = dest;
                    return;
                }
            }
        }
        let back = self.facing.opposite();
        if let Some(dest) = self.free_neighbor(maze, back) {
            self.facing = back;
            self.position = dest;
        }
    }

    /// Jumps to a random choice among the least-visited free neighbors and
    /// wipes the visit counts. Returns false when boxed in entirely.
    fn escape_loop(&mut self, maze: &Maze) -> bool {
        let mut moves: Vec<(Direction, Position, u32)> = Direction::ALL
            .into_iter()
            .filter_map(|direction| {
                self.free_neighbor(maze, direction)
                    .map(|dest| (direction, dest, self.memory.visit_count(dest)))
            })
            .collect();
        if moves.is_empty() {
            return false;
        }

        moves.sort_by_key(|(_, _, count)| *count);
        let pick = self.rng.random_range(0..moves.len().min(LOOP_ESCAPE_CHOICES));
        let (direction, dest, _) = moves[pick];
        tracing::debug!(
            "[explorer] loop detected at {:?}, escaping {:?}",
            self.position,
            direction
        );
        self.facing = direction;
        self.position = dest;
        self.memory.clear_visits();
        self.same_position_count = 0;
        true
    }

    /// Ground-truth passability for the simple policy: in bounds and not a
    /// wall.
    fn free_neighbor(&self, maze: &Maze, direction: Direction) -> Option<Position> {
        maze.neighbor(self.position, direction)
            .filter(|dest| maze.is_walkable(*dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A maze that is all wall except the given open cells.
    fn pocket_maze(size: usize, open: &[Position]) -> Maze {
        let mut maze = Maze::new(size, Cell::Wall);
        for pos in open {
            maze[*pos] = Cell::Path;
        }
        maze
    }

    #[test]
    fn test_right_hand_priority_on_open_ground() {
        let maze = Maze::new(7, Cell::Path);
        let mut agent = Explorer::new(Position::new(3, 3), ExplorerStrategy::MemoryBased, Some(0));
        agent.step(&maze);
        // Facing right, the relative right is down.
        assert_eq!(agent.position(), Position::new(4, 3));
        assert_eq!(agent.facing(), Direction::Down);
    }

    #[test]
    fn test_stalled_agent_marks_dead_end() {
        let start = Position::new(2, 2);
        let maze = pocket_maze(5, &[start]);
        let mut agent = Explorer::new(start, ExplorerStrategy::MemoryBased, Some(0));

        for _ in 0..3 {
            agent.step(&maze);
            assert!(!agent.memory().is_dead_end(start));
        }
        // The fourth stall crosses the threshold.
        agent.step(&maze);
        assert_eq!(agent.position(), start);
        assert!(agent.memory().is_dead_end(start));
    }

    #[test]
    fn test_dead_end_is_never_reentered() {
        // The agent starts sealed in, writes its cell off as a dead end,
        // and is then released by opening a wall next to it. Once out it
        // must never walk back onto the marked cell.
        let trap = Position::new(1, 1);
        let mut maze = pocket_maze(
            5,
            &[trap],
        );
        let mut agent = Explorer::new(trap, ExplorerStrategy::MemoryBased, Some(0));
        for _ in 0..4 {
            agent.step(&maze);
        }
        assert!(agent.memory().is_dead_end(trap));

        // Open a way out into a small corridor.
        maze[Position::new(1, 2)] = Cell::Path;
        maze[Position::new(1, 3)] = Cell::Path;
        maze[Position::new(2, 3)] = Cell::Path;

        agent.step(&maze);
        assert_eq!(agent.position(), Position::new(1, 2));
        for _ in 0..30 {
            agent.step(&maze);
            assert_ne!(agent.position(), trap);
        }
    }

    #[test]
    fn test_memory_agent_walks_a_corridor_to_its_end() {
        // Fresh cells always beat revisits, so the agent never turns back
        // before the corridor runs out.
        let cells: Vec<Position> = (1..6).map(|col| Position::new(1, col)).collect();
        let maze = pocket_maze(7, &cells);
        let mut agent = Explorer::new(Position::new(1, 1), ExplorerStrategy::MemoryBased, Some(0));
        for _ in 0..4 {
            agent.step(&maze);
        }
        assert_eq!(agent.position(), Position::new(1, 5));
    }

    #[test]
    fn test_simple_strategy_hugs_the_right_wall() {
        // A 2x2 room with a tail hanging off. Hugging the right wall walks
        // the agent straight onto the tail: down, then right, then down.
        let room = [
            Position::new(1, 1),
            Position::new(1, 2),
            Position::new(2, 1),
            Position::new(2, 2),
            Position::new(3, 2),
        ];
        let maze = pocket_maze(6, &room);
        let mut agent = Explorer::new(
            Position::new(1, 1),
            ExplorerStrategy::SimpleLoopBreaker,
            Some(42),
        );
        agent.step(&maze);
        assert_eq!(agent.position(), Position::new(2, 1));
        assert_eq!(agent.facing(), Direction::Down);
        agent.step(&maze);
        assert_eq!(agent.position(), Position::new(2, 2));
        agent.step(&maze);
        assert_eq!(agent.position(), Position::new(3, 2));
    }

    #[test]
    fn test_loop_escape_keeps_visit_counts_bounded() {
        // A closed 2x2 room. Counts climb until the loop breaker fires and
        // wipes them, so the maximum observed count stays near the limit.
        let room = [
            Position::new(1, 1),
            Position::new(1, 2),
            Position::new(2, 1),
            Position::new(2, 2),
        ];
        let maze = pocket_maze(4, &room);
        let mut agent = Explorer::new(
            Position::new(1, 1),
            ExplorerStrategy::SimpleLoopBreaker,
            Some(7),
        );
        for _ in 0..50 {
            agent.step(&maze);
            let worst = room
                .iter()
                .map(|pos| agent.memory().visit_count(*pos))
                .max()
                .unwrap();
            assert!(worst <= LOOP_VISIT_LIMIT + 1);
        }
    }

    #[test]
    fn test_boxed_in_simple_agent_stays_put() {
        let start = Position::new(2, 2);
        let maze = pocket_maze(5, &[start]);
        let mut agent = Explorer::new(start, ExplorerStrategy::SimpleLoopBreaker, Some(1));
        for _ in 0..10 {
            agent.step(&maze);
            assert_eq!(agent.position(), start);
        }
    }

    #[test]
    fn test_reset_clears_the_session() {
        let maze = Maze::new(6, Cell::Path);
        let mut agent = Explorer::new(Position::new(2, 2), ExplorerStrategy::MemoryBased, Some(9));
        for _ in 0..5 {
            agent.step(&maze);
        }
        assert!(!agent.memory().path().is_empty());
        agent.reset(Position::new(1, 1));
        assert_eq!(agent.position(), Position::new(1, 1));
        assert!(agent.memory().path().is_empty());
        assert_eq!(agent.facing(), Direction::Right);
    }
}
