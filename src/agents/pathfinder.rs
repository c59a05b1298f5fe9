use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::rc::Rc;

use rand::{Rng, rngs::StdRng};

use super::OpponentRule;
use crate::generator::get_rng;
use crate::maze::{Direction, Maze, Position};

/// Node tracked by the A* open set.
struct TrackedCell {
    pos: Position,
    /// The cell this one was reached from, for path reconstruction.
    parent: Option<Rc<TrackedCell>>,
    /// Cost to reach this cell from the start.
    traveling_cost: usize,
    /// Manhattan estimate of the cost still ahead.
    heuristic_cost: usize,
}

impl TrackedCell {
    fn total_cost(&self) -> usize {
        self.traveling_cost + self.heuristic_cost
    }
}

impl PartialEq for TrackedCell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for TrackedCell {}

impl PartialOrd for TrackedCell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TrackedCell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.total_cost()
            .cmp(&other.total_cost())
            .then(self.heuristic_cost.cmp(&other.heuristic_cost))
    }
}

/// A* shortest path over the 4-neighborhood, with unit step cost and the
/// Manhattan distance as the heuristic. Returns the move sequence from
/// `start` to `goal`, or an empty sequence when no path exists. A cell in
/// `blocked` is non-traversable regardless of its code.
///
/// Cells are re-inserted into the open set whenever a strictly better
/// traveling cost is found through a different predecessor; stale entries
/// are dropped when dequeued.
pub fn compute_path(
    maze: &Maze,
    start: Position,
    goal: Position,
    blocked: Option<Position>,
) -> Vec<Direction> {
    if !maze.in_bounds(start) || !maze.in_bounds(goal) {
        return Vec::new();
    }

    let mut open: BinaryHeap<Reverse<TrackedCell>> = BinaryHeap::new();
    let mut best_costs: HashMap<Position, usize> = HashMap::new();
    let mut closed: HashSet<Position> = HashSet::new();

    open.push(Reverse(TrackedCell {
        pos: start,
        parent: None,
        traveling_cost: 0,
        heuristic_cost: start.manhattan(goal),
    }));
    best_costs.insert(start, 0);

    while let Some(Reverse(current)) = open.pop() {
        if current.pos == goal {
            return rebuild_moves(current);
        }
        if !closed.insert(current.pos) {
            continue;
        }

        let current = Rc::new(current);
        let next_cost = current.traveling_cost + 1;
        for direction in Direction::ALL {
            let Some(next) = maze.neighbor(current.pos, direction) else {
                continue;
            };
            if !maze.is_walkable(next) || Some(next) == blocked || closed.contains(&next) {
                continue;
            }
            let cheaper = match best_costs.get(&next) {
                Some(&cost) => next_cost < cost,
                None => true,
            };
            if cheaper {
                best_costs.insert(next, next_cost);
                open.push(Reverse(TrackedCell {
                    pos: next,
                    parent: Some(current.clone()),
                    traveling_cost: next_cost,
                    heuristic_cost: next.manhattan(goal),
                }));
            }
        }
    }

    Vec::new()
}

/// Walks the parent chain back from the goal node and flips it into a
/// start-to-goal move sequence.
fn rebuild_moves(goal_cell: TrackedCell) -> Vec<Direction> {
    let mut moves = Vec::with_capacity(goal_cell.traveling_cost);
    let mut child = Rc::new(goal_cell);
    while let Some(parent) = child.parent.clone() {
        moves.push(direction_between(parent.pos, child.pos));
        child = parent;
    }
    moves.reverse();
    moves
}

fn direction_between(from: Position, to: Position) -> Direction {
    if to.row < from.row {
        Direction::Up
    } else if to.row > from.row {
        Direction::Down
    } else if to.col < from.col {
        Direction::Left
    } else {
        Direction::Right
    }
}

/// The informed opponent. It re-plans from scratch on every call and only
/// ever commits to the first step, so it reacts to whatever changed since
/// the last tick; when planning finds nothing it falls back to a uniformly
/// random legal step rather than standing still.
pub struct PathfindingAgent {
    opponent_rule: OpponentRule,
    rng: StdRng,
}

impl PathfindingAgent {
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_rule(OpponentRule::Block, seed)
    }

    pub fn with_rule(opponent_rule: OpponentRule, seed: Option<u64>) -> Self {
        PathfindingAgent {
            opponent_rule,
            rng: get_rng(seed),
        }
    }

    /// The next move toward `goal`, or `None` when not even a random step is
    /// legal. The opponent's cell is avoided in planning according to the
    /// configured rule and is always excluded from the random fallback.
    pub fn decide(
        &mut self,
        maze: &Maze,
        start: Position,
        goal: Position,
        opponent: Option<Position>,
    ) -> Option<Direction> {
        let blocked = match self.opponent_rule {
            OpponentRule::Block => opponent,
            OpponentRule::PassThrough => None,
        };
        let path = compute_path(maze, start, goal, blocked);
        if let Some(&first) = path.first() {
            return Some(first);
        }

        tracing::debug!("[pathfinder] no path from {start:?} to {goal:?}, trying a random step");
        let legal: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| {
                maze.neighbor(start, *direction)
                    .is_some_and(|dest| maze.is_walkable(dest) && Some(dest) != opponent)
            })
            .collect();
        if legal.is_empty() {
            None
        } else {
            Some(legal[self.rng.random_range(0..legal.len())])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::Cell;

    #[test]
    fn test_unique_shortest_path_has_exact_length() {
        // Start and goal share a row on open ground, so the only shortest
        // path is the straight line between them.
        let maze = Maze::new(5, Cell::Path);
        let path = compute_path(&maze, Position::new(2, 0), Position::new(2, 4), None);
        assert_eq!(path.len(), 4);
        assert!(path.iter().all(|direction| *direction == Direction::Right));
    }

    #[test]
    fn test_walls_force_a_detour() {
        let mut maze = Maze::new(5, Cell::Path);
        for row in 0..4 {
            maze[Position::new(row, 2)] = Cell::Wall;
        }
        let path = compute_path(&maze, Position::new(0, 0), Position::new(0, 4), None);
        // Around the wall: down to row 4, across, and back up.
        assert_eq!(path.len(), 12);
        let mut pos = Position::new(0, 0);
        for direction in &path {
            pos = maze.neighbor(pos, *direction).expect("path stays in bounds");
            assert!(maze.is_walkable(pos));
        }
        assert_eq!(pos, Position::new(0, 4));
    }

    #[test]
    fn test_no_path_returns_empty() {
        let mut maze = Maze::new(5, Cell::Path);
        for row in 0..5 {
            maze[Position::new(row, 2)] = Cell::Wall;
        }
        assert!(compute_path(&maze, Position::new(2, 0), Position::new(2, 4), None).is_empty());
    }

    #[test]
    fn test_blocked_opponent_cell_is_avoided() {
        // A one-wide corridor with the opponent standing in the middle.
        let mut maze = Maze::new(5, Cell::Wall);
        for col in 0..5 {
            maze[Position::new(2, col)] = Cell::Path;
        }
        let opponent = Some(Position::new(2, 2));
        let blocked = compute_path(&maze, Position::new(2, 0), Position::new(2, 4), opponent);
        assert!(blocked.is_empty());
        let free = compute_path(&maze, Position::new(2, 0), Position::new(2, 4), None);
        assert_eq!(free.len(), 4);
    }

    #[test]
    fn test_decide_takes_first_planned_step() {
        let maze = Maze::new(5, Cell::Path);
        let mut agent = PathfindingAgent::new(Some(0));
        let step = agent.decide(&maze, Position::new(0, 0), Position::new(0, 3), None);
        assert_eq!(step, Some(Direction::Right));
    }

    #[test]
    fn test_decide_falls_back_to_a_random_legal_step() {
        // Goal sealed off: planning fails, but a legal sideways step exists.
        let mut maze = Maze::new(5, Cell::Path);
        for row in 0..5 {
            maze[Position::new(row, 3)] = Cell::Wall;
        }
        let mut agent = PathfindingAgent::new(Some(0));
        let start = Position::new(2, 1);
        let step = agent
            .decide(&maze, start, Position::new(2, 4), None)
            .expect("a random step is available");
        let dest = maze.neighbor(start, step).unwrap();
        assert!(maze.is_walkable(dest));
    }

    #[test]
    fn test_decide_reports_no_move_when_sealed() {
        let mut maze = Maze::new(3, Cell::Wall);
        let start = Position::new(1, 1);
        maze[start] = Cell::Path;
        maze[Position::new(1, 2)] = Cell::Path;
        let mut agent = PathfindingAgent::new(Some(0));
        // The only open neighbor is occupied by the opponent, which the
        // fallback never steps onto.
        let step = agent.decide(&maze, start, Position::new(0, 0), Some(Position::new(1, 2)));
        assert_eq!(step, None);
    }

    #[test]
    fn test_pass_through_rule_plans_over_the_opponent() {
        let mut maze = Maze::new(5, Cell::Wall);
        for col in 0..5 {
            maze[Position::new(2, col)] = Cell::Path;
        }
        let mut agent = PathfindingAgent::with_rule(OpponentRule::PassThrough, Some(0));
        let step = agent.decide(
            &maze,
            Position::new(2, 0),
            Position::new(2, 4),
            Some(Position::new(2, 2)),
        );
        assert_eq!(step, Some(Direction::Right));
    }
}
