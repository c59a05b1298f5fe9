use crate::connectivity::reachable;
use crate::maze::{Cell, Maze, Position};

/// Outcome of [`validate`]. The reason is diagnostic text for humans and
/// logs; callers must branch on `ok`, never on the wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub ok: bool,
    pub reason: String,
}

impl ValidationResult {
    fn fail(reason: impl Into<String>) -> Self {
        ValidationResult {
            ok: false,
            reason: reason.into(),
        }
    }
}

/// Certifies an externally supplied maze against the generation invariants,
/// short-circuiting on the first failure:
///
/// 1. at least one start cell exists;
/// 2. exactly one goal cell exists (zero and multiple are both rejected);
/// 3. every start reaches the goal over walkable 4-neighbor cells;
/// 4. with two or more starts, at least two reach the goal independently.
///
/// A pure function of the maze: validating the same unmutated maze twice
/// yields the same result.
pub fn validate(maze: &Maze) -> ValidationResult {
    if maze.size() == 0 {
        return ValidationResult::fail("the maze is empty");
    }

    let starts = maze.starts();
    if starts.is_empty() {
        return ValidationResult::fail("no start cell (code 0) found");
    }

    let goals: Vec<Position> = maze
        .positions()
        .filter(|pos| maze[*pos] == Cell::Goal)
        .collect();
    if goals.is_empty() {
        return ValidationResult::fail("no goal cell (code 9) found");
    }
    if goals.len() > 1 {
        return ValidationResult::fail(format!(
            "expected exactly one goal cell, found {}",
            goals.len()
        ));
    }
    let goal = goals[0];

    for start in &starts {
        if !reachable(maze, *start, goal) {
            return ValidationResult::fail(format!(
                "no path from the start at ({}, {}) to the goal",
                start.row, start.col
            ));
        }
    }

    if starts.len() >= 2 {
        let connected = starts
            .iter()
            .filter(|start| reachable(maze, **start, goal))
            .count();
        if connected < 2 {
            return ValidationResult::fail("fewer than two starts can reach the goal");
        }
    }

    ValidationResult {
        ok: true,
        reason: "the maze is valid".into(),
    }
}
