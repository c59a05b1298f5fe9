use std::time::{Duration, Instant};

use crate::agents::{Explorer, ExplorerStrategy, OpponentRule, PathfindingAgent};
use crate::clock::{Clock, SystemClock};
use crate::maze::{Cell, Direction, Maze, Position};
use crate::validator::validate;
use crate::visibility::{self, BASE_VIEW_RADIUS, TORCH_VIEW_RADIUS, VisibilityMask};

/// Tunables for one game session.
#[derive(Debug, Clone, Copy)]
pub struct GameConfig {
    /// How long a torch widens the view window.
    pub torch_duration: Duration,
    /// How long a trap pins a player in place.
    pub trap_duration: Duration,
    /// Navigation policy for the wall-following enemy.
    pub explorer_strategy: ExplorerStrategy,
    /// How the A* rival treats the player's cell when planning. The source
    /// behavior blocks.
    pub rival_rule: OpponentRule,
    /// How movement treats a cell occupied by another agent. The source
    /// behavior passes through.
    pub movement_rule: OpponentRule,
    /// Spawn a wall-following enemy on the second start.
    pub with_explorer: bool,
    /// Spawn an A*-driven rival racing for the goal.
    pub with_rival: bool,
    /// Seed for the agents' randomness; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            torch_duration: Duration::from_secs(10),
            trap_duration: Duration::from_secs(3),
            explorer_strategy: ExplorerStrategy::default(),
            rival_rule: OpponentRule::Block,
            movement_rule: OpponentRule::PassThrough,
            with_explorer: true,
            with_rival: false,
            seed: None,
        }
    }
}

/// What a single move attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEvent {
    Moved,
    OutOfBounds,
    BlockedByWall,
    BlockedByAgent,
    /// Still pinned by a trap for the given remaining time.
    Immobilized { remaining: Duration },
    /// The hammer was spent to break the wall just stepped through.
    WallBroken,
    TorchPicked,
    HammerPicked,
    TrapSprung,
    Arrived,
}

/// Result of one move attempt. `arrived` is only ever set on the move that
/// steps onto the goal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved: bool,
    pub arrived: bool,
    pub event: MoveEvent,
}

impl MoveOutcome {
    fn rejected(event: MoveEvent) -> Self {
        MoveOutcome {
            moved: false,
            arrived: false,
            event,
        }
    }

    fn moved(event: MoveEvent) -> Self {
        MoveOutcome {
            moved: true,
            arrived: false,
            event,
        }
    }
}

/// Mutable per-player state: position, pickup effects, and arrival.
///
/// Effect deadlines are never cleared eagerly. They are compared against the
/// injected clock whenever a move or visibility call needs them, so with no
/// further calls an expired torch keeps "burning" until somebody looks.
#[derive(Debug, Clone, Copy)]
pub struct PlayerState {
    position: Position,
    torch_until: Option<Instant>,
    has_hammer: bool,
    hammer_used: bool,
    immobilized_until: Option<Instant>,
    arrived: bool,
    finish_time: Option<Duration>,
}

impl PlayerState {
    fn new(position: Position) -> Self {
        PlayerState {
            position,
            torch_until: None,
            has_hammer: false,
            hammer_used: false,
            immobilized_until: None,
            arrived: false,
            finish_time: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn arrived(&self) -> bool {
        self.arrived
    }

    /// Time from session start to arrival, once arrived.
    pub fn finish_time(&self) -> Option<Duration> {
        self.finish_time
    }

    /// Whether an unused hammer is being carried.
    pub fn holds_hammer(&self) -> bool {
        self.has_hammer && !self.hammer_used
    }

    fn view_radius(&self, now: Instant) -> u8 {
        match self.torch_until {
            Some(until) if now < until => TORCH_VIEW_RADIUS,
            _ => BASE_VIEW_RADIUS,
        }
    }
}

/// One turn-based game session. Owns the maze and every agent in it; the
/// caller (a UI loop or timer) drives it with one player move and at most
/// one autonomous turn per tick, in whatever order it likes. Nothing here
/// blocks, and all calls for one session must come from one thread.
pub struct GameSession<C: Clock = SystemClock> {
    config: GameConfig,
    maze: Maze,
    player: PlayerState,
    explorer: Option<Explorer>,
    explorer_arrived: bool,
    rival: Option<PlayerState>,
    pathfinder: PathfindingAgent,
    clock: C,
    started_at: Instant,
}

impl GameSession<SystemClock> {
    /// Builds a session on the system clock. See [`GameSession::with_clock`].
    pub fn new(maze: Maze, config: GameConfig) -> Self {
        Self::with_clock(maze, config, SystemClock)
    }
}

impl<C: Clock> GameSession<C> {
    /// Builds a session over `maze` with an injected clock. An invalid maze
    /// is never fatal: it is logged and replaced with the built-in fallback,
    /// so construction always succeeds.
    pub fn with_clock(maze: Maze, config: GameConfig, clock: C) -> Self {
        let report = validate(&maze);
        let maze = if report.ok {
            maze
        } else {
            tracing::warn!(
                "[game] rejected maze ({}), using the built-in fallback",
                report.reason
            );
            Maze::fallback()
        };

        let player_pos = maze.starts()[0];
        let mut taken = vec![player_pos];

        let explorer = config.with_explorer.then(|| {
            let spawn = spawn_position(&maze, &taken);
            taken.push(spawn);
            Explorer::new(spawn, config.explorer_strategy, config.seed)
        });
        let rival = config.with_rival.then(|| {
            let spawn = spawn_position(&maze, &taken);
            taken.push(spawn);
            PlayerState::new(spawn)
        });

        let started_at = clock.now();
        GameSession {
            pathfinder: PathfindingAgent::with_rule(config.rival_rule, config.seed),
            config,
            maze,
            player: PlayerState::new(player_pos),
            explorer,
            explorer_arrived: false,
            rival,
            clock,
            started_at,
        }
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn rival(&self) -> Option<&PlayerState> {
        self.rival.as_ref()
    }

    pub fn explorer_position(&self) -> Option<Position> {
        self.explorer.as_ref().map(|explorer| explorer.position())
    }

    /// True once anybody has reached the goal.
    pub fn finished(&self) -> bool {
        self.player.arrived
            || self.explorer_arrived
            || self.rival.is_some_and(|rival| rival.arrived)
    }

    /// Attempts to move the human player one cell.
    pub fn move_player(&mut self, direction: Direction) -> MoveOutcome {
        let occupied = [self.explorer_position(), self.rival.map(|r| r.position)];
        let outcome = apply_move(
            &mut self.maze,
            &mut self.player,
            &self.config,
            self.clock.now(),
            self.started_at,
            direction,
            &occupied,
        );
        tracing::debug!("[game] player move {direction:?}: {:?}", outcome.event);
        outcome
    }

    /// Steps the wall-following enemy once and reports its new position, or
    /// `None` when the session has no explorer. Arrival is detected by the
    /// cell the enemy lands on.
    pub fn explorer_turn(&mut self) -> Option<Position> {
        let explorer = self.explorer.as_mut()?;
        explorer.step(&self.maze);
        let pos = explorer.position();
        if self.maze[pos] == Cell::Goal && !self.explorer_arrived {
            self.explorer_arrived = true;
            tracing::info!("[game] the enemy reached the goal at {pos:?}");
        }
        Some(pos)
    }

    /// Lets the A* rival plan and execute one move, with the same movement
    /// mechanics as the player (pickups included). `None` when the session
    /// has no rival or the rival has no legal move this tick.
    pub fn rival_turn(&mut self) -> Option<MoveOutcome> {
        let rival = self.rival.as_mut()?;
        let goal = self.maze.goal()?;
        let direction =
            self.pathfinder
                .decide(&self.maze, rival.position, goal, Some(self.player.position))?;
        let occupied = [
            Some(self.player.position),
            self.explorer.as_ref().map(|explorer| explorer.position()),
        ];
        let outcome = apply_move(
            &mut self.maze,
            rival,
            &self.config,
            self.clock.now(),
            self.started_at,
            direction,
            &occupied,
        );
        tracing::debug!("[game] rival move {direction:?}: {:?}", outcome.event);
        Some(outcome)
    }

    /// The combined fog mask of the player and the rival, with each torch
    /// effect lazily checked against the clock. The enemy does not grant
    /// vision.
    pub fn visibility(&self) -> VisibilityMask {
        let now = self.clock.now();
        let mut observers = vec![(self.player.position, self.player.view_radius(now))];
        if let Some(rival) = &self.rival {
            observers.push((rival.position, rival.view_radius(now)));
        }
        visibility::compute_mask(self.maze.size(), &observers)
    }
}

/// The second and later spawn points: the first unclaimed start cell, then
/// any walkable non-goal cell, then the interior corner as a last resort.
fn spawn_position(maze: &Maze, taken: &[Position]) -> Position {
    maze.starts()
        .into_iter()
        .find(|pos| !taken.contains(pos))
        .or_else(|| {
            maze.positions().find(|pos| {
                maze.is_walkable(*pos) && maze[*pos] != Cell::Goal && !taken.contains(pos)
            })
        })
        .unwrap_or(Position::new(1, 1))
}

/// Executes one move attempt for whichever agent `state` belongs to. The
/// checks run in the source order: trap, bounds, wall (with the hammer
/// override), other agents, goal, and finally pickups on the entered cell.
fn apply_move(
    maze: &mut Maze,
    state: &mut PlayerState,
    config: &GameConfig,
    now: Instant,
    started_at: Instant,
    direction: Direction,
    occupied: &[Option<Position>],
) -> MoveOutcome {
    if let Some(until) = state.immobilized_until {
        if now < until {
            return MoveOutcome::rejected(MoveEvent::Immobilized {
                remaining: until - now,
            });
        }
    }

    let Some(next) = maze.neighbor(state.position, direction) else {
        return MoveOutcome::rejected(MoveEvent::OutOfBounds);
    };

    let cell = maze[next];
    if cell == Cell::Wall {
        if state.holds_hammer() {
            state.hammer_used = true;
            maze[next] = Cell::Path;
            state.position = next;
            tracing::info!("[game] wall at {next:?} broken with the hammer");
            return MoveOutcome::moved(MoveEvent::WallBroken);
        }
        return MoveOutcome::rejected(MoveEvent::BlockedByWall);
    }

    if config.movement_rule == OpponentRule::Block
        && occupied.iter().any(|pos| *pos == Some(next))
    {
        return MoveOutcome::rejected(MoveEvent::BlockedByAgent);
    }

    if cell == Cell::Goal {
        state.position = next;
        state.arrived = true;
        if state.finish_time.is_none() {
            state.finish_time = Some(now - started_at);
        }
        return MoveOutcome {
            moved: true,
            arrived: true,
            event: MoveEvent::Arrived,
        };
    }

    state.position = next;
    let event = match cell {
        Cell::Torch => {
            state.torch_until = Some(now + config.torch_duration);
            maze[next] = Cell::Path;
            MoveEvent::TorchPicked
        }
        Cell::Hammer => {
            state.has_hammer = true;
            maze[next] = Cell::Path;
            MoveEvent::HammerPicked
        }
        Cell::Trap => {
            state.immobilized_until = Some(now + config.trap_duration);
            maze[next] = Cell::Path;
            MoveEvent::TrapSprung
        }
        _ => MoveEvent::Moved,
    };
    MoveOutcome::moved(event)
}
