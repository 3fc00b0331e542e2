//! Command tables.
//!
//! A `CommandTable` is the complete description of one DRAM standard as the
//! timing engine sees it. It provides:
//! 1. **Organization:** The ordered level list and the child count per level.
//! 2. **Scopes:** The deepest level each command's legality and state reach.
//! 3. **Function tables:** Per-level prerequisite resolvers, row-hit and row-open
//!    predicates, and state transitions, indexed by command.
//! 4. **Timing tables:** Per-level `TimingEntry` lists, indexed by issuing command.
//! 5. **Controller parameters:** Request translation, read latency, refresh interval.
//!
//! Tables are assembled once with [`CommandTableBuilder`], validated, and then
//! shared immutably (`Arc`) by every device tree and controller of a channel.

use crate::common::{Clock, ConfigError};
use crate::controller::request::RequestKind;

use super::tree::{DeviceTree, NodeId};
use super::{Command, Level, State, TimingEntry};

/// Resolves the command that must issue before `cmd` can target child `child`.
///
/// Returning `Some(cmd)` or any substitute stops decoding at this level.
pub type Prerequisite = fn(&DeviceTree, NodeId, Command, i32) -> Option<Command>;

/// Answers a row-hit or row-open question for child `child` of a node.
pub type RowPredicate = fn(&DeviceTree, NodeId, Command, i32) -> bool;

/// Mutates a node's state when a command passes through its level.
pub type Transition = fn(&mut DeviceTree, NodeId, i32);

/// Parameters for the tRAS-only stall query on standards that define it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestorationTiming {
    /// Activate to precharge (tRAS).
    pub ras: Clock,
    /// Write to precharge (tCWL + tBL + tWR).
    pub write_recovery: Clock,
    /// Read to precharge (tRTP).
    pub read_to_precharge: Clock,
}

#[derive(Clone, Debug, Default)]
struct LevelTable {
    start: Option<State>,
    prerequisite: [Option<Prerequisite>; Command::COUNT],
    row_hit: [Option<RowPredicate>; Command::COUNT],
    row_open: [Option<RowPredicate>; Command::COUNT],
    transition: [Option<Transition>; Command::COUNT],
    timing: [Vec<TimingEntry>; Command::COUNT],
}

/// Immutable description of a DRAM standard.
#[derive(Clone, Debug)]
pub struct CommandTable {
    name: &'static str,
    levels: Vec<Level>,
    counts: Vec<usize>,
    scope: [usize; Command::COUNT],
    per_level: Vec<LevelTable>,
    translate: [Option<Command>; RequestKind::COUNT],
    read_latency: Clock,
    refresh_interval: Clock,
    restoration: Option<RestorationTiming>,
}

impl CommandTable {
    /// Standard name (for example `"DDR4"`).
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Ordered hierarchy levels, channel first.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Number of coordinates in an address vector.
    pub fn arity(&self) -> usize {
        self.levels.len()
    }

    /// Index of `level` in the address vector, if the standard has it.
    pub fn depth_of(&self, level: Level) -> Option<usize> {
        self.levels.iter().position(|&l| l == level)
    }

    /// Index of the Row coordinate.
    pub fn row_depth(&self) -> usize {
        self.arity() - 2
    }

    /// Deepest instantiated level: the one holding row buffers.
    pub fn row_buffer_depth(&self) -> usize {
        self.row_depth() - 1
    }

    /// Index of the Bank coordinate.
    pub fn bank_depth(&self) -> usize {
        // Validated in `build`.
        self.depth_of(Level::Bank).unwrap_or(1)
    }

    /// Child count per level, indexed by depth (`counts()[0]` is the channel count).
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Number of nodes at `depth` under one parent.
    pub fn count(&self, depth: usize) -> usize {
        self.counts[depth]
    }

    /// Depth of the deepest level `cmd` affects.
    pub const fn scope(&self, cmd: Command) -> usize {
        self.scope[cmd.index()]
    }

    /// Start state for nodes at `depth`.
    pub fn start_state(&self, depth: usize) -> Option<State> {
        self.per_level[depth].start
    }

    /// Prerequisite resolver for `cmd` at `depth`.
    pub fn prerequisite(&self, depth: usize, cmd: Command) -> Option<Prerequisite> {
        self.per_level[depth].prerequisite[cmd.index()]
    }

    /// Row-hit predicate for `cmd` at `depth`.
    pub fn row_hit(&self, depth: usize, cmd: Command) -> Option<RowPredicate> {
        self.per_level[depth].row_hit[cmd.index()]
    }

    /// Row-open predicate for `cmd` at `depth`.
    pub fn row_open(&self, depth: usize, cmd: Command) -> Option<RowPredicate> {
        self.per_level[depth].row_open[cmd.index()]
    }

    /// State transition for `cmd` at `depth`.
    pub fn transition(&self, depth: usize, cmd: Command) -> Option<Transition> {
        self.per_level[depth].transition[cmd.index()]
    }

    /// Timing entries triggered when `cmd` issues, for nodes at `depth`.
    pub fn timing(&self, depth: usize, cmd: Command) -> &[TimingEntry] {
        &self.per_level[depth].timing[cmd.index()]
    }

    /// Issue-history length a node at `depth` keeps for `cmd`.
    pub fn history_depth(&self, depth: usize, cmd: Command) -> usize {
        self.timing(depth, cmd)
            .iter()
            .map(|t| t.dist)
            .max()
            .unwrap_or(0)
    }

    /// Final command that completes a request of `kind`.
    pub const fn translate(&self, kind: RequestKind) -> Option<Command> {
        self.translate[kind.index()]
    }

    /// Cycles from a read's final command to its data return.
    pub const fn read_latency(&self) -> Clock {
        self.read_latency
    }

    /// Cycles between refresh commands to each rank (tREFI).
    pub const fn refresh_interval(&self) -> Clock {
        self.refresh_interval
    }

    /// tRAS-related parameters, if the standard supports the tRAS stall query.
    pub const fn restoration(&self) -> Option<RestorationTiming> {
        self.restoration
    }
}

/// Fluent builder for [`CommandTable`].
///
/// Level-keyed calls that name a level the standard does not have are
/// recorded and reported by [`build`](Self::build).
#[derive(Debug)]
pub struct CommandTableBuilder {
    name: &'static str,
    levels: Vec<Level>,
    counts: Vec<usize>,
    scope: [Option<usize>; Command::COUNT],
    per_level: Vec<LevelTable>,
    translate: [Option<Command>; RequestKind::COUNT],
    read_latency: Clock,
    refresh_interval: Clock,
    restoration: Option<RestorationTiming>,
    problems: Vec<String>,
}

impl CommandTableBuilder {
    /// Starts a table with the given level list and per-level child counts.
    ///
    /// # Arguments
    ///
    /// * `name` - Standard name used in diagnostics.
    /// * `levels` - Hierarchy levels, channel first, ending with Row and Column.
    /// * `counts` - Nodes per parent at each level (channels, ranks, ...).
    pub fn new(name: &'static str, levels: &[Level], counts: &[usize]) -> Self {
        Self {
            name,
            levels: levels.to_vec(),
            counts: counts.to_vec(),
            scope: [None; Command::COUNT],
            per_level: vec![LevelTable::default(); levels.len()],
            translate: [None; RequestKind::COUNT],
            read_latency: 0,
            refresh_interval: 0,
            restoration: None,
            problems: Vec::new(),
        }
    }

    fn depth(&mut self, level: Level) -> Option<usize> {
        let depth = self.levels.iter().position(|&l| l == level);
        if depth.is_none() {
            self.problems
                .push(format!("level {level} is not part of the organization"));
        }
        depth
    }

    /// Declares the deepest level affected by each command in `cmds`.
    pub fn scope(mut self, cmds: &[Command], level: Level) -> Self {
        if let Some(depth) = self.depth(level) {
            for cmd in cmds {
                self.scope[cmd.index()] = Some(depth);
            }
        }
        self
    }

    /// Sets the start state of nodes at `level`.
    pub fn start(mut self, level: Level, state: State) -> Self {
        if let Some(depth) = self.depth(level) {
            self.per_level[depth].start = Some(state);
        }
        self
    }

    /// Installs a prerequisite resolver for each command in `cmds` at `level`.
    pub fn prerequisite(mut self, level: Level, cmds: &[Command], f: Prerequisite) -> Self {
        if let Some(depth) = self.depth(level) {
            for cmd in cmds {
                self.per_level[depth].prerequisite[cmd.index()] = Some(f);
            }
        }
        self
    }

    /// Installs a row-hit predicate for each command in `cmds` at `level`.
    pub fn row_hit(mut self, level: Level, cmds: &[Command], f: RowPredicate) -> Self {
        if let Some(depth) = self.depth(level) {
            for cmd in cmds {
                self.per_level[depth].row_hit[cmd.index()] = Some(f);
            }
        }
        self
    }

    /// Installs a row-open predicate for each command in `cmds` at `level`.
    pub fn row_open(mut self, level: Level, cmds: &[Command], f: RowPredicate) -> Self {
        if let Some(depth) = self.depth(level) {
            for cmd in cmds {
                self.per_level[depth].row_open[cmd.index()] = Some(f);
            }
        }
        self
    }

    /// Installs a state transition for each command in `cmds` at `level`.
    pub fn transition(mut self, level: Level, cmds: &[Command], f: Transition) -> Self {
        if let Some(depth) = self.depth(level) {
            for cmd in cmds {
                self.per_level[depth].transition[cmd.index()] = Some(f);
            }
        }
        self
    }

    /// Appends `entries` to the timing list of every command in `from` at `level`.
    pub fn timing(mut self, level: Level, from: &[Command], entries: &[TimingEntry]) -> Self {
        if let Some(depth) = self.depth(level) {
            for cmd in from {
                self.per_level[depth].timing[cmd.index()].extend_from_slice(entries);
            }
        }
        self
    }

    /// Maps a request kind to the command that completes it.
    pub fn translate(mut self, kind: RequestKind, cmd: Command) -> Self {
        self.translate[kind.index()] = Some(cmd);
        self
    }

    /// Sets the read data-return latency.
    pub fn read_latency(mut self, cycles: Clock) -> Self {
        self.read_latency = cycles;
        self
    }

    /// Sets the refresh interval (tREFI).
    pub fn refresh_interval(mut self, cycles: Clock) -> Self {
        self.refresh_interval = cycles;
        self
    }

    /// Enables the tRAS stall query with the given parameters.
    pub fn restoration(mut self, timing: RestorationTiming) -> Self {
        self.restoration = Some(timing);
        self
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidTable {
            standard: self.name,
            reason: reason.into(),
        }
    }

    /// Validates and freezes the table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTable`] when the organization is malformed,
    /// a used command has no scope, a timing entry has an illegal history depth,
    /// or a sibling entry looks further back than the most recent issue.
    pub fn build(self) -> Result<CommandTable, ConfigError> {
        if let Some(problem) = self.problems.first() {
            return Err(self.invalid(problem.clone()));
        }
        let n = self.levels.len();
        if n < 4 || self.levels[0] != Level::Channel {
            return Err(self.invalid("organization must start at Channel and have at least four levels"));
        }
        if self.levels[n - 2..] != [Level::Row, Level::Column] {
            return Err(self.invalid("organization must end with Row, Column"));
        }
        if !self.levels.contains(&Level::Bank) {
            return Err(self.invalid("organization has no Bank level"));
        }
        if self.levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(self.invalid("levels must be listed outermost first without repeats"));
        }
        if self.counts.len() != n {
            return Err(self.invalid(format!(
                "{} counts given for {n} levels",
                self.counts.len()
            )));
        }
        if let Some(depth) = self.counts.iter().position(|&c| c == 0) {
            return Err(self.invalid(format!("level {} has zero nodes", self.levels[depth])));
        }
        if self.refresh_interval <= 0 {
            return Err(self.invalid("refresh interval must be positive"));
        }
        if self.read_latency < 0 {
            return Err(self.invalid("read latency must not be negative"));
        }

        let mut used = [false; Command::COUNT];
        for table in &self.per_level {
            for cmd in Command::ALL {
                let i = cmd.index();
                used[i] |= table.prerequisite[i].is_some()
                    || table.transition[i].is_some()
                    || !table.timing[i].is_empty();
                for t in &table.timing[i] {
                    used[t.cmd.index()] = true;
                    if t.dist == 0 {
                        return Err(self.invalid(format!("{cmd} -> {} has history depth 0", t.cmd)));
                    }
                    if t.sibling && t.dist != 1 {
                        return Err(self.invalid(format!(
                            "sibling entry {cmd} -> {} looks back {} issues",
                            t.cmd, t.dist
                        )));
                    }
                }
            }
        }
        for cmd in self.translate.iter().flatten() {
            used[cmd.index()] = true;
        }

        let mut scope = [0; Command::COUNT];
        for cmd in Command::ALL {
            match self.scope[cmd.index()] {
                Some(depth) => scope[cmd.index()] = depth,
                None if used[cmd.index()] => {
                    return Err(self.invalid(format!("{cmd} is used but has no scope")));
                }
                None => scope[cmd.index()] = n - 1,
            }
        }

        Ok(CommandTable {
            name: self.name,
            levels: self.levels,
            counts: self.counts,
            scope,
            per_level: self.per_level,
            translate: self.translate,
            read_latency: self.read_latency,
            refresh_interval: self.refresh_interval,
            restoration: self.restoration,
        })
    }
}
