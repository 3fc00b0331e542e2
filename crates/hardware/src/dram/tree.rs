//! Device tree timing engine.
//!
//! One `DeviceTree` models a channel: an arena of nodes, one per physical
//! component from the channel down to the row-buffer level (bank, or subarray
//! for subarray-parallel standards). Rows and columns are never instantiated.
//!
//! The tree provides:
//! 1. **Decode:** Resolves the command that must actually issue next for a request
//!    (an activate before a read to a closed bank, a precharge before a conflict).
//! 2. **Check:** Tests whether a command may legally issue at a clock, along the
//!    path from the channel down to the command's scope.
//! 3. **Update:** Applies state transitions and propagates timing constraints to
//!    the target path (with issue history) and to siblings (from "now").
//! 4. **Queries:** Row hit/open, earliest legal clock, relaxed tRCD/tRAS checks,
//!    flat bank numbering, and subarray growth.
//!
//! Traversal is iterative over parent/child indices; nodes never own each other.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::common::{Clock, ConfigError};

use super::table::{CommandTable, RestorationTiming};
use super::{Command, Level, State};

/// Index of a node in the tree's arena.
pub type NodeId = usize;

const ROOT: NodeId = 0;

/// One instantiated component (channel, rank, bank group, bank, or subarray).
#[derive(Clone, Debug)]
pub struct Node {
    depth: usize,
    id: i32,
    /// Coarse state (open/closed for row buffers, power state for ranks).
    pub state: Option<State>,
    /// Per-row state for row-buffer nodes, keyed by row id.
    pub row_state: BTreeMap<i32, State>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    next: [Clock; Command::COUNT],
    prev: [VecDeque<Clock>; Command::COUNT],
}

impl Node {
    /// Depth of this node (index into the address vector).
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Coordinate of this node among its siblings.
    pub const fn id(&self) -> i32 {
        self.id
    }

    /// Parent node, `None` for the channel.
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in coordinate order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Earliest clock at which `cmd` may target this node (`-1`: unconstrained).
    pub const fn next(&self, cmd: Command) -> Clock {
        self.next[cmd.index()]
    }

    /// Most recent issue clocks of `cmd` at this node, newest first.
    pub fn prev(&self, cmd: Command) -> &VecDeque<Clock> {
        &self.prev[cmd.index()]
    }

    /// Returns `true` when no timing constraint holds `cmd` back at `clk`.
    #[inline(always)]
    const fn allows(&self, cmd: Command, clk: Clock) -> bool {
        let next = self.next[cmd.index()];
        next == -1 || clk >= next
    }

    /// Most recent issue of `cmd`, if the node keeps history for it and it has issued.
    fn last_issue(&self, cmd: Command) -> Option<Clock> {
        self.prev[cmd.index()].front().copied().filter(|&t| t >= 0)
    }
}

/// Arena of device nodes for one channel.
#[derive(Clone, Debug)]
pub struct DeviceTree {
    table: Arc<CommandTable>,
    nodes: Vec<Node>,
    counts: Vec<usize>,
    clk: Clock,
}

/// Iterator over the nodes from the root toward an address.
struct Path<'a> {
    tree: &'a DeviceTree,
    addr: &'a [i32],
    limit: usize,
    cursor: Option<NodeId>,
}

impl Iterator for Path<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.cursor?;
        let node = &self.tree.nodes[current];
        let child_id = self.addr[node.depth + 1];
        self.cursor = if child_id < 0 || node.depth >= self.limit || node.children.is_empty() {
            None
        } else {
            Some(node.children[child_id as usize])
        };
        Some(current)
    }
}

impl DeviceTree {
    /// Builds the tree of one channel from its command table.
    ///
    /// # Arguments
    ///
    /// * `table` - Shared command table of the standard.
    /// * `channel` - Channel coordinate this tree answers to.
    pub fn new(table: Arc<CommandTable>, channel: i32) -> Self {
        let counts = table.counts().to_vec();
        let mut tree = Self {
            table,
            nodes: Vec::new(),
            counts,
            clk: 0,
        };
        let root = tree.spawn(None, 0, channel);
        tree.populate(root);
        tree
    }

    fn spawn(&mut self, parent: Option<NodeId>, depth: usize, id: i32) -> NodeId {
        let table = &self.table;
        let node = Node {
            depth,
            id,
            state: table.start_state(depth),
            row_state: BTreeMap::new(),
            parent,
            children: Vec::new(),
            next: [-1; Command::COUNT],
            prev: std::array::from_fn(|i| {
                VecDeque::from(vec![-1; table.history_depth(depth, Command::ALL[i])])
            }),
        };
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Instantiates every missing descendant of `root` down to the row-buffer level.
    fn populate(&mut self, root: NodeId) {
        let leaf = self.table.row_buffer_depth();
        let mut stack = vec![root];
        while let Some(parent) = stack.pop() {
            let depth = self.nodes[parent].depth;
            if depth >= leaf {
                continue;
            }
            let have = self.nodes[parent].children.len();
            for id in have..self.counts[depth + 1] {
                let child = self.spawn(Some(parent), depth + 1, id as i32);
                self.nodes[parent].children.push(child);
                stack.push(child);
            }
        }
    }

    /// The command table this tree was built from.
    pub fn table(&self) -> &Arc<CommandTable> {
        &self.table
    }

    /// Clock of the most recent state update.
    pub const fn clock(&self) -> Clock {
        self.clk
    }

    /// The channel node.
    pub const fn root(&self) -> NodeId {
        ROOT
    }

    /// Borrows a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Mutably borrows a node (used by state transitions).
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Number of instantiated nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its channel node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes per parent at `depth`, including grown subarrays.
    pub fn count(&self, depth: usize) -> usize {
        self.counts[depth]
    }

    /// Every row-buffer node below (or equal to) `id`.
    pub fn row_buffers_under(&self, id: NodeId) -> Vec<NodeId> {
        let leaf = self.table.row_buffer_depth();
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            if node.depth == leaf {
                found.push(n);
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        found
    }

    fn assert_arity(&self, addr: &[i32]) {
        assert_eq!(
            addr.len(),
            self.table.arity(),
            "address vector {addr:?} has the wrong arity for {}",
            self.table.name()
        );
    }

    fn path<'a>(&'a self, addr: &'a [i32], limit: usize) -> Path<'a> {
        Path {
            tree: self,
            addr,
            limit,
            cursor: Some(ROOT),
        }
    }

    /// Resolves the command that must issue next to make progress on `cmd`.
    ///
    /// The first level whose prerequisite resolver answers decides; if none
    /// answers, `cmd` itself is returned.
    ///
    /// # Panics
    ///
    /// Panics if `addr` does not have one coordinate per level.
    pub fn decode(&self, cmd: Command, addr: &[i32]) -> Command {
        self.assert_arity(addr);
        for id in self.path(addr, usize::MAX) {
            let depth = self.nodes[id].depth;
            if let Some(resolve) = self.table.prerequisite(depth, cmd)
                && let Some(required) = resolve(self, id, cmd, addr[depth + 1])
            {
                return required;
            }
        }
        cmd
    }

    /// Returns `true` if `cmd` may issue to `addr` at `clk`.
    ///
    /// Every node from the channel down to the command's scope must allow it.
    ///
    /// # Panics
    ///
    /// Panics if `addr` does not have one coordinate per level.
    pub fn check(&self, cmd: Command, addr: &[i32], clk: Clock) -> bool {
        self.assert_arity(addr);
        self.path(addr, self.table.scope(cmd))
            .all(|id| self.nodes[id].allows(cmd, clk))
    }

    /// Like [`check`](Self::check), but pretends tRCD is zero.
    ///
    /// The row-buffer level is skipped, since the only constraint it places
    /// on column commands is activate-to-access. Used for stall accounting.
    pub fn check_ignoring_trcd(&self, cmd: Command, addr: &[i32], clk: Clock) -> bool {
        self.assert_arity(addr);
        let leaf = self.table.row_buffer_depth();
        for id in self.path(addr, self.table.scope(cmd)) {
            let node = &self.nodes[id];
            if node.depth == leaf {
                return true;
            }
            if !node.allows(cmd, clk) {
                return false;
            }
        }
        true
    }

    /// Returns `true` when tRAS is the only reason a precharge to `addr` waits.
    ///
    /// Standards without restoration timing fall back to a plain check.
    pub fn check_ignoring_tras(&self, cmd: Command, addr: &[i32], clk: Clock) -> bool {
        self.assert_arity(addr);
        let leaf = self.table.row_buffer_depth();
        for id in self.path(addr, self.table.scope(cmd)) {
            let node = &self.nodes[id];
            if node.depth == leaf
                && let Some(timing) = self.table.restoration()
            {
                return Self::waiting_on_tras(node, clk, timing);
            }
            if !node.allows(cmd, clk) {
                return false;
            }
        }
        true
    }

    fn waiting_on_tras(node: &Node, clk: Clock, timing: RestorationTiming) -> bool {
        let since = |cmd| node.last_issue(cmd).map(|t| clk - t);
        if since(Command::Act).is_none_or(|t| t >= timing.ras) {
            return false;
        }
        since(Command::Wr).is_none_or(|t| t >= timing.write_recovery)
            && since(Command::Rd).is_none_or(|t| t >= timing.read_to_precharge)
    }

    /// Returns `true` if `cmd` to `addr` would hit the currently open row.
    pub fn check_row_hit(&self, cmd: Command, addr: &[i32]) -> bool {
        self.assert_arity(addr);
        for id in self.path(addr, usize::MAX) {
            let depth = self.nodes[id].depth;
            if let Some(pred) = self.table.row_hit(depth, cmd) {
                return pred(self, id, cmd, addr[depth + 1]);
            }
        }
        false
    }

    /// Returns `true` if the row buffer `cmd` to `addr` needs holds any open row.
    pub fn check_row_open(&self, cmd: Command, addr: &[i32]) -> bool {
        self.assert_arity(addr);
        for id in self.path(addr, usize::MAX) {
            let depth = self.nodes[id].depth;
            if let Some(pred) = self.table.row_open(depth, cmd) {
                return pred(self, id, cmd, addr[depth + 1]);
            }
        }
        false
    }

    /// Earliest clock at which `cmd` to `addr` could issue, never before the
    /// tree's current clock.
    pub fn get_next(&self, cmd: Command, addr: &[i32]) -> Clock {
        self.assert_arity(addr);
        self.path(addr, self.table.scope(cmd))
            .map(|id| self.nodes[id].next(cmd))
            .fold(self.clk, Clock::max)
    }

    /// Issues `cmd` to `addr` at `clk`: state transitions, then timing.
    ///
    /// # Panics
    ///
    /// Panics if `addr` has the wrong arity or leaves a level above the
    /// command's scope unspecified.
    pub fn update(&mut self, cmd: Command, addr: &[i32], clk: Clock) {
        self.assert_arity(addr);
        self.update_state(cmd, addr, clk);
        self.update_timing(cmd, addr, clk);
    }

    fn update_state(&mut self, cmd: Command, addr: &[i32], clk: Clock) {
        self.clk = clk;
        let table = Arc::clone(&self.table);
        let scope = table.scope(cmd);
        let mut id = ROOT;
        loop {
            let depth = self.nodes[id].depth;
            let child_id = addr[depth + 1];
            if let Some(apply) = table.transition(depth, cmd) {
                apply(self, id, child_id);
            }
            let node = &self.nodes[id];
            if depth == scope || node.children.is_empty() {
                return;
            }
            assert!(
                child_id >= 0,
                "{cmd} to {addr:?} leaves {} unspecified above its scope",
                table.levels()[depth + 1]
            );
            id = node.children[child_id as usize];
        }
    }

    fn update_timing(&mut self, cmd: Command, addr: &[i32], clk: Clock) {
        let table = Arc::clone(&self.table);
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id];
            let entries = table.timing(node.depth, cmd);

            if node.id != addr[node.depth] {
                // Sibling: only entries flagged for siblings, measured from now.
                for t in entries.iter().filter(|t| t.sibling) {
                    let next = &mut node.next[t.cmd.index()];
                    *next = (*next).max(clk + t.val);
                }
                continue;
            }

            let history = &mut node.prev[cmd.index()];
            if !history.is_empty() {
                let _ = history.pop_back();
                history.push_front(clk);
            }
            for t in entries.iter().filter(|t| !t.sibling) {
                let past = node.prev[cmd.index()][t.dist - 1];
                if past < 0 {
                    continue;
                }
                let next = &mut node.next[t.cmd.index()];
                *next = (*next).max(past + t.val);
            }

            // Constraints may live below the command's scope (tFAW gates
            // bank-scoped activates from the rank), so visit every child.
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Cycles the row buffer of `addr` has been open, measured from its last activate.
    pub fn cycles_since_last_act(&self, addr: &[i32], clk: Clock) -> Clock {
        self.assert_arity(addr);
        let leaf = self.table.row_buffer_depth();
        self.path(addr, leaf)
            .last()
            .map(|id| &self.nodes[id])
            .filter(|node| node.depth == leaf && node.state == Some(State::Opened))
            .and_then(|node| node.last_issue(Command::Act))
            .map_or(0, |t| clk - t)
    }

    /// Flattens the rank..bank coordinates of `addr` into one bank index per channel.
    ///
    /// Wildcard coordinates count as zero.
    pub fn flat_bank_id(&self, addr: &[i32]) -> usize {
        let bank = self.table.bank_depth();
        (1..=bank).fold(0, |acc, depth| {
            acc * self.counts[depth] + addr[depth].max(0) as usize
        })
    }

    /// Number of banks in the channel.
    pub fn bank_count(&self) -> usize {
        let bank = self.table.bank_depth();
        self.counts[1..=bank].iter().product()
    }

    /// Grows every bank to `subarrays` subarray nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoSubarrays`] if the standard has no subarray level
    /// and [`ConfigError::ShrinkSubarrays`] if `subarrays` is below the current count.
    pub fn grow_subarrays(&mut self, subarrays: usize) -> Result<(), ConfigError> {
        let Some(depth) = self.table.depth_of(Level::Subarray) else {
            return Err(ConfigError::NoSubarrays {
                standard: self.table.name(),
            });
        };
        let current = self.counts[depth];
        if subarrays < current {
            return Err(ConfigError::ShrinkSubarrays {
                current,
                requested: subarrays,
            });
        }
        self.counts[depth] = subarrays;
        let parents: Vec<NodeId> = (0..self.nodes.len())
            .filter(|&id| self.nodes[id].depth + 1 == depth)
            .collect();
        for parent in parents {
            self.populate(parent);
        }
        Ok(())
    }
}
