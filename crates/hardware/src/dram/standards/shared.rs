//! Resolvers, predicates, and transitions shared by the DDR-family standards.

use crate::dram::tree::{DeviceTree, NodeId};
use crate::dram::{Command, State};

/// Rank prerequisite: wake the rank before any bank-level command.
pub fn wake_rank(tree: &DeviceTree, node: NodeId, _cmd: Command, _child: i32) -> Option<Command> {
    match tree.node(node).state {
        Some(State::ActPowerDown | State::PrePowerDown) => Some(Command::Pdx),
        Some(State::SelfRefresh) => Some(Command::Srx),
        _ => None,
    }
}

/// Row-buffer prerequisite for column commands.
///
/// Closed: activate first. Open on the requested row: the command itself.
/// Open on another row: precharge first.
pub fn open_row(tree: &DeviceTree, node: NodeId, cmd: Command, row: i32) -> Option<Command> {
    let node = tree.node(node);
    match node.state {
        Some(State::Closed) => Some(Command::Act),
        Some(State::Opened) if node.row_state.contains_key(&row) => Some(cmd),
        Some(State::Opened) => Some(Command::Pre),
        _ => None,
    }
}

/// Row-buffer prerequisite for a bare activate: close whatever is open.
pub fn close_for_activate(tree: &DeviceTree, node: NodeId, _cmd: Command, _row: i32) -> Option<Command> {
    match tree.node(node).state {
        Some(State::Opened) => Some(Command::Pre),
        _ => None,
    }
}

/// Rank prerequisite for refresh: every row buffer must be precharged first.
pub fn refresh_rank(tree: &DeviceTree, node: NodeId, cmd: Command, _child: i32) -> Option<Command> {
    let any_open = tree
        .row_buffers_under(node)
        .into_iter()
        .any(|b| tree.node(b).state != Some(State::Closed));
    Some(if any_open { Command::PreA } else { cmd })
}

/// Rank prerequisite for power-down entry.
pub fn power_down(tree: &DeviceTree, node: NodeId, cmd: Command, _child: i32) -> Option<Command> {
    match tree.node(node).state {
        Some(State::PowerUp | State::ActPowerDown | State::PrePowerDown) => Some(cmd),
        Some(State::SelfRefresh) => Some(Command::Srx),
        _ => None,
    }
}

/// Rank prerequisite for self-refresh entry.
pub fn self_refresh(tree: &DeviceTree, node: NodeId, cmd: Command, _child: i32) -> Option<Command> {
    match tree.node(node).state {
        Some(State::PowerUp | State::SelfRefresh) => Some(cmd),
        Some(State::ActPowerDown | State::PrePowerDown) => Some(Command::Pdx),
        _ => None,
    }
}

/// Row hit: the buffer is open on `row`.
pub fn row_hit(tree: &DeviceTree, node: NodeId, _cmd: Command, row: i32) -> bool {
    let node = tree.node(node);
    node.state == Some(State::Opened) && node.row_state.contains_key(&row)
}

/// Row open: the buffer holds some row.
pub fn row_open(tree: &DeviceTree, node: NodeId, _cmd: Command, _row: i32) -> bool {
    tree.node(node).state == Some(State::Opened)
}

pub fn activate(tree: &mut DeviceTree, node: NodeId, row: i32) {
    let node = tree.node_mut(node);
    node.state = Some(State::Opened);
    let _ = node.row_state.insert(row, State::Opened);
}

pub fn precharge(tree: &mut DeviceTree, node: NodeId, _row: i32) {
    let node = tree.node_mut(node);
    node.state = Some(State::Closed);
    node.row_state.clear();
}

pub fn precharge_all(tree: &mut DeviceTree, node: NodeId, _child: i32) {
    for buffer in tree.row_buffers_under(node) {
        precharge(tree, buffer, -1);
    }
}

/// Power-down entry keeps track of whether any bank stayed open.
pub fn power_down_entry(tree: &mut DeviceTree, node: NodeId, _child: i32) {
    let any_open = tree
        .row_buffers_under(node)
        .into_iter()
        .any(|b| tree.node(b).state == Some(State::Opened));
    tree.node_mut(node).state = Some(if any_open {
        State::ActPowerDown
    } else {
        State::PrePowerDown
    });
}

pub fn power_up(tree: &mut DeviceTree, node: NodeId, _child: i32) {
    tree.node_mut(node).state = Some(State::PowerUp);
}

pub fn self_refresh_entry(tree: &mut DeviceTree, node: NodeId, _child: i32) {
    tree.node_mut(node).state = Some(State::SelfRefresh);
}
