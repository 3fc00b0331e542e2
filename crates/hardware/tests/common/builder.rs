//! Hand-built command tables and request helpers.
//!
//! The toy table has one channel, one rank, two banks, eight rows, and eight
//! columns, with round timing values so expected clocks are easy to read:
//! tRCD 10, tRAS 24, tRP 10, tRC 34, read latency 12.

use std::sync::Arc;

use memsim_core::controller::request::{Request, RequestKind};
use memsim_core::dram::tree::{DeviceTree, NodeId};
use memsim_core::dram::{Command, CommandTable, CommandTableBuilder, Level, State, TimingEntry};

pub const TOY_RCD: i64 = 10;
pub const TOY_RAS: i64 = 24;
pub const TOY_RP: i64 = 10;
pub const TOY_READ_LATENCY: i64 = 12;

fn open_row(tree: &DeviceTree, node: NodeId, cmd: Command, row: i32) -> Option<Command> {
    let node = tree.node(node);
    match node.state {
        Some(State::Closed) => Some(Command::Act),
        Some(State::Opened) if node.row_state.contains_key(&row) => Some(cmd),
        Some(State::Opened) => Some(Command::Pre),
        _ => None,
    }
}

fn close_first(tree: &DeviceTree, node: NodeId, _cmd: Command, _row: i32) -> Option<Command> {
    (tree.node(node).state == Some(State::Opened)).then_some(Command::Pre)
}

fn row_hit(tree: &DeviceTree, node: NodeId, _cmd: Command, row: i32) -> bool {
    let node = tree.node(node);
    node.state == Some(State::Opened) && node.row_state.contains_key(&row)
}

fn row_open(tree: &DeviceTree, node: NodeId, _cmd: Command, _row: i32) -> bool {
    tree.node(node).state == Some(State::Opened)
}

fn activate(tree: &mut DeviceTree, node: NodeId, row: i32) {
    let node = tree.node_mut(node);
    node.state = Some(State::Opened);
    let _ = node.row_state.insert(row, State::Opened);
}

fn precharge(tree: &mut DeviceTree, node: NodeId, _row: i32) {
    let node = tree.node_mut(node);
    node.state = Some(State::Closed);
    node.row_state.clear();
}

/// Builder for the toy table, so tests can extend or break it.
pub fn toy_builder() -> CommandTableBuilder {
    use Command::{Act, Pre, Rd, Ref, Wr};
    let e = TimingEntry::new;
    CommandTableBuilder::new(
        "TOY",
        &[Level::Channel, Level::Rank, Level::Bank, Level::Row, Level::Column],
        &[1, 1, 2, 8, 8],
    )
    .scope(&[Act], Level::Row)
    .scope(&[Pre], Level::Bank)
    .scope(&[Ref], Level::Rank)
    .scope(&[Rd, Wr], Level::Column)
    .start(Level::Bank, State::Closed)
    .prerequisite(Level::Bank, &[Rd, Wr], open_row)
    .prerequisite(Level::Bank, &[Act], close_first)
    .row_hit(Level::Bank, &[Rd, Wr], row_hit)
    .row_open(Level::Bank, &[Rd, Wr], row_open)
    .transition(Level::Bank, &[Act], activate)
    .transition(Level::Bank, &[Pre], precharge)
    .timing(Level::Channel, &[Rd, Wr], &[e(Rd, 4), e(Wr, 4)])
    .timing(Level::Bank, &[Act], &[
        e(Rd, TOY_RCD),
        e(Wr, TOY_RCD),
        e(Pre, TOY_RAS),
        e(Act, TOY_RAS + TOY_RP),
    ])
    .timing(Level::Bank, &[Pre], &[e(Act, TOY_RP)])
    .translate(RequestKind::Read, Rd)
    .translate(RequestKind::Write, Wr)
    .translate(RequestKind::Refresh, Ref)
    .translate(RequestKind::Hammer, Rd)
    .translate(RequestKind::Activate, Act)
    .translate(RequestKind::Prefetch, Rd)
    .read_latency(TOY_READ_LATENCY)
    .refresh_interval(1000)
}

/// The toy table.
pub fn toy_table() -> Arc<CommandTable> {
    Arc::new(toy_builder().build().expect("toy table is valid"))
}

/// Toy address `[0, 0, bank, row, col]`.
pub fn toy_addr(bank: i32, row: i32, col: i32) -> Vec<i32> {
    vec![0, 0, bank, row, col]
}

/// DDR4 address `[0, rank, bank group, bank, row, col]`.
pub fn ddr4_addr(rank: i32, group: i32, bank: i32, row: i32, col: i32) -> Vec<i32> {
    vec![0, rank, group, bank, row, col]
}

/// A request whose flat address is derived from its coordinates.
pub fn request(kind: RequestKind, addr_vec: Vec<i32>) -> Request {
    let flat = addr_vec
        .iter()
        .fold(0u64, |acc, &x| acc * 1024 + x.max(0) as u64);
    Request::new(kind, addr_vec).with_addr(flat)
}
