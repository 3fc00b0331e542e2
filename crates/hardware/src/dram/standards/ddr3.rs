//! DDR3.
//!
//! Hierarchy: Channel, Rank, Bank, Row, Column. The table builder here is
//! also used by SALP, which inserts a Subarray level below Bank and moves the
//! row-buffer constraints down to it.

use serde::{Deserialize, Serialize};

use crate::common::{Clock, ConfigError};
use crate::controller::request::RequestKind;
use crate::dram::table::{CommandTable, CommandTableBuilder};
use crate::dram::{Command, Level, State, TimingEntry};

use super::Standard;
use super::shared;

use Command::{Act, Pde, Pdx, Pre, PreA, Rd, RdA, Ref, Sre, Srx, Wr, WrA};

const CAS: [Command; 4] = [Rd, RdA, Wr, WrA];
const READS: [Command; 2] = [Rd, RdA];
const WRITES: [Command; 2] = [Wr, WrA];

/// Device organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Ddr3Org {
    /// 2 Gb, x8.
    #[default]
    #[serde(rename = "DDR3_2Gb_x8")]
    Gb2X8,
    /// 4 Gb, x8.
    #[serde(rename = "DDR3_4Gb_x8")]
    Gb4X8,
}

impl Ddr3Org {
    /// Banks, rows, columns.
    const fn geometry(self) -> [usize; 3] {
        match self {
            Self::Gb2X8 => [8, 1 << 15, 1 << 10],
            Self::Gb4X8 => [8, 1 << 16, 1 << 10],
        }
    }
}

/// JEDEC speed bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Ddr3Speed {
    /// 1333 MT/s, CL 9.
    #[serde(rename = "DDR3_1333H")]
    Speed1333H,
    /// 1600 MT/s, CL 11.
    #[default]
    #[serde(rename = "DDR3_1600K")]
    Speed1600K,
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    bl: Clock,
    ccd: Clock,
    rtrs: Clock,
    cl: Clock,
    rcd: Clock,
    rp: Clock,
    cwl: Clock,
    ras: Clock,
    rc: Clock,
    rtp: Clock,
    wtr: Clock,
    wr: Clock,
    rrd: Clock,
    faw: Clock,
    rfc: Clock,
    refi: Clock,
    pd: Clock,
    xp: Clock,
    xs: Clock,
    ckesr: Clock,
}

impl Timing {
    const fn of(speed: Ddr3Speed, org: Ddr3Org) -> Self {
        let big = matches!(org, Ddr3Org::Gb4X8);
        match speed {
            Ddr3Speed::Speed1600K => {
                let rfc = if big { 208 } else { 128 };
                Self {
                    bl: 4,
                    ccd: 4,
                    rtrs: 2,
                    cl: 11,
                    rcd: 11,
                    rp: 11,
                    cwl: 8,
                    ras: 28,
                    rc: 39,
                    rtp: 6,
                    wtr: 6,
                    wr: 12,
                    rrd: 5,
                    faw: 24,
                    rfc,
                    refi: 6240,
                    pd: 4,
                    xp: 5,
                    xs: rfc + 8,
                    ckesr: 5,
                }
            }
            Ddr3Speed::Speed1333H => {
                let rfc = if big { 174 } else { 107 };
                Self {
                    bl: 4,
                    ccd: 4,
                    rtrs: 2,
                    cl: 9,
                    rcd: 9,
                    rp: 9,
                    cwl: 7,
                    ras: 24,
                    rc: 33,
                    rtp: 5,
                    wtr: 5,
                    wr: 10,
                    rrd: 4,
                    faw: 20,
                    rfc,
                    refi: 5200,
                    pd: 4,
                    xp: 4,
                    xs: rfc + 7,
                    ckesr: 4,
                }
            }
        }
    }
}

/// Builds a DDR3-family table.
///
/// With `subarrays` set, a Subarray level is inserted below Bank and becomes
/// the row-buffer level; activate, precharge, and the per-row-buffer timing
/// move there.
pub(super) fn family_table(
    name: &'static str,
    org: Ddr3Org,
    speed: Ddr3Speed,
    channels: usize,
    ranks: usize,
    subarrays: Option<usize>,
) -> Result<CommandTable, ConfigError> {
    let [banks, rows, cols] = org.geometry();
    let s = Timing::of(speed, org);
    let e = TimingEntry::new;

    let (levels, counts, buffer) = match subarrays {
        Some(n) => (
            vec![
                Level::Channel,
                Level::Rank,
                Level::Bank,
                Level::Subarray,
                Level::Row,
                Level::Column,
            ],
            // Rows are split evenly between subarrays.
            vec![channels, ranks, banks, n, rows / n.max(1), cols],
            Level::Subarray,
        ),
        None => (
            vec![Level::Channel, Level::Rank, Level::Bank, Level::Row, Level::Column],
            vec![channels, ranks, banks, rows, cols],
            Level::Bank,
        ),
    };

    let mut builder = CommandTableBuilder::new(name, &levels, &counts)
        .scope(&[Act], Level::Row)
        .scope(&[Pre], buffer)
        .scope(&[PreA, Ref, Pde, Pdx, Sre, Srx], Level::Rank)
        .scope(&CAS, Level::Column)
        .start(Level::Rank, State::PowerUp)
        .start(buffer, State::Closed)
        .prerequisite(Level::Rank, &[Act, Pre, PreA, Rd, Wr, RdA, WrA], shared::wake_rank)
        .prerequisite(Level::Rank, &[Ref], shared::refresh_rank)
        .prerequisite(Level::Rank, &[Pde], shared::power_down)
        .prerequisite(Level::Rank, &[Sre], shared::self_refresh)
        .prerequisite(buffer, &CAS, shared::open_row)
        .prerequisite(buffer, &[Act], shared::close_for_activate)
        .row_hit(buffer, &CAS, shared::row_hit)
        .row_open(buffer, &CAS, shared::row_open)
        .transition(Level::Rank, &[PreA], shared::precharge_all)
        .transition(Level::Rank, &[Pde], shared::power_down_entry)
        .transition(Level::Rank, &[Pdx, Srx], shared::power_up)
        .transition(Level::Rank, &[Sre], shared::self_refresh_entry)
        .transition(buffer, &[Act], shared::activate)
        .transition(buffer, &[Pre, RdA, WrA], shared::precharge)
        // Channel
        .timing(Level::Channel, &READS, &[e(Rd, s.bl), e(RdA, s.bl)])
        .timing(Level::Channel, &WRITES, &[e(Wr, s.bl), e(WrA, s.bl)])
        // Rank: CAS to CAS
        .timing(Level::Rank, &READS, &[
            e(Rd, s.ccd),
            e(RdA, s.ccd),
            e(Wr, s.cl + s.bl + 2 - s.cwl),
            e(WrA, s.cl + s.bl + 2 - s.cwl),
            e(Rd, s.bl + s.rtrs).sibling(),
            e(RdA, s.bl + s.rtrs).sibling(),
            e(Wr, s.cl + s.bl + s.rtrs - s.cwl).sibling(),
            e(WrA, s.cl + s.bl + s.rtrs - s.cwl).sibling(),
        ])
        .timing(Level::Rank, &WRITES, &[
            e(Wr, s.ccd),
            e(WrA, s.ccd),
            e(Rd, s.cwl + s.bl + s.wtr),
            e(RdA, s.cwl + s.bl + s.wtr),
            e(Rd, s.cwl + s.bl + s.rtrs - s.cl).sibling(),
            e(RdA, s.cwl + s.bl + s.rtrs - s.cl).sibling(),
        ])
        .timing(Level::Rank, &[Rd], &[e(PreA, s.rtp)])
        .timing(Level::Rank, &[Wr], &[e(PreA, s.cwl + s.bl + s.wr)])
        .timing(Level::Rank, &READS, &[e(Pde, s.cl + s.bl + 1)])
        .timing(Level::Rank, &[Wr], &[e(Pde, s.cwl + s.bl + s.wr)])
        .timing(Level::Rank, &[WrA], &[e(Pde, s.cwl + s.bl + s.wr + 1)])
        .timing(Level::Rank, &[RdA], &[e(Ref, s.rtp + s.rp)])
        .timing(Level::Rank, &[WrA], &[e(Ref, s.cwl + s.bl + s.wr + s.rp)])
        // Rank: activates
        .timing(Level::Rank, &[Act], &[
            e(Act, s.rrd),
            e(Act, s.faw).window(4),
            e(PreA, s.ras),
            e(Ref, s.rc),
            e(Pde, 1),
        ])
        .timing(Level::Rank, &[PreA], &[e(Act, s.rp)])
        .timing(Level::Rank, &[Pre, PreA], &[e(Ref, s.rp), e(Sre, s.rp)])
        .timing(Level::Rank, &[Ref], &[e(Act, s.rfc), e(Ref, s.rfc), e(Pde, 1)])
        .timing(
            Level::Rank,
            &[Pdx],
            &[Act, Pre, PreA, Rd, RdA, Wr, WrA, Ref, Pde, Sre].map(|c| e(c, s.xp)),
        )
        .timing(Level::Rank, &[Pde], &[e(Pdx, s.pd)])
        .timing(Level::Rank, &[Srx], &[Act, Ref, Pde, Sre].map(|c| e(c, s.xs)))
        .timing(Level::Rank, &[Sre], &[e(Srx, s.ckesr)])
        // Row buffer
        .timing(buffer, &[Act], &[
            e(Act, s.rc),
            e(Rd, s.rcd),
            e(RdA, s.rcd),
            e(Wr, s.rcd),
            e(WrA, s.rcd),
            e(Pre, s.ras),
        ])
        .timing(buffer, &[Pre], &[e(Act, s.rp)])
        .timing(buffer, &[Rd], &[e(Pre, s.rtp)])
        .timing(buffer, &[Wr], &[e(Pre, s.cwl + s.bl + s.wr)])
        .timing(buffer, &[RdA], &[e(Act, s.rtp + s.rp)])
        .timing(buffer, &[WrA], &[e(Act, s.cwl + s.bl + s.wr + s.rp)]);

    for (kind, cmd) in [
        (RequestKind::Read, Rd),
        (RequestKind::Write, Wr),
        (RequestKind::Refresh, Ref),
        (RequestKind::PowerDown, Pde),
        (RequestKind::SelfRefresh, Sre),
        (RequestKind::Hammer, Rd),
        (RequestKind::Activate, Act),
        (RequestKind::Prefetch, Rd),
    ] {
        builder = builder.translate(kind, cmd);
    }

    builder
        .read_latency(s.cl + s.bl)
        .refresh_interval(s.refi)
        .build()
}

/// A DDR3 device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Ddr3 {
    /// Organization.
    #[serde(default)]
    pub org: Ddr3Org,
    /// Speed bin.
    #[serde(default)]
    pub speed: Ddr3Speed,
}

impl Ddr3 {
    /// Creates a DDR3 configuration.
    pub const fn new(org: Ddr3Org, speed: Ddr3Speed) -> Self {
        Self { org, speed }
    }
}

impl Standard for Ddr3 {
    fn name(&self) -> &'static str {
        "DDR3"
    }

    fn command_table(&self, channels: usize, ranks: usize) -> Result<CommandTable, ConfigError> {
        family_table("DDR3", self.org, self.speed, channels, ranks, None)
    }
}
