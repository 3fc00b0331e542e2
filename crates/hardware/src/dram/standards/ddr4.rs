//! DDR4.
//!
//! Hierarchy: Channel, Rank, BankGroup, Bank, Row, Column. Column commands
//! and activates are spaced by the short parameters (tCCD_S, tRRD_S) across
//! bank groups and by the long ones (tCCD_L, tRRD_L) within a bank group.

use serde::{Deserialize, Serialize};

use crate::common::{Clock, ConfigError};
use crate::controller::request::RequestKind;
use crate::dram::table::{CommandTable, CommandTableBuilder, RestorationTiming};
use crate::dram::{Command, Level, State, TimingEntry};

use super::Standard;
use super::shared;

use Command::{Act, Pde, Pdx, Pre, PreA, Rd, RdA, Ref, Sre, Srx, Wr, WrA};

const CAS: [Command; 4] = [Rd, RdA, Wr, WrA];
const READS: [Command; 2] = [Rd, RdA];
const WRITES: [Command; 2] = [Wr, WrA];

/// Device organization (density and data width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Ddr4Org {
    /// 4 Gb, x8.
    #[serde(rename = "DDR4_4Gb_x8")]
    Gb4X8,
    /// 8 Gb, x8.
    #[default]
    #[serde(rename = "DDR4_8Gb_x8")]
    Gb8X8,
    /// 8 Gb, x16 (two bank groups).
    #[serde(rename = "DDR4_8Gb_x16")]
    Gb8X16,
}

impl Ddr4Org {
    /// Bank groups, banks per group, rows, columns.
    const fn geometry(self) -> [usize; 4] {
        match self {
            Self::Gb4X8 => [4, 4, 1 << 15, 1 << 10],
            Self::Gb8X8 => [4, 4, 1 << 16, 1 << 10],
            Self::Gb8X16 => [2, 4, 1 << 16, 1 << 10],
        }
    }

    const fn is_x16(self) -> bool {
        matches!(self, Self::Gb8X16)
    }

    const fn is_8gb(self) -> bool {
        matches!(self, Self::Gb8X8 | Self::Gb8X16)
    }
}

/// JEDEC speed bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Ddr4Speed {
    /// 1600 MT/s, CL 11.
    #[serde(rename = "DDR4_1600K")]
    Speed1600K,
    /// 2400 MT/s, CL 16.
    #[default]
    #[serde(rename = "DDR4_2400R")]
    Speed2400R,
}

/// Timing parameters in memory-clock cycles.
#[derive(Debug, Clone, Copy)]
struct Timing {
    bl: Clock,
    ccds: Clock,
    ccdl: Clock,
    rtrs: Clock,
    cl: Clock,
    rcd: Clock,
    rp: Clock,
    cwl: Clock,
    ras: Clock,
    rc: Clock,
    rtp: Clock,
    wtrs: Clock,
    wtrl: Clock,
    wr: Clock,
    rrds: Clock,
    rrdl: Clock,
    faw: Clock,
    rfc: Clock,
    refi: Clock,
    pd: Clock,
    xp: Clock,
    xs: Clock,
    ckesr: Clock,
}

impl Timing {
    const fn of(speed: Ddr4Speed, org: Ddr4Org) -> Self {
        let x16 = org.is_x16();
        let big = org.is_8gb();
        match speed {
            Ddr4Speed::Speed2400R => {
                let rfc = if big { 420 } else { 313 };
                Self {
                    bl: 4,
                    ccds: 4,
                    ccdl: 6,
                    rtrs: 2,
                    cl: 16,
                    rcd: 16,
                    rp: 16,
                    cwl: 12,
                    ras: 39,
                    rc: 55,
                    rtp: 9,
                    wtrs: 3,
                    wtrl: 9,
                    wr: 18,
                    rrds: if x16 { 7 } else { 4 },
                    rrdl: if x16 { 8 } else { 6 },
                    faw: if x16 { 36 } else { 26 },
                    rfc,
                    refi: 9360,
                    pd: 6,
                    xp: 8,
                    xs: rfc + 12,
                    ckesr: 7,
                }
            }
            Ddr4Speed::Speed1600K => {
                let rfc = if big { 280 } else { 208 };
                Self {
                    bl: 4,
                    ccds: 4,
                    ccdl: 5,
                    rtrs: 2,
                    cl: 11,
                    rcd: 11,
                    rp: 11,
                    cwl: 9,
                    ras: 28,
                    rc: 39,
                    rtp: 6,
                    wtrs: 2,
                    wtrl: 6,
                    wr: 12,
                    rrds: if x16 { 5 } else { 4 },
                    rrdl: if x16 { 6 } else { 5 },
                    faw: if x16 { 28 } else { 20 },
                    rfc,
                    refi: 6240,
                    pd: 4,
                    xp: 5,
                    xs: rfc + 8,
                    ckesr: 5,
                }
            }
        }
    }
}

/// A DDR4 device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Ddr4 {
    /// Organization.
    #[serde(default)]
    pub org: Ddr4Org,
    /// Speed bin.
    #[serde(default)]
    pub speed: Ddr4Speed,
}

impl Ddr4 {
    /// Creates a DDR4 configuration.
    pub const fn new(org: Ddr4Org, speed: Ddr4Speed) -> Self {
        Self { org, speed }
    }
}

impl Standard for Ddr4 {
    fn name(&self) -> &'static str {
        "DDR4"
    }

    fn command_table(&self, channels: usize, ranks: usize) -> Result<CommandTable, ConfigError> {
        let [groups, banks, rows, cols] = self.org.geometry();
        let s = Timing::of(self.speed, self.org);
        let e = TimingEntry::new;

        CommandTableBuilder::new(
            "DDR4",
            &[
                Level::Channel,
                Level::Rank,
                Level::BankGroup,
                Level::Bank,
                Level::Row,
                Level::Column,
            ],
            &[channels, ranks, groups, banks, rows, cols],
        )
        .scope(&[Act], Level::Row)
        .scope(&[Pre], Level::Bank)
        .scope(&[PreA, Ref, Pde, Pdx, Sre, Srx], Level::Rank)
        .scope(&CAS, Level::Column)
        .start(Level::Rank, State::PowerUp)
        .start(Level::Bank, State::Closed)
        // Prerequisites
        .prerequisite(Level::Rank, &[Act, Pre, PreA, Rd, Wr, RdA, WrA], shared::wake_rank)
        .prerequisite(Level::Rank, &[Ref], shared::refresh_rank)
        .prerequisite(Level::Rank, &[Pde], shared::power_down)
        .prerequisite(Level::Rank, &[Sre], shared::self_refresh)
        .prerequisite(Level::Bank, &CAS, shared::open_row)
        .prerequisite(Level::Bank, &[Act], shared::close_for_activate)
        .row_hit(Level::Bank, &CAS, shared::row_hit)
        .row_open(Level::Bank, &CAS, shared::row_open)
        // State transitions
        .transition(Level::Rank, &[PreA], shared::precharge_all)
        .transition(Level::Rank, &[Pde], shared::power_down_entry)
        .transition(Level::Rank, &[Pdx, Srx], shared::power_up)
        .transition(Level::Rank, &[Sre], shared::self_refresh_entry)
        .transition(Level::Bank, &[Act], shared::activate)
        .transition(Level::Bank, &[Pre, RdA, WrA], shared::precharge)
        // Channel: data bus occupancy
        .timing(Level::Channel, &READS, &[e(Rd, s.bl), e(RdA, s.bl)])
        .timing(Level::Channel, &WRITES, &[e(Wr, s.bl), e(WrA, s.bl)])
        // Rank: CAS to CAS
        .timing(Level::Rank, &READS, &[
            e(Rd, s.ccds),
            e(RdA, s.ccds),
            e(Wr, s.cl + s.bl + 2 - s.cwl),
            e(WrA, s.cl + s.bl + 2 - s.cwl),
            e(Rd, s.bl + s.rtrs).sibling(),
            e(RdA, s.bl + s.rtrs).sibling(),
            e(Wr, s.cl + s.bl + s.rtrs - s.cwl).sibling(),
            e(WrA, s.cl + s.bl + s.rtrs - s.cwl).sibling(),
        ])
        .timing(Level::Rank, &WRITES, &[
            e(Wr, s.ccds),
            e(WrA, s.ccds),
            e(Rd, s.cwl + s.bl + s.wtrs),
            e(RdA, s.cwl + s.bl + s.wtrs),
            e(Rd, s.cwl + s.bl + s.rtrs - s.cl).sibling(),
            e(RdA, s.cwl + s.bl + s.rtrs - s.cl).sibling(),
        ])
        // Rank: CAS to PREA and power-down
        .timing(Level::Rank, &[Rd], &[e(PreA, s.rtp)])
        .timing(Level::Rank, &[Wr], &[e(PreA, s.cwl + s.bl + s.wr)])
        .timing(Level::Rank, &READS, &[e(Pde, s.cl + s.bl + 1)])
        .timing(Level::Rank, &[Wr], &[e(Pde, s.cwl + s.bl + s.wr)])
        .timing(Level::Rank, &[WrA], &[e(Pde, s.cwl + s.bl + s.wr + 1)])
        // Rank: auto-precharge to refresh
        .timing(Level::Rank, &[RdA], &[e(Ref, s.rtp + s.rp)])
        .timing(Level::Rank, &[WrA], &[e(Ref, s.cwl + s.bl + s.wr + s.rp)])
        // Rank: activates
        .timing(Level::Rank, &[Act], &[
            e(Act, s.rrds),
            e(Act, s.faw).window(4),
            e(PreA, s.ras),
            e(Ref, s.rc),
            e(Pde, 1),
        ])
        .timing(Level::Rank, &[PreA], &[e(Act, s.rp)])
        .timing(Level::Rank, &[Pre, PreA], &[e(Ref, s.rp), e(Sre, s.rp)])
        // Rank: refresh
        .timing(Level::Rank, &[Ref], &[e(Act, s.rfc), e(Ref, s.rfc), e(Pde, 1)])
        // Rank: power-down and self-refresh
        .timing(
            Level::Rank,
            &[Pdx],
            &[Act, Pre, PreA, Rd, RdA, Wr, WrA, Ref, Pde, Sre].map(|c| e(c, s.xp)),
        )
        .timing(Level::Rank, &[Pde], &[e(Pdx, s.pd)])
        .timing(Level::Rank, &[Srx], &[Act, Ref, Pde, Sre].map(|c| e(c, s.xs)))
        .timing(Level::Rank, &[Sre], &[e(Srx, s.ckesr)])
        // Bank group: long CAS and activate spacing
        .timing(Level::BankGroup, &READS, &[e(Rd, s.ccdl), e(RdA, s.ccdl)])
        .timing(Level::BankGroup, &WRITES, &[
            e(Wr, s.ccdl),
            e(WrA, s.ccdl),
            e(Rd, s.cwl + s.bl + s.wtrl),
            e(RdA, s.cwl + s.bl + s.wtrl),
        ])
        .timing(Level::BankGroup, &[Act], &[e(Act, s.rrdl)])
        // Bank
        .timing(Level::Bank, &[Act], &[
            e(Act, s.rc),
            e(Rd, s.rcd),
            e(RdA, s.rcd),
            e(Wr, s.rcd),
            e(WrA, s.rcd),
            e(Pre, s.ras),
        ])
        .timing(Level::Bank, &[Pre], &[e(Act, s.rp)])
        .timing(Level::Bank, &[Rd], &[e(Pre, s.rtp)])
        .timing(Level::Bank, &[Wr], &[e(Pre, s.cwl + s.bl + s.wr)])
        .timing(Level::Bank, &[RdA], &[e(Act, s.rtp + s.rp)])
        .timing(Level::Bank, &[WrA], &[e(Act, s.cwl + s.bl + s.wr + s.rp)])
        // Controller parameters
        .translate(RequestKind::Read, Rd)
        .translate(RequestKind::Write, Wr)
        .translate(RequestKind::Refresh, Ref)
        .translate(RequestKind::PowerDown, Pde)
        .translate(RequestKind::SelfRefresh, Sre)
        .translate(RequestKind::Hammer, Rd)
        .translate(RequestKind::Activate, Act)
        .translate(RequestKind::Prefetch, Rd)
        .read_latency(s.cl + s.bl)
        .refresh_interval(s.refi)
        .restoration(RestorationTiming {
            ras: s.ras,
            write_recovery: s.cwl + s.bl + s.wr,
            read_to_precharge: s.rtp,
        })
        .build()
    }
}
