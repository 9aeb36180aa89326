//! Bit-level decoding of the system register formats.
//!
//! Every bit position and mask of the register map lives in this file; the
//! rest of the crate consumes the decoded forms.

use crate::common::{bit, field, test_bit};
use crate::sys::{sysreg, RegisterSnapshot};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Per-thread status register flags.
    #[derive(Default)]
    pub struct StatusFlags: u32 {
        const UM = bit(16); // user mode
        const EX = bit(17); // interrupt/exception accepted
        const IE = bit(18); // interrupt enable
        const GM = bit(19); // guest mode
        const SS = bit(30); // single step
        const XE = bit(31); // coprocessor (HVX) enable
    }
}

bitflags! {
    /// Global configuration register flags.
    #[derive(Default)]
    pub struct ConfigFlags: u32 {
        const M = bit(0); // MMU enable
        const G = bit(4); // global interrupt enable
        const V2X = bit(7); // HVX vector size
        const TL = bit(11); // TLB lock
        const KL = bit(12); // kernel lock
        const PRIO = bit(14); // scheduling enable
    }
}

const STATUS_FLAG_NAMES: [(StatusFlags, &str); 6] = [
    (StatusFlags::UM, "UM"),
    (StatusFlags::EX, "EX"),
    (StatusFlags::IE, "IE"),
    (StatusFlags::GM, "GM"),
    (StatusFlags::SS, "SS"),
    (StatusFlags::XE, "XE"),
];

const CONFIG_FLAG_NAMES: [(ConfigFlags, &str); 6] = [
    (ConfigFlags::M, "M"),
    (ConfigFlags::G, "G"),
    (ConfigFlags::V2X, "V2X"),
    (ConfigFlags::TL, "TL"),
    (ConfigFlags::KL, "KL"),
    (ConfigFlags::PRIO, "PRIO"),
];

/// Names of the asserted status flags, sorted alphabetically.
pub fn status_flag_names(flags: StatusFlags) -> Vec<&'static str> {
    let mut names: Vec<_> = STATUS_FLAG_NAMES
        .iter()
        .filter(|(f, _)| flags.contains(*f))
        .map(|(_, n)| *n)
        .collect();
    names.sort_unstable();
    names
}

/// Names of the asserted config flags, sorted alphabetically.
pub fn config_flag_names(flags: ConfigFlags) -> Vec<&'static str> {
    let mut names: Vec<_> = CONFIG_FLAG_NAMES
        .iter()
        .filter(|(f, _)| flags.contains(*f))
        .map(|(_, n)| *n)
        .collect();
    names.sort_unstable();
    names
}

const ASID_START: u32 = 8;
const ASID_WIDTH: u32 = 7;
const CAUSE_START: u32 = 0;
const CAUSE_WIDTH: u32 = 8;
const PRIO_START: u32 = 16;
const PRIO_WIDTH: u32 = 9;
const VID_WIDTH: u32 = 8;
const VID_HI_START: u32 = 16;
const IPEND_START: u32 = 0;
const IPEND_WIDTH: u32 = 16;
const IAD_START: u32 = 16;
const IMASK_WIDTH: u32 = 8;
// Same width as the stid priority field, but the register map treats
// them as distinct fields; keep separate constants.
const BESTWAIT_PRIO_WIDTH: u32 = 9;
const SCHEDCFG_INTNO_WIDTH: u32 = 4;
const SCHEDCFG_EN_BIT: u32 = 8;

/// Decoded per-thread status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReg {
    pub asid: u8,
    pub set: StatusFlags,
    pub unset: StatusFlags,
    /// Exception cause code, present only while EX is asserted. A cause of
    /// zero is a real cause, distinct from "no exception".
    pub cause: Option<u8>,
}

pub fn decode_status(ssr: u32) -> StatusReg {
    let set = StatusFlags::from_bits_truncate(ssr);
    let cause = if set.contains(StatusFlags::EX) {
        Some(field(ssr, CAUSE_START, CAUSE_WIDTH) as u8)
    } else {
        None
    };
    StatusReg {
        asid: field(ssr, ASID_START, ASID_WIDTH) as u8,
        set,
        unset: !set,
        cause,
    }
}

/// Decoded global configuration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigReg {
    pub set: ConfigFlags,
    pub unset: ConfigFlags,
}

pub fn decode_config(syscfg: u32) -> ConfigReg {
    let set = ConfigFlags::from_bits_truncate(syscfg);
    ConfigReg { set, unset: !set }
}

/// Scheduler priority from the thread-id register.
pub fn priority(stid: u32) -> u16 {
    field(stid, PRIO_START, PRIO_WIDTH) as u16
}

/// Pending and auto-disabled interrupt lines, split out of the combined
/// register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptState {
    pub pending: u16,
    pub auto_disabled: u16,
}

impl InterruptState {
    /// Asserted pending lines, or `None` when nothing is pending.
    pub fn pending_lines(&self) -> Option<Vec<u8>> {
        lines_of(self.pending)
    }

    /// Asserted auto-disabled lines, or `None` when none are.
    pub fn auto_disabled_lines(&self) -> Option<Vec<u8>> {
        lines_of(self.auto_disabled)
    }
}

fn lines_of(mask: u16) -> Option<Vec<u8>> {
    if mask == 0 {
        return None;
    }
    Some(
        (0u32..16)
            .filter(|i| test_bit(mask as u32, *i))
            .map(|i| i as u8)
            .collect(),
    )
}

pub fn decode_interrupts(ipendad: u32) -> InterruptState {
    InterruptState {
        pending: field(ipendad, IPEND_START, IPEND_WIDTH) as u16,
        auto_disabled: field(ipendad, IAD_START, IPEND_WIDTH) as u16,
    }
}

/// The four vector interrupt ids, packed two per register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorIds(pub [u8; 4]);

pub fn vector_ids(vid: u32, vid1: u32) -> VectorIds {
    VectorIds([
        field(vid, 0, VID_WIDTH) as u8,
        field(vid, VID_HI_START, VID_WIDTH) as u8,
        field(vid1, 0, VID_WIDTH) as u8,
        field(vid1, VID_HI_START, VID_WIDTH) as u8,
    ])
}

/// Per-thread interrupt mask plus the derived enable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntMask {
    pub mask: u8,
    pub masked_lines: Vec<u8>,
    /// Interrupts are live for the thread only when the global enable and
    /// the thread's IE flag are both set.
    pub enabled: bool,
}

pub fn decode_imask(imask: u32, config: ConfigFlags, status: StatusFlags) -> IntMask {
    let mask = field(imask, 0, IMASK_WIDTH) as u8;
    IntMask {
        mask,
        masked_lines: (0u32..16)
            .filter(|i| test_bit(mask as u32, *i))
            .map(|i| i as u8)
            .collect(),
        enabled: config.contains(ConfigFlags::G) && status.contains(StatusFlags::IE),
    }
}

/// Per-thread run state, from the (debug, wait, enable) bit triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Off,
    Run,
    Wait,
    Debug,
    /// A debug/wait/enable combination the hardware should never report.
    Invalid,
}

impl RunState {
    pub fn from_dwe(debug: bool, wait: bool, enable: bool) -> Self {
        match (debug, wait, enable) {
            (false, false, false) => RunState::Off,
            (false, false, true) => RunState::Run,
            (false, true, true) => RunState::Wait,
            (true, false, true) => RunState::Debug,
            _ => RunState::Invalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Off => "OFF",
            RunState::Run => "RUN",
            RunState::Wait => "WAIT",
            RunState::Debug => "DEBUG",
            RunState::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Privilege mode of a thread, from the UM/GM/EX status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivMode {
    User,
    Guest,
    Monitor,
}

impl PrivMode {
    /// Anything that is not cleanly user or guest mode reads as monitor
    /// mode.
    pub fn classify(set: StatusFlags) -> Self {
        let um = set.contains(StatusFlags::UM);
        let gm = set.contains(StatusFlags::GM);
        let ex = set.contains(StatusFlags::EX);
        if um && !gm && !ex {
            PrivMode::User
        } else if um && gm && !ex {
            PrivMode::Guest
        } else {
            PrivMode::Monitor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrivMode::User => "User",
            PrivMode::Guest => "Guest",
            PrivMode::Monitor => "Monitor",
        }
    }
}

impl fmt::Display for PrivMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Decoded scheduler configuration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedCfg {
    pub raw: u32,
    pub interrupt: u8,
    pub enabled: bool,
}

pub fn decode_sched(schedcfg: u32) -> SchedCfg {
    SchedCfg {
        raw: schedcfg,
        interrupt: field(schedcfg, 0, SCHEDCFG_INTNO_WIDTH) as u8,
        enabled: test_bit(schedcfg, SCHEDCFG_EN_BIT),
    }
}

/// Best priority among waiting threads.
pub fn bestwait_priority(bestwait: u32) -> u16 {
    field(bestwait, 0, BESTWAIT_PRIO_WIDTH) as u16
}

/// Bits that can legitimately be set in each system register. Anything
/// outside these masks is a corruption signal.
const VALID_BITS: [(&str, u32); 6] = [
    (sysreg::STID, 0x00FF_00FF),
    (sysreg::IMASK, 0x0000_FFFF),
    (sysreg::GEVB, 0xFFFF_FF00),
    (sysreg::EVB, 0xFFFF_FF00),
    (sysreg::MODECTL, 0x00FF_00FF),
    (sysreg::BESTWAIT, 0x0000_01FF),
];

/// Registers whose raw value strays outside the valid-bit mask, with the
/// offending value. Unavailable registers are skipped.
pub fn unexpected_bits(snap: &RegisterSnapshot) -> Vec<(&'static str, u32)> {
    VALID_BITS
        .iter()
        .filter_map(|&(reg, mask)| {
            let raw = snap.sys(reg)?;
            (raw & !mask != 0).then(|| (reg, raw))
        })
        .collect()
}

/// A state is weird when a system register has bits set in unexpected
/// places. Inconsistent values across registers and a PC the disassembler
/// rejects would also qualify; neither check exists yet.
pub fn is_weird_state(snap: &RegisterSnapshot) -> bool {
    !unexpected_bits(snap).is_empty()
}

/// Whether the thread is executing inside an interrupt/exception handler:
/// EX deasserted means the handler has not returned yet. An unavailable
/// status register reads as "not in a handler".
pub fn in_handler(snap: &RegisterSnapshot) -> bool {
    match snap.sys(sysreg::SSR) {
        Some(ssr) => !StatusFlags::from_bits_truncate(ssr).contains(StatusFlags::EX),
        None => false,
    }
}

/// Whether an interrupt line is pending and deliverable (not already being
/// serviced). An unavailable interrupt register reads as "nothing
/// pending".
pub fn has_pending_interrupt(snap: &RegisterSnapshot) -> bool {
    match snap.sys(sysreg::IPENDAD) {
        Some(ipendad) => decode_interrupts(ipendad).pending != 0 && !in_handler(snap),
        None => false,
    }
}
