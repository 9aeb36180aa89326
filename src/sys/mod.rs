//! Register snapshot model for the simulated Hexagon system.

use std::collections::HashMap;

pub mod decode;
pub mod status;

/// Register group names as the host engine reports them.
pub mod group {
    pub const SYSTEM: &str = "System Registers";
    pub const THREAD: &str = "Thread Registers";
}

/// System register names.
pub mod sysreg {
    pub const SSR: &str = "ssr"; // privilege/exception/interrupt flags, ASID
    pub const SYSCFG: &str = "syscfg"; // MMU/interrupt/scheduling enables
    pub const STID: &str = "stid"; // thread id, upper bits carry scheduler priority
    pub const MODECTL: &str = "modectl"; // per-thread wait/enable bits
    pub const ISDBST: &str = "isdbst"; // per-thread debug status bits
    pub const IMASK: &str = "imask"; // per-thread interrupt mask
    pub const IPENDAD: &str = "ipendad"; // pending + auto-disabled interrupt lines
    pub const VID: &str = "vid"; // vector interrupt ids 0 and 1
    pub const VID1: &str = "vid1"; // vector interrupt ids 2 and 3
    pub const BESTWAIT: &str = "bestwait"; // best priority among waiting threads
    pub const SCHEDCFG: &str = "schedcfg"; // scheduler interrupt number + enable
    pub const GEVB: &str = "gevb"; // guest event vector base
    pub const EVB: &str = "evb"; // event vector base
}

/// Thread register names.
pub mod threadreg {
    pub const PC: &str = "pc";
}

/// A point-in-time read of one hardware thread's register file.
///
/// Values are kept as raw 32-bit words. A register whose textual form does
/// not parse as a scalar (wide vector registers, for instance) is recorded
/// as unavailable rather than dropped, so "we saw it but could not decode
/// it" stays distinguishable from "the engine never reported it".
///
/// Snapshots are produced fresh on every read and never cached across
/// instruction steps; a stale snapshot would corrupt the step predicates'
/// baseline comparisons.
#[derive(Debug, Clone, Default)]
pub struct RegisterSnapshot {
    groups: HashMap<String, HashMap<String, Option<u32>>>,
}

impl RegisterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a register value. `None` marks the register as present but
    /// unavailable.
    pub fn insert(&mut self, group: &str, reg: &str, value: Option<u32>) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(reg.to_string(), value);
    }

    /// Build a snapshot from textual register listings, one
    /// (group, register, value) row per register. Values that fail to
    /// parse become unavailable entries.
    pub fn from_text_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        let mut snap = Self::new();
        for (group, reg, text) in rows {
            snap.insert(group, reg, parse_register_value(text));
        }
        snap
    }

    /// Look up a register. `None` covers both "not in this snapshot" and
    /// "present but unavailable"; callers that depend on the value treat
    /// either as no data and skip.
    pub fn get(&self, group: &str, reg: &str) -> Option<u32> {
        self.groups.get(group)?.get(reg).copied().flatten()
    }

    /// Whether the snapshot has an entry for the register at all,
    /// available or not.
    pub fn contains(&self, group: &str, reg: &str) -> bool {
        self.groups.get(group).map_or(false, |g| g.contains_key(reg))
    }

    pub fn sys(&self, reg: &str) -> Option<u32> {
        self.get(group::SYSTEM, reg)
    }

    pub fn thread(&self, reg: &str) -> Option<u32> {
        self.get(group::THREAD, reg)
    }

    pub fn pc(&self) -> Option<u32> {
        self.thread(threadreg::PC)
    }
}

/// Parse a register value in its native base: `0x`/`0o`/`0b` prefixed or
/// decimal. Anything else (vector register dumps, empty strings) is
/// unavailable.
pub fn parse_register_value(text: &str) -> Option<u32> {
    let t = text.trim();
    let (digits, radix) = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        (bin, 2)
    } else if let Some(oct) = t.strip_prefix("0o").or_else(|| t.strip_prefix("0O")) {
        (oct, 8)
    } else {
        (t, 10)
    };
    u32::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_native_bases() {
        assert_eq!(parse_register_value("0x00ff00ff"), Some(0x00FF_00FF));
        assert_eq!(parse_register_value("0X10"), Some(16));
        assert_eq!(parse_register_value("0b101"), Some(5));
        assert_eq!(parse_register_value("0o17"), Some(15));
        assert_eq!(parse_register_value("42"), Some(42));
        assert_eq!(parse_register_value(" 0x10 "), Some(16));
    }

    #[test]
    fn unparsable_values_are_unavailable() {
        assert_eq!(parse_register_value("{0x00 0x01 0x02 0x03}"), None);
        assert_eq!(parse_register_value(""), None);
        assert_eq!(parse_register_value("0x"), None);
    }

    #[test]
    fn unavailable_registers_stay_distinguishable_from_missing() {
        let snap = RegisterSnapshot::from_text_rows([
            (group::SYSTEM, sysreg::SSR, "0x00050000"),
            (group::SYSTEM, "v0", "{0x00 0x01 0x02 0x03}"),
        ]);
        assert_eq!(snap.sys(sysreg::SSR), Some(0x0005_0000));
        assert_eq!(snap.sys("v0"), None);
        assert!(snap.contains(group::SYSTEM, "v0"));
        assert!(!snap.contains(group::SYSTEM, "v1"));
    }

    #[test]
    fn thread_group_holds_the_pc() {
        let snap =
            RegisterSnapshot::from_text_rows([(group::THREAD, threadreg::PC, "0xb0001000")]);
        assert_eq!(snap.pc(), Some(0xB000_1000));
        assert_eq!(snap.sys(threadreg::PC), None);
    }
}
