//! System-wide status: one decoded record per hardware thread plus the
//! global (non-per-thread) state, and the tabular rendering of both.

use crate::common::test_bit;
use crate::debug::engine::{Engine, ThreadId};
use crate::sys::decode::{
    bestwait_priority, config_flag_names, decode_config, decode_imask, decode_interrupts,
    decode_sched, decode_status, priority, status_flag_names, unexpected_bits, vector_ids,
    ConfigReg, IntMask, InterruptState, PrivMode, RunState, SchedCfg, StatusReg, VectorIds,
};
use crate::sys::{sysreg, RegisterSnapshot};
use log::warn;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("unavailable system regs")]
    UnavailableSysRegs,
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// One hardware thread's decoded state. A thread whose registers cannot
/// be read still gets a record, with the unknown fields left empty; the
/// run state always decodes, since it comes from the global mode-control
/// bits.
#[derive(Debug, Clone)]
pub struct ThreadReport {
    pub tid: ThreadId,
    pub status: Option<StatusReg>,
    pub priority: Option<u16>,
    pub run_state: RunState,
    pub imask: Option<IntMask>,
    pub pc: Option<u32>,
}

/// State that no single thread owns.
#[derive(Debug, Clone)]
pub struct GlobalReport {
    pub modectl: u32,
    pub isdbst: u32,
    pub syscfg: Option<u32>,
    pub config: Option<ConfigReg>,
    pub bestwait: Option<u16>,
    pub sched: Option<SchedCfg>,
    pub interrupts: Option<InterruptState>,
    pub vids: Option<VectorIds>,
    pub unexpected: Vec<(&'static str, u32)>,
}

#[derive(Debug, Clone)]
pub struct SystemStatus {
    pub threads: Vec<ThreadReport>,
    pub global: GlobalReport,
}

/// Decode the state of every hardware thread plus the global registers,
/// read through `focus` (the thread owning the selected frame).
///
/// A thread whose register file cannot be read contributes an empty
/// record rather than aborting the aggregation. The mode-control register
/// is the one hard requirement; without it there is no run state to
/// report for anyone.
pub fn collect<E: Engine>(engine: &mut E, focus: ThreadId) -> Result<SystemStatus, StatusError> {
    let focus_snap = engine.read_registers(focus)?;
    let modectl = focus_snap
        .sys(sysreg::MODECTL)
        .ok_or(StatusError::UnavailableSysRegs)?;
    let isdbst = focus_snap.sys(sysreg::ISDBST).unwrap_or_else(|| {
        warn!("isdbst unavailable, debug bits read as zero");
        0
    });

    let mut threads = Vec::new();
    for tid in engine.threads() {
        let snap = match engine.read_registers(tid) {
            Ok(snap) => Some(snap),
            Err(err) => {
                warn!("cannot read registers for thread {tid}: {err}");
                None
            }
        };
        threads.push(thread_report(tid, snap.as_ref(), modectl, isdbst));
    }

    Ok(SystemStatus {
        threads,
        global: global_report(&focus_snap, modectl, isdbst),
    })
}

fn thread_report(
    tid: ThreadId,
    snap: Option<&RegisterSnapshot>,
    modectl: u32,
    isdbst: u32,
) -> ThreadReport {
    let t = tid as u32;
    let mut report = ThreadReport {
        tid,
        status: None,
        priority: None,
        run_state: RunState::from_dwe(
            test_bit(isdbst, t),
            test_bit(modectl, t + 16),
            test_bit(modectl, t),
        ),
        imask: None,
        pc: None,
    };

    if let Some(snap) = snap {
        report.pc = snap.pc();
        if let (Some(ssr), Some(syscfg), Some(stid)) = (
            snap.sys(sysreg::SSR),
            snap.sys(sysreg::SYSCFG),
            snap.sys(sysreg::STID),
        ) {
            let status = decode_status(ssr);
            let config = decode_config(syscfg);
            report.imask = snap
                .sys(sysreg::IMASK)
                .map(|raw| decode_imask(raw, config.set, status.set));
            report.priority = Some(priority(stid));
            report.status = Some(status);
        }
    }

    report
}

fn global_report(snap: &RegisterSnapshot, modectl: u32, isdbst: u32) -> GlobalReport {
    let syscfg = snap.sys(sysreg::SYSCFG);
    GlobalReport {
        modectl,
        isdbst,
        syscfg,
        config: syscfg.map(decode_config),
        bestwait: snap.sys(sysreg::BESTWAIT).map(bestwait_priority),
        sched: snap.sys(sysreg::SCHEDCFG).map(decode_sched),
        interrupts: snap.sys(sysreg::IPENDAD).map(decode_interrupts),
        vids: match (snap.sys(sysreg::VID), snap.sys(sysreg::VID1)) {
            (Some(vid), Some(vid1)) => Some(vector_ids(vid, vid1)),
            _ => None,
        },
        unexpected: unexpected_bits(snap),
    }
}

fn cause_cell(cause: Option<u8>) -> String {
    match cause {
        Some(c) => format!(" 0x{:02x}", c),
        None => "  -  ".to_string(),
    }
}

/// Render the full status report: global summary lines, the per-thread
/// table with a GLB row, the interrupt-mask table, and the interrupt /
/// vector-id / unexpected-bits reports.
pub fn render(status: &SystemStatus, out: &mut dyn Write) -> io::Result<()> {
    let g = &status.global;

    writeln!(out, "modectl:  0x{:08x}", g.modectl)?;
    match g.bestwait {
        Some(bw) => writeln!(out, "bestwait: 0x{:02x} / {} (dec)", bw, bw)?,
        None => writeln!(out, "bestwait: ?")?,
    }
    match &g.sched {
        Some(s) => writeln!(
            out,
            "schedcfg: 0x{:08x} - int #{:02x} / {} (dec), EN:{}",
            s.raw,
            s.interrupt,
            s.interrupt,
            if s.enabled { "enabled" } else { "disabled" }
        )?,
        None => writeln!(out, "schedcfg: ?")?,
    }
    match g.syscfg {
        Some(raw) => writeln!(out, "syscfg:   0x{:08x}", raw)?,
        None => writeln!(out, "syscfg:   ?")?,
    }

    writeln!(out, "TID Prio Mode  Priv    Cause    Set            Unset")?;
    writeln!(out, "--- ---- ----- ------- ----- --------------   --------------")?;
    for t in &status.threads {
        let prio = match t.priority {
            Some(p) => format!("{:4}", p),
            None => format!("{:<4}", "?"),
        };
        let (privm, set_names, unset_names, cause) = match &t.status {
            Some(s) => (
                PrivMode::classify(s.set),
                status_flag_names(s.set).join(","),
                status_flag_names(s.unset).join(","),
                s.cause,
            ),
            None => (PrivMode::Monitor, String::new(), String::new(), None),
        };
        writeln!(
            out,
            "{:3} {} {:<5} {:<7} {} {:<15}  {:<15}",
            t.tid,
            prio,
            t.run_state,
            privm,
            cause_cell(cause),
            set_names,
            unset_names,
        )?;
    }
    let (cfg_set, cfg_unset) = match &g.config {
        Some(c) => (
            config_flag_names(c.set).join(","),
            config_flag_names(c.unset).join(","),
        ),
        None => (String::new(), String::new()),
    };
    writeln!(out, "GLB    -       -         -   {:<15}  {:<15}", cfg_set, cfg_unset)?;
    writeln!(out)?;

    writeln!(out, "TID  Int    IMASK")?;
    writeln!(out, "    Enabled")?;
    writeln!(out, "--- ------- ----------")?;
    for t in &status.threads {
        match &t.imask {
            Some(m) => {
                let lines: Vec<String> = m.masked_lines.iter().map(|l| l.to_string()).collect();
                writeln!(
                    out,
                    "{:3} {:<7} 0b{:08b}  {}",
                    t.tid,
                    m.enabled,
                    m.mask,
                    lines.join(", ")
                )?;
            }
            None => writeln!(out, "{:3} {:<7} ?", t.tid, "?")?,
        }
    }
    writeln!(out)?;

    if let Some(ints) = &g.interrupts {
        render_interrupts(ints, out)?;
    }
    if let Some(vids) = &g.vids {
        render_vids(vids, out)?;
    }

    if !g.unexpected.is_empty() {
        writeln!(out, "regs w/unexpected bits:")?;
        for (reg, raw) in &g.unexpected {
            writeln!(out, "\t{:<12}: {:08x}", reg, raw)?;
        }
    }

    Ok(())
}

/// The pending / auto-disabled interrupt report.
pub fn render_interrupts(ints: &InterruptState, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "IPEND: 0b{:08b} [pending: {}]",
        ints.pending,
        fmt_lines(ints.pending_lines())
    )?;
    writeln!(
        out,
        "IAD:   0b{:08b} [auto-disabled: {}]",
        ints.auto_disabled,
        fmt_lines(ints.auto_disabled_lines())
    )
}

/// The vector interrupt id line.
pub fn render_vids(vids: &VectorIds, out: &mut dyn Write) -> io::Result<()> {
    let cells: Vec<String> = vids
        .0
        .iter()
        .enumerate()
        .map(|(index, vid)| format!("VID{}: 0x{:02x}", index, vid))
        .collect();
    writeln!(out, "{}", cells.join(", "))
}

fn fmt_lines(lines: Option<Vec<u8>>) -> String {
    match lines {
        Some(lines) => format!("{:?}", lines),
        None => "none".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::mock::{sane_snapshot, MockEngine};
    use crate::sys::group;

    #[test]
    fn collects_one_report_per_thread() {
        let mut engine = MockEngine::single_thread(sane_snapshot());
        let mut second = sane_snapshot();
        // Thread 1 is waiting on an exception with cause 0x03.
        second.insert(group::SYSTEM, sysreg::SSR, Some((1 << 17) | 0x03));
        engine.threads = vec![0, 1];
        engine.frames.insert(1, second);

        let status = collect(&mut engine, 0).unwrap();
        assert_eq!(status.threads.len(), 2);
        assert_eq!(status.threads[0].tid, 0);
        assert_eq!(status.threads[0].status.unwrap().cause, None);
        assert_eq!(status.threads[1].status.unwrap().cause, Some(0x03));
        assert_eq!(status.threads[0].run_state, RunState::Run);
        assert_eq!(status.threads[1].run_state, RunState::Off);
        assert_eq!(status.threads[0].pc, Some(0x0000_1000));
    }

    #[test]
    fn unreadable_thread_does_not_abort_aggregation() {
        let mut engine = MockEngine::single_thread(sane_snapshot());
        engine.threads = vec![0, 1];
        engine.unreadable.push(1);

        let status = collect(&mut engine, 0).unwrap();
        assert_eq!(status.threads.len(), 2);
        assert!(status.threads[1].status.is_none());
        assert!(status.threads[1].priority.is_none());
        assert!(status.threads[1].imask.is_none());
        assert_eq!(status.threads[1].run_state, RunState::Off);
        assert!(status.threads[0].status.is_some());
    }

    #[test]
    fn missing_modectl_is_an_error() {
        let mut snap = sane_snapshot();
        snap.insert(group::SYSTEM, sysreg::MODECTL, None);
        let mut engine = MockEngine::single_thread(snap);

        match collect(&mut engine, 0) {
            Err(StatusError::UnavailableSysRegs) => {}
            other => panic!("expected unavailable system regs, got {other:?}"),
        }
    }

    #[test]
    fn zero_cause_renders_distinct_from_absent() {
        assert_eq!(cause_cell(Some(0)), " 0x00");
        assert_eq!(cause_cell(Some(0x2A)), " 0x2a");
        assert_eq!(cause_cell(None), "  -  ");
    }

    #[test]
    fn renders_summary_tables() {
        let mut engine = MockEngine::single_thread(sane_snapshot());
        let status = collect(&mut engine, 0).unwrap();

        let mut out = Vec::new();
        render(&status, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("modectl:  0x00000001"));
        assert!(text.contains("bestwait: 0x14 / 20 (dec)"));
        assert!(text.contains("int #03 / 3 (dec), EN:enabled"));
        assert!(text.contains("TID Prio Mode  Priv"));
        assert!(text.contains("RUN"));
        assert!(text.contains("User"));
        assert!(text.contains("GLB"));
        assert!(text.contains("IPEND: 0b00000000 [pending: none]"));
        assert!(text.contains("VID0: 0x00"));
        assert!(!text.contains("regs w/unexpected bits"));
    }

    #[test]
    fn renders_unexpected_bits_report() {
        let mut snap = sane_snapshot();
        snap.insert(group::SYSTEM, sysreg::STID, Some(0x0100_0000));
        let mut engine = MockEngine::single_thread(snap);
        let status = collect(&mut engine, 0).unwrap();

        let mut out = Vec::new();
        render(&status, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("regs w/unexpected bits:"));
        assert!(text.contains("stid"));
    }
}
