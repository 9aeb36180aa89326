//! A scripted engine for exercising the step controller and commands.

use crate::debug::engine::{Engine, StopEvent, ThreadId};
use crate::sys::{group, sysreg, threadreg, RegisterSnapshot};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, VecDeque};

pub struct ScriptedStep {
    pub event: StopEvent,
    /// Live register state after the step, for the stepped thread.
    pub snapshot: Option<RegisterSnapshot>,
}

/// Register state transitions are scripted: every `single_step` pops the
/// next entry, swaps in its snapshot, and reports its stop event. An
/// exhausted script makes the step primitive fail.
pub struct MockEngine {
    pub current: Option<ThreadId>,
    pub threads: Vec<ThreadId>,
    pub frames: HashMap<ThreadId, RegisterSnapshot>,
    pub unreadable: Vec<ThreadId>,
    pub script: VecDeque<ScriptedStep>,
    pub steps_taken: usize,
}

impl MockEngine {
    pub fn single_thread(snapshot: RegisterSnapshot) -> Self {
        let mut frames = HashMap::new();
        frames.insert(0, snapshot);
        Self {
            current: Some(0),
            threads: vec![0],
            frames,
            unreadable: Vec::new(),
            script: VecDeque::new(),
            steps_taken: 0,
        }
    }

    pub fn push_step(&mut self, event: StopEvent, snapshot: Option<RegisterSnapshot>) {
        self.script.push_back(ScriptedStep { event, snapshot });
    }
}

impl Engine for MockEngine {
    fn threads(&mut self) -> Vec<ThreadId> {
        self.threads.clone()
    }

    fn current_thread(&mut self) -> Option<ThreadId> {
        self.current
    }

    fn read_registers(&mut self, tid: ThreadId) -> Result<RegisterSnapshot> {
        if self.unreadable.contains(&tid) {
            return Err(anyhow!("thread {tid} is not inspectable"));
        }
        self.frames
            .get(&tid)
            .cloned()
            .ok_or_else(|| anyhow!("no such thread {tid}"))
    }

    fn pc(&mut self, tid: ThreadId) -> Option<u32> {
        self.frames.get(&tid)?.pc()
    }

    fn single_step(&mut self, tid: ThreadId) -> Result<StopEvent> {
        let step = self
            .script
            .pop_front()
            .ok_or_else(|| anyhow!("step script exhausted"))?;
        self.steps_taken += 1;
        if let Some(snapshot) = step.snapshot {
            self.frames.insert(tid, snapshot);
        }
        Ok(step.event)
    }
}

/// A snapshot holding the given system registers.
pub fn sys_snapshot(regs: &[(&str, u32)]) -> RegisterSnapshot {
    let mut snap = RegisterSnapshot::new();
    for (reg, val) in regs {
        snap.insert(group::SYSTEM, reg, Some(*val));
    }
    snap
}

/// A full, healthy single-thread machine: thread 0 running in user mode,
/// interrupts enabled, nothing pending, every register inside its valid
/// bits.
pub fn sane_snapshot() -> RegisterSnapshot {
    let mut snap = sys_snapshot(&[
        (sysreg::SSR, 0x0005_0000),     // UM | IE
        (sysreg::SYSCFG, 0x0000_0010),  // G
        (sysreg::STID, 0x0014_0000),    // priority 20
        (sysreg::MODECTL, 0x0000_0001), // thread 0 enabled, not waiting
        (sysreg::ISDBST, 0),
        (sysreg::IMASK, 0x0000_0005),
        (sysreg::IPENDAD, 0),
        (sysreg::VID, 0),
        (sysreg::VID1, 0),
        (sysreg::BESTWAIT, 0x0000_0014),
        (sysreg::SCHEDCFG, 0x0000_0103), // interrupt 3, enabled
        (sysreg::GEVB, 0x0000_1000),
        (sysreg::EVB, 0x0000_2000),
    ]);
    snap.insert(group::THREAD, threadreg::PC, Some(0x0000_1000));
    snap
}
