//! Conditional step predicates.
//!
//! Each predicate captures its baseline when constructed, and is consulted
//! after every executed instruction by [`step_until`](crate::debug::step_until).
//! Missing register data is never an error during a sequence: a predicate
//! that cannot sample what it needs reports "condition false" and lets the
//! target execute one more instruction.

use crate::debug::engine::{Engine, StopEvent, ThreadId};
use crate::debug::StepPlan;
use crate::sys::decode::{has_pending_interrupt, in_handler, is_weird_state, StatusFlags};
use crate::sys::sysreg;
use log::debug;

/// The stop-condition half of a scripted step sequence.
///
/// `explains_stop` filters out stops the sequence does not own; a
/// breakpoint or signal in the middle of stepping belongs to the engine,
/// not to us. `should_stop` re-samples live state and decides whether the
/// sequence is done, marking the plan complete when it is. `should_step`
/// stays true for every predicate here: strictly step, then check.
pub trait StepPredicate<E: Engine> {
    /// True only for a completed single instruction.
    fn explains_stop(&mut self, event: &StopEvent) -> bool {
        matches!(event, StopEvent::DoneStep)
    }

    /// Re-sample state after one instruction; true ends the sequence.
    fn should_stop(&mut self, engine: &mut E, tid: ThreadId, plan: &mut StepPlan) -> bool;

    /// Whether to execute another instruction.
    fn should_step(&self) -> bool {
        true
    }
}

/// Steps until the mode-control register moves away from its value at
/// sequence start, or the system registers look corrupted.
pub struct StepModeChange {
    baseline: Option<u32>,
}

impl StepModeChange {
    pub fn new<E: Engine>(engine: &mut E, tid: ThreadId) -> Self {
        Self {
            baseline: sample_modectl(engine, tid),
        }
    }
}

fn sample_modectl<E: Engine>(engine: &mut E, tid: ThreadId) -> Option<u32> {
    engine
        .read_registers(tid)
        .ok()
        .and_then(|snap| snap.sys(sysreg::MODECTL))
}

impl<E: Engine> StepPredicate<E> for StepModeChange {
    fn should_stop(&mut self, engine: &mut E, tid: ThreadId, plan: &mut StepPlan) -> bool {
        let snap = match engine.read_registers(tid) {
            Ok(snap) => snap,
            Err(_) => return false,
        };
        let changed = match (snap.sys(sysreg::MODECTL), self.baseline) {
            (Some(current), Some(baseline)) => current != baseline,
            _ => false,
        };
        if changed || is_weird_state(&snap) {
            plan.set_complete();
            return true;
        }
        false
    }
}

/// Steps until the HVX (vector extension) enable flag flips.
pub struct StepHvxChange {
    baseline: Option<bool>,
}

impl StepHvxChange {
    pub fn new<E: Engine>(engine: &mut E, tid: ThreadId) -> Self {
        Self {
            baseline: sample_xe(engine, tid),
        }
    }
}

fn sample_xe<E: Engine>(engine: &mut E, tid: ThreadId) -> Option<bool> {
    let ssr = engine.read_registers(tid).ok()?.sys(sysreg::SSR)?;
    Some(StatusFlags::from_bits_truncate(ssr).contains(StatusFlags::XE))
}

impl<E: Engine> StepPredicate<E> for StepHvxChange {
    fn should_stop(&mut self, engine: &mut E, tid: ThreadId, plan: &mut StepPlan) -> bool {
        match (sample_xe(engine, tid), self.baseline) {
            (Some(current), Some(baseline)) if current != baseline => {
                plan.set_complete();
                true
            }
            _ => false,
        }
    }
}

/// Steps until an interrupt line is pending and deliverable. No baseline:
/// the condition is absolute.
pub struct StepInt;

impl StepInt {
    pub fn new<E: Engine>(engine: &mut E, tid: ThreadId) -> Self {
        if let Some(pc) = engine.pc(tid) {
            debug!("stepping for a pending interrupt from {pc:#010x}");
        }
        Self
    }
}

impl<E: Engine> StepPredicate<E> for StepInt {
    fn should_stop(&mut self, engine: &mut E, tid: ThreadId, plan: &mut StepPlan) -> bool {
        match engine.read_registers(tid) {
            Ok(snap) if has_pending_interrupt(&snap) => {
                plan.set_complete();
                true
            }
            _ => false,
        }
    }
}

/// Steps until execution leaves the interrupt/exception handler. Also
/// absolute: stops on the first instruction observed outside handler
/// context, including when the status register cannot be read at all.
pub struct StepIntRte;

impl StepIntRte {
    pub fn new<E: Engine>(engine: &mut E, tid: ThreadId) -> Self {
        if let Some(pc) = engine.pc(tid) {
            debug!("stepping to handler return from {pc:#010x}");
        }
        Self
    }
}

impl<E: Engine> StepPredicate<E> for StepIntRte {
    fn should_stop(&mut self, engine: &mut E, tid: ThreadId, plan: &mut StepPlan) -> bool {
        let still_in_handler = match engine.read_registers(tid) {
            Ok(snap) => in_handler(&snap),
            Err(_) => false,
        };
        if !still_in_handler {
            plan.set_complete();
            return true;
        }
        false
    }
}
