//! Debugger-side integration: the engine seam, the conditional step
//! controller, and the command surface.

use anyhow::{Context, Result};
use log::trace;

pub mod commands;
pub mod engine;
pub mod step;

#[cfg(test)]
pub(crate) mod mock;

use engine::{Engine, StopEvent, ThreadId};
use step::StepPredicate;

/// Progress of one conditional step sequence. The only transition is
/// stepping to complete, made by the predicate when its condition holds;
/// the controller never moves backwards.
#[derive(Debug, Default)]
pub struct StepPlan {
    complete: bool,
}

impl StepPlan {
    pub fn set_complete(&mut self) {
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Outcome of a conditional step sequence.
#[derive(Debug)]
pub enum StepReport {
    /// The predicate's condition held and the plan was marked complete.
    Satisfied { steps: u64 },
    /// The target stopped for a reason this sequence does not own
    /// (breakpoint, signal, exit); the engine takes over from here.
    Interrupted { steps: u64, event: StopEvent },
}

/// Drive the single-instruction-step primitive until `pred` is satisfied
/// or the target stops for an unrelated reason.
///
/// Strictly step-then-check: at least one instruction executes before the
/// first evaluation, and there is no timeout. A condition that never
/// becomes true steps forever; interrupting the target is the way out,
/// and surfaces here as an unexplained stop.
pub fn step_until<E: Engine>(
    engine: &mut E,
    tid: ThreadId,
    pred: &mut dyn StepPredicate<E>,
) -> Result<StepReport> {
    let mut plan = StepPlan::default();
    let mut steps = 0u64;

    loop {
        let event = engine.single_step(tid).context("single step failed")?;
        steps += 1;

        if !pred.explains_stop(&event) {
            return Ok(StepReport::Interrupted { steps, event });
        }
        if pred.should_stop(engine, tid, &mut plan) {
            return Ok(StepReport::Satisfied { steps });
        }
        if !pred.should_step() {
            return Ok(StepReport::Interrupted { steps, event });
        }

        if let Some(pc) = engine.pc(tid) {
            trace!("continued at {pc:#010x}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::mock::{sys_snapshot, MockEngine};
    use crate::debug::step::StepModeChange;
    use crate::sys::sysreg;

    #[test]
    fn plan_completes_exactly_once() {
        let mut plan = StepPlan::default();
        assert!(!plan.is_complete());
        plan.set_complete();
        assert!(plan.is_complete());
        plan.set_complete();
        assert!(plan.is_complete());
    }

    #[test]
    fn unexplained_stop_hands_control_back() {
        let mut engine =
            MockEngine::single_thread(sys_snapshot(&[(sysreg::MODECTL, 0x0001_0001)]));
        let mut pred = StepModeChange::new(&mut engine, 0);
        engine.push_step(StopEvent::SwBreak(()), None);

        match step_until(&mut engine, 0, &mut pred).unwrap() {
            StepReport::Interrupted { steps, event } => {
                assert_eq!(steps, 1);
                assert!(matches!(event, StopEvent::SwBreak(())));
            }
            other => panic!("expected an interrupted sequence, got {other:?}"),
        }
    }

    #[test]
    fn step_errors_propagate() {
        let mut engine =
            MockEngine::single_thread(sys_snapshot(&[(sysreg::MODECTL, 0x0001_0001)]));
        let mut pred = StepModeChange::new(&mut engine, 0);
        // Empty script: the step primitive itself fails.
        assert!(step_until(&mut engine, 0, &mut pred).is_err());
    }
}
