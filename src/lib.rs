//! Debugger-side status decoding and conditional stepping for a
//! Hexagon-architecture CPU simulation.
//!
//! The host debugging engine owns the target; this crate decodes its
//! system-register state into per-thread status records, renders the
//! system status tables, and drives "step until condition" sequences:
//! mode change, HVX state change, pending interrupt, interrupt return.

pub mod common;
pub mod debug;
pub mod sys;

pub use crate::debug::commands::{registry, CommandError, CommandSpec};
pub use crate::debug::engine::{Engine, StopEvent, ThreadId};
pub use crate::debug::step::{StepHvxChange, StepInt, StepIntRte, StepModeChange, StepPredicate};
pub use crate::debug::{step_until, StepPlan, StepReport};
pub use crate::sys::status::{collect, render, SystemStatus};
pub use crate::sys::RegisterSnapshot;
