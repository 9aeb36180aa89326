//! The user-facing command surface.
//!
//! Commands are registered through an explicit table: hosts iterate
//! [`registry`] once at startup and wire each entry into their own
//! dispatch. Handlers write to the supplied writer and report failures as
//! values; nothing here may take the host session down.

use crate::debug::engine::{Engine, ThreadId};
use crate::debug::step::{StepInt, StepIntRte, StepModeChange};
use crate::debug::{step_until, StepReport};
use crate::sys::decode::{decode_interrupts, vector_ids};
use crate::sys::status::{collect, render, render_interrupts, render_vids, StatusError};
use crate::sys::sysreg;
use log::info;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionParseError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
}

/// Parsed command options. The one flag is accepted for compatibility and
/// currently unused; stray positional arguments are ignored.
// TODO: accept an argument selecting interrupt vs exception for the step
// commands.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub tbd: bool,
}

/// Parse command arguments into [`Options`]. Bad input is a value, not a
/// panic; the host session must outlive our mistakes.
pub fn parse_options(args: &[&str]) -> Result<Options, OptionParseError> {
    let mut options = Options::default();
    for arg in args {
        match *arg {
            "-t" | "--tbd" => options.tbd = true,
            other if other.starts_with('-') => {
                return Err(OptionParseError::UnknownOption(other.to_string()));
            }
            _ => {}
        }
    }
    Ok(options)
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid frame")]
    InvalidFrame,
    #[error("option parsing failed")]
    Options(#[from] OptionParseError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CommandResult = Result<(), CommandError>;

/// One debugger command: its name, the one-line help the host surfaces,
/// and its handler.
pub struct CommandSpec<E: Engine> {
    pub name: &'static str,
    pub summary: &'static str,
    pub run: fn(&mut E, &[&str], &mut dyn Write) -> CommandResult,
}

/// Every command this crate provides, in registration order.
pub fn registry<E: Engine>() -> Vec<CommandSpec<E>> {
    vec![
        CommandSpec {
            name: "sysstatus",
            summary: "Decode and display system and per-thread status registers",
            run: sysstatus,
        },
        CommandSpec {
            name: "stepmode",
            summary: "Step instructions until the mode-control register changes",
            run: stepmode,
        },
        CommandSpec {
            name: "stepint",
            summary: "Step instructions until an interrupt is pending",
            run: stepint,
        },
        CommandSpec {
            name: "stepintrte",
            summary: "Step to interrupt RTE",
            run: stepintrte,
        },
    ]
}

/// Announce the installed commands to whoever is watching the log.
pub fn log_installed<E: Engine>(registry: &[CommandSpec<E>]) {
    for cmd in registry {
        info!("the \"{}\" command has been installed", cmd.name);
    }
}

fn current_thread_or_err<E: Engine>(engine: &mut E) -> Result<ThreadId, CommandError> {
    engine.current_thread().ok_or(CommandError::InvalidFrame)
}

/// Decode and print the system status tables.
pub fn sysstatus<E: Engine>(engine: &mut E, args: &[&str], out: &mut dyn Write) -> CommandResult {
    let _options = parse_options(args)?;
    let focus = current_thread_or_err(engine)?;
    let status = collect(engine, focus)?;
    render(&status, out)?;
    Ok(())
}

/// Step until the mode-control register changes. No output of its own;
/// the host reports the final stop location.
pub fn stepmode<E: Engine>(engine: &mut E, args: &[&str], _out: &mut dyn Write) -> CommandResult {
    let _options = parse_options(args)?;
    let tid = current_thread_or_err(engine)?;
    let mut pred = StepModeChange::new(engine, tid);
    step_until(engine, tid, &mut pred)?;
    Ok(())
}

/// Step until an interrupt is pending, then print the interrupt and
/// vector-id report for the stopped state.
pub fn stepint<E: Engine>(engine: &mut E, args: &[&str], out: &mut dyn Write) -> CommandResult {
    let _options = parse_options(args)?;
    let tid = current_thread_or_err(engine)?;
    let mut pred = StepInt::new(engine, tid);

    if let StepReport::Satisfied { .. } = step_until(engine, tid, &mut pred)? {
        let snap = engine.read_registers(tid)?;
        if let Some(ints) = snap.sys(sysreg::IPENDAD).map(decode_interrupts) {
            render_interrupts(&ints, out)?;
        }
        if let (Some(vid), Some(vid1)) = (snap.sys(sysreg::VID), snap.sys(sysreg::VID1)) {
            render_vids(&vector_ids(vid, vid1), out)?;
        }
    }
    Ok(())
}

/// Step until execution returns from the interrupt handler.
pub fn stepintrte<E: Engine>(engine: &mut E, args: &[&str], _out: &mut dyn Write) -> CommandResult {
    let _options = parse_options(args)?;
    let tid = current_thread_or_err(engine)?;
    let mut pred = StepIntRte::new(engine, tid);
    step_until(engine, tid, &mut pred)?;
    Ok(())
}
