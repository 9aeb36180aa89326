//! The seam to the host debugging engine.
//!
//! The engine owns the target: it knows the hardware threads, reads their
//! register files, and executes single instructions. This crate only
//! consumes that surface and never drives a real target itself.

use crate::sys::RegisterSnapshot;
use anyhow::Result;
use gdbstub::stub::SingleThreadStopReason;

/// Index of a hardware thread in the current process snapshot.
pub type ThreadId = usize;

/// Why the target stopped after an execution request, in the debug
/// protocol's vocabulary. A completed single instruction reports
/// `DoneStep`; every other reason belongs to someone other than the step
/// controller.
pub type StopEvent = SingleThreadStopReason<u32>;

pub trait Engine {
    /// Hardware threads of the current process snapshot, in display
    /// order.
    fn threads(&mut self) -> Vec<ThreadId>;

    /// The thread owning the currently selected frame, or `None` when the
    /// execution context has no valid frame.
    fn current_thread(&mut self) -> Option<ThreadId>;

    /// Read the thread's register file. Individual registers may come
    /// back unavailable inside the snapshot; a hard error means the
    /// thread itself could not be inspected.
    fn read_registers(&mut self, tid: ThreadId) -> Result<RegisterSnapshot>;

    /// Current program counter of the thread, when known.
    fn pc(&mut self, tid: ThreadId) -> Option<u32>;

    /// Execute one instruction on the thread and report why execution
    /// stopped.
    fn single_step(&mut self, tid: ThreadId) -> Result<StopEvent>;
}
