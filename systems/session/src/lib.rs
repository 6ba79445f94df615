#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure session system that translates input edges into run-phase commands.
//!
//! Adapters distill their input devices into per-frame [`SessionInput`]
//! flags; this system turns them into explicit commands instead of the
//! process-wide input delegates the run phases were originally driven by.

use crystal_run_core::{Command, RunPhase};

/// Input snapshot distilled from adapter-provided frame input data.
///
/// Both flags are edge-triggered with at-most-once-per-press semantics; the
/// adapter is responsible for debouncing held inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SessionInput {
    /// The player pressed on this frame (enables continuous generation).
    pub press: bool,
    /// A restart was requested on this frame (pre-press / round restart).
    pub before_press: bool,
}

impl SessionInput {
    /// Creates a new input descriptor with explicit field values.
    #[must_use]
    pub const fn new(press: bool, before_press: bool) -> Self {
        Self {
            press,
            before_press,
        }
    }
}

/// Session controller that wires input edges to generation phases.
#[derive(Debug, Default)]
pub struct Session;

impl Session {
    /// Creates a new session system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Consumes one frame of input and the current phase to emit commands.
    ///
    /// A restart request always wins: the reset command is emitted first and
    /// a press on the same frame is evaluated against the post-reset phase,
    /// so it never enables generation mid-reset.
    pub fn handle(&mut self, input: SessionInput, phase: RunPhase, out: &mut Vec<Command>) {
        let mut phase = phase;

        if input.before_press {
            out.push(Command::ResetRun);
            phase = RunPhase::PreRoll;
        }

        if input.press && phase == RunPhase::Idle {
            out.push(Command::SetRunPhase {
                phase: RunPhase::Active,
            });
        }
    }
}
