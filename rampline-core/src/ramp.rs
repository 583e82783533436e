//! Per-parameter ramp state machine.
//!
//! A [`Ramp`] owns the automation state of exactly one parameter: the current
//! value, an optional goal with curve and duration, and a sample-position
//! counter. The owning orchestrator calls [`Ramp::merge`] when a new
//! instruction arrives and [`Ramp::advance`] once per render block;
//! [`Ramp::peek`] and [`Ramp::skip`] cover lookahead and seeking.
//!
//! Values come in two representations. An absolute value is emitted as-is. A
//! *ratio* value is a multiplicative factor and needs the caller-supplied
//! per-sample `carrier` buffer to become an absolute signal; a missing
//! carrier is treated as all-ones, never as an error.
//!
//! States: idle (no goal, no timer), timed-hold (bare timer), ramping (goal
//! active). Reaching `position == duration` promotes the goal into the value
//! and returns the ramp to idle at the new constant.
//!
//! All operations are single-caller and non-reentrant; nothing here locks or
//! allocates, and the engine never retains a carrier reference past a call.

use crate::curves::CurveKind;
use crate::dsp::ms_to_samples;

/// Sparse overlay produced by the instruction parser/sequencer.
///
/// Each `Option`/flag marks a field as explicitly overridden; unset fields
/// leave the corresponding [`Ramp`] field untouched. Consumed exactly once by
/// [`Ramp::merge`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Instruction {
    /// Overwrite the current value outright (no continuity snapshot).
    pub value: Option<f32>,
    /// Ratio flag accompanying `value`; applied only when `value` is set.
    pub value_is_ratio: bool,
    /// New goal; activates a ramp toward it.
    pub goal: Option<f32>,
    /// Ratio flag accompanying `goal`; applied only when `goal` is set.
    pub goal_is_ratio: bool,
    /// New curve shape.
    pub curve: Option<CurveKind>,
    /// New duration in milliseconds; converted to samples during merge.
    pub duration_ms: Option<f32>,
    /// Keep the remaining time of an in-flight ramp instead of restarting
    /// the clock.
    pub inherit_time: bool,
}

impl Instruction {
    /// Jump straight to `value` (absolute).
    pub fn set(value: f32) -> Self {
        Instruction {
            value: Some(value),
            ..Instruction::default()
        }
    }

    /// Ramp to `goal` over `ms` milliseconds through `curve`.
    pub fn glide_to(goal: f32, ms: f32, curve: CurveKind) -> Self {
        Instruction {
            goal: Some(goal),
            curve: Some(curve),
            duration_ms: Some(ms),
            ..Instruction::default()
        }
    }
}

/// Automation state for one parameter.
///
/// `Copy`-free only because it is mutable state; the struct itself is a
/// handful of scalars and booleans, cheap to move and with no heap behind it.
#[derive(Copy, Clone, Debug)]
pub struct Ramp {
    value: f32,
    goal: f32,
    curve: CurveKind,
    position: u32,
    duration: u32,

    // attribute bookkeeping, one named flag per attribute
    value_set: bool,
    goal_active: bool,
    curve_set: bool,
    timer_active: bool,
    inherit_time: bool,
    value_is_ratio: bool,
    goal_is_ratio: bool,
}

impl Default for Ramp {
    fn default() -> Self {
        Ramp::new(0.0)
    }
}

impl Ramp {
    /// A ramp idling at `initial`.
    pub fn new(initial: f32) -> Self {
        Ramp {
            value: initial,
            goal: 0.0,
            curve: CurveKind::default(),
            position: 0,
            duration: 0,
            value_set: true,
            goal_active: false,
            curve_set: false,
            timer_active: false,
            inherit_time: false,
            value_is_ratio: false,
            goal_is_ratio: false,
        }
    }

    #[inline] pub fn value(&self) -> f32 { self.value }
    #[inline] pub fn goal(&self) -> f32 { self.goal }
    #[inline] pub fn curve(&self) -> CurveKind { self.curve }
    #[inline] pub fn position(&self) -> u32 { self.position }
    #[inline] pub fn duration(&self) -> u32 { self.duration }
    #[inline] pub fn goal_active(&self) -> bool { self.goal_active }
    #[inline] pub fn timer_active(&self) -> bool { self.timer_active }
    #[inline] pub fn value_is_ratio(&self) -> bool { self.value_is_ratio }
    #[inline] pub fn goal_is_ratio(&self) -> bool { self.goal_is_ratio }
    #[inline] pub fn value_set(&self) -> bool { self.value_set }
    #[inline] pub fn curve_set(&self) -> bool { self.curve_set }
    #[inline] pub fn inherits_time(&self) -> bool { self.inherit_time }

    /// Fill `out` with upcoming goal-driven samples without advancing time.
    ///
    /// Returns the number of samples written: 0 when no goal is active,
    /// otherwise `out.len()` clamped to the samples remaining before the
    /// goal is reached.
    ///
    /// When the value and goal representations disagree, the value is
    /// converted once against `carrier[0]`: entering ratio land divides,
    /// leaving it multiplies and then drops the carrier for the rest of the
    /// call. Only that first carrier sample participates in the conversion.
    pub fn peek(&mut self, out: &mut [f32], carrier: Option<&[f32]>) -> usize {
        if !self.goal_active {
            return 0;
        }

        let mut carrier = carrier;
        if self.goal_is_ratio && !self.value_is_ratio {
            if let Some(&c0) = carrier.and_then(|c| c.first()) {
                self.value /= c0;
            }
            self.value_is_ratio = true;
        } else if self.value_is_ratio && !self.goal_is_ratio {
            if let Some(&c0) = carrier.and_then(|c| c.first()) {
                self.value *= c0;
            }
            self.value_is_ratio = false;
            carrier = None;
        }

        let remaining = (self.duration - self.position) as usize;
        let len = out.len().min(remaining);
        let scale = if self.value_is_ratio { carrier } else { None };
        self.curve.fill(
            &mut out[..len],
            self.value,
            self.goal,
            self.position,
            self.duration,
            scale,
        );
        len
    }

    /// Render one block and advance time.
    ///
    /// Without an active goal this fills the whole block with the constant
    /// value (carrier-scaled only for a ratio value), ticking down a bare
    /// timer if one is running, and returns `false`.
    ///
    /// With a goal it emits via [`Ramp::peek`], advances `position`, and on
    /// reaching `duration` promotes the goal into the value, clears the
    /// goal/timer flags, resets `position`, and fills the rest of the block
    /// with the new constant (carrier advanced past the consumed samples).
    ///
    /// Returns `true` iff the goal is still in flight after this block.
    pub fn advance(&mut self, out: &mut [f32], carrier: Option<&[f32]>) -> bool {
        if !self.goal_active {
            if self.timer_active {
                let step = (out.len() as u32).min(self.duration - self.position);
                self.position += step;
                if self.position >= self.duration {
                    self.timer_active = false;
                    self.position = 0;
                }
            }
            self.fill_constant(out, carrier);
            return false;
        }

        let len = self.peek(out, carrier);
        self.position += len as u32;
        if self.position < self.duration {
            return true;
        }

        // terminal: goal becomes the new idle constant
        self.value = self.goal;
        self.value_is_ratio = self.goal_is_ratio;
        self.goal_active = false;
        self.timer_active = false;
        self.position = 0;

        let rest = &mut out[len..];
        if !rest.is_empty() {
            let tail = carrier.map(|c| &c[len..]);
            self.fill_constant(rest, tail);
        }
        false
    }

    /// Fast-forward `count` samples without synthesizing anything.
    ///
    /// Same position bookkeeping as [`Ramp::advance`], including goal
    /// promotion and the ratio-flag update on completion. Returns `true` iff
    /// a goal remains active afterwards.
    pub fn skip(&mut self, count: u32) -> bool {
        if !self.goal_active {
            if self.timer_active {
                let step = count.min(self.duration - self.position);
                self.position += step;
                if self.position >= self.duration {
                    self.timer_active = false;
                    self.position = 0;
                }
            }
            return false;
        }

        let step = count.min(self.duration - self.position);
        self.position += step;
        if self.position < self.duration {
            return true;
        }

        self.value = self.goal;
        self.value_is_ratio = self.goal_is_ratio;
        self.goal_active = false;
        self.timer_active = false;
        self.position = 0;
        false
    }

    /// Apply a sparse instruction, attribute by attribute.
    ///
    /// An explicit value wins outright. Otherwise an in-flight ramp is
    /// sampled at its current position first, so retargeting continues from
    /// where the trajectory actually is instead of snapping back to the
    /// stale start value. Durations arrive in milliseconds and are converted
    /// here against `sample_rate`.
    pub fn merge(&mut self, instr: Instruction, sample_rate: f32) {
        if let Some(v) = instr.value {
            self.value = v;
            self.value_is_ratio = instr.value_is_ratio;
            self.value_set = true;
        } else if self.goal_active {
            let mut here = [0.0f32; 1];
            if self.peek(&mut here, None) == 1 {
                self.value = here[0];
                self.value_set = true;
            }
        }

        if let Some(g) = instr.goal {
            self.goal = g;
            self.goal_active = true;
            self.goal_is_ratio = instr.goal_is_ratio;
            if instr.inherit_time {
                // keep only the time not yet spent
                self.duration = self.duration.saturating_sub(self.position);
                self.inherit_time = true;
            }
            self.position = 0;
        }

        if let Some(c) = instr.curve {
            self.curve = c;
            self.curve_set = true;
        }

        if let Some(ms) = instr.duration_ms {
            if !self.timer_active || !instr.inherit_time {
                self.duration = ms_to_samples(ms, sample_rate);
                self.timer_active = true;
            }
        }
    }

    /// Constant fill through the hold curve, carrier-scaled only when the
    /// value is a ratio.
    fn fill_constant(&self, out: &mut [f32], carrier: Option<&[f32]>) {
        let scale = if self.value_is_ratio { carrier } else { None };
        CurveKind::Hold.fill(out, self.value, self.value, 0, 1, scale);
    }
}

// ------------------------------------ Tests --------------------------------------
