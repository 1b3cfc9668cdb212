//! Simulated sensor board.
//!
//! A virtual microsecond clock plus a model of each sensor line:
//! - RC lines discharge a fixed number of microseconds after being switched to
//!   input; the delay can differ depending on whether any attached emitter is lit.
//! - Analog lines return scripted samples first, then a lit/dark constant.
//!
//! Every mode change, pin write and interrupt mask transition is recorded with
//! its timestamp so tests can check sequencing and settle times.

use std::collections::{BTreeMap, VecDeque};

use qtr_traits::{AnalogIn, Clock, Gpio, HalResult, InterruptMask, Level, Pin, PinMode};
use tracing::trace;

use crate::error::HwError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    Mode { pin: Pin, mode: PinMode },
    Write { pin: Pin, level: Level },
    InterruptsMasked,
    InterruptsRestored,
}

/// An event and the virtual time it happened at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamped {
    pub at_us: u32,
    pub event: SimEvent,
}

#[derive(Debug, Clone)]
struct SimLine {
    mode: PinMode,
    latch: Level,
    input_since: Option<u32>,
    decay_lit: Option<u32>,
    decay_dark: Option<u32>,
    analog_script: VecDeque<u16>,
    analog_lit: u16,
    analog_dark: u16,
    failed: bool,
}

impl Default for SimLine {
    fn default() -> Self {
        Self {
            mode: PinMode::Input,
            latch: Level::Low,
            input_since: None,
            decay_lit: None,
            decay_dark: None,
            analog_script: VecDeque::new(),
            analog_lit: 0,
            analog_dark: 0,
            failed: false,
        }
    }
}

/// Deterministic board used by tests and host-side experiments.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    now: u32,
    micros_tick: u32,
    lines: BTreeMap<Pin, SimLine>,
    emitters: Vec<Pin>,
    mask_depth: u32,
    masked_since: u32,
    longest_mask_us: u32,
    events: Vec<Stamped>,
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self {
            now: 0,
            micros_tick: 1,
            lines: BTreeMap::new(),
            emitters: Vec::new(),
            mask_depth: 0,
            masked_since: 0,
            longest_mask_us: 0,
            events: Vec::new(),
        }
    }

    /// Start the virtual clock at `now` (useful for wraparound tests).
    pub fn starting_at(now: u32) -> Self {
        Self {
            now,
            ..Self::new()
        }
    }

    /// How far the clock moves on every `micros()` call. Defaults to 1 so
    /// polling loops always make progress.
    pub fn set_micros_tick(&mut self, tick: u32) {
        self.micros_tick = tick;
    }

    /// Mark `pin` as an emitter; sensor lines are "lit" while any emitter
    /// pin is driven high.
    pub fn attach_emitter(&mut self, pin: Pin) {
        if !self.emitters.contains(&pin) {
            self.emitters.push(pin);
        }
        self.lines.entry(pin).or_default();
    }

    /// RC decay time regardless of emitter state. `None` never discharges.
    pub fn set_decay(&mut self, pin: Pin, decay_us: Option<u32>) {
        let line = self.lines.entry(pin).or_default();
        line.decay_lit = decay_us;
        line.decay_dark = decay_us;
    }

    /// RC decay times with emitters lit and dark.
    pub fn set_decay_lit_dark(&mut self, pin: Pin, lit: Option<u32>, dark: Option<u32>) {
        let line = self.lines.entry(pin).or_default();
        line.decay_lit = lit;
        line.decay_dark = dark;
    }

    /// Analog level regardless of emitter state.
    pub fn set_analog(&mut self, pin: Pin, value: u16) {
        self.set_analog_lit_dark(pin, value, value);
    }

    pub fn set_analog_lit_dark(&mut self, pin: Pin, lit: u16, dark: u16) {
        let line = self.lines.entry(pin).or_default();
        line.analog_lit = lit;
        line.analog_dark = dark;
    }

    /// Queue samples returned (in order) before falling back to the
    /// lit/dark constant.
    pub fn queue_analog(&mut self, pin: Pin, samples: impl IntoIterator<Item = u16>) {
        let line = self.lines.entry(pin).or_default();
        line.analog_script.extend(samples);
    }

    /// Make every operation on `pin` fail with `HwError::PinUnavailable`.
    pub fn fail_pin(&mut self, pin: Pin) {
        self.lines.entry(pin).or_default().failed = true;
    }

    pub fn now(&self) -> u32 {
        self.now
    }

    pub fn advance(&mut self, us: u32) {
        self.now = self.now.wrapping_add(us);
    }

    pub fn pin_mode(&self, pin: Pin) -> Option<PinMode> {
        self.lines.get(&pin).map(|l| l.mode)
    }

    pub fn latch(&self, pin: Pin) -> Option<Level> {
        self.lines.get(&pin).map(|l| l.latch)
    }

    pub fn interrupts_masked(&self) -> bool {
        self.mask_depth > 0
    }

    /// Longest single masked section observed so far.
    pub fn longest_mask_us(&self) -> u32 {
        self.longest_mask_us
    }

    pub fn events(&self) -> &[Stamped] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Writes to `pin`, in order.
    pub fn writes_to(&self, pin: Pin) -> Vec<Stamped> {
        self.events
            .iter()
            .copied()
            .filter(|e| matches!(e.event, SimEvent::Write { pin: p, .. } if p == pin))
            .collect()
    }

    fn record(&mut self, event: SimEvent) {
        self.events.push(Stamped {
            at_us: self.now,
            event,
        });
    }

    fn lit(&self) -> bool {
        self.emitters.iter().any(|p| {
            self.lines
                .get(p)
                .is_some_and(|l| l.mode == PinMode::Output && l.latch.is_high())
        })
    }

    fn line_mut(&mut self, pin: Pin) -> HalResult<&mut SimLine> {
        let line = self.lines.entry(pin).or_default();
        if line.failed {
            return Err(Box::new(HwError::PinUnavailable(pin)));
        }
        Ok(line)
    }
}

impl Gpio for SimulatedBoard {
    fn set_pin_mode(&mut self, pin: Pin, mode: PinMode) -> HalResult<()> {
        let now = self.now;
        let line = self.line_mut(pin)?;
        if mode == PinMode::Input && line.mode == PinMode::Output {
            line.input_since = Some(now);
        }
        if mode == PinMode::Output {
            line.input_since = None;
        }
        line.mode = mode;
        self.record(SimEvent::Mode { pin, mode });
        Ok(())
    }

    fn digital_write(&mut self, pin: Pin, level: Level) -> HalResult<()> {
        self.line_mut(pin)?.latch = level;
        self.record(SimEvent::Write { pin, level });
        Ok(())
    }

    fn digital_read(&mut self, pin: Pin) -> HalResult<Level> {
        let lit = self.lit();
        let now = self.now;
        let line = self.line_mut(pin)?;
        if line.mode == PinMode::Output {
            return Ok(line.latch);
        }
        let decay = if lit { line.decay_lit } else { line.decay_dark };
        let level = match (line.input_since, decay) {
            (Some(since), Some(decay)) if now.wrapping_sub(since) >= decay => Level::Low,
            (Some(_), _) => Level::High,
            (None, _) => line.latch,
        };
        Ok(level)
    }
}

impl AnalogIn for SimulatedBoard {
    fn analog_sample(&mut self, pin: Pin) -> HalResult<u16> {
        let lit = self.lit();
        let line = self.line_mut(pin)?;
        let sample = line.analog_script.pop_front().unwrap_or(if lit {
            line.analog_lit
        } else {
            line.analog_dark
        });
        Ok(sample)
    }
}

impl Clock for SimulatedBoard {
    fn micros(&mut self) -> u32 {
        let now = self.now;
        self.now = self.now.wrapping_add(self.micros_tick);
        now
    }

    fn delay_us(&mut self, us: u32) {
        self.advance(us);
    }
}

impl InterruptMask for SimulatedBoard {
    fn disable_interrupts(&mut self) {
        if self.mask_depth == 0 {
            self.masked_since = self.now;
            self.record(SimEvent::InterruptsMasked);
        }
        self.mask_depth += 1;
    }

    fn enable_interrupts(&mut self) {
        if self.mask_depth == 0 {
            trace!("enable_interrupts without matching disable");
            return;
        }
        self.mask_depth -= 1;
        if self.mask_depth == 0 {
            let held = self.now.wrapping_sub(self.masked_since);
            self.longest_mask_us = self.longest_mask_us.max(held);
            self.record(SimEvent::InterruptsRestored);
        }
    }
}
