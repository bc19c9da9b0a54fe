//! Power relay sequencing for the loop supply and the machine's AC motor.
//!
//! Big iron does not like being slammed on: the loop supply comes up first
//! so the selector magnets see current, then the AC contactor closes four
//! seconds later once the loop has settled. Power-down is the mirror image
//! with a shorter settle. The panel LEDs blink through the whole sequence
//! as a "hands off" indication.
//!
//! The sequencer is driven by [`RelaySequencer::tick`] from the poll loop
//! with a millisecond timestamp; nothing here blocks. Requests are level
//! style: asking for the state already reached (or already being sequenced
//! toward) is a no-op, so the caller may re-request every poll.

/// Length of one LED blink phase.
pub const PHASE_MS: u32 = 250;

/// Blink phases in the power-up sequence (4 s total).
pub const POWER_UP_PHASES: u8 = 16;

/// Blink phases in the power-down sequence (3 s total).
pub const POWER_DOWN_PHASES: u8 = 12;

/// What the caller wants the machine to be.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PowerTarget {
    Off,
    On,
}

/// Where the machine currently is. `Enabled` means the full sequence has
/// completed and both relays are closed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RelayState {
    Off,
    Enabled,
}

/// Desired output pin levels, true = energized / lit.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct RelayOutputs {
    pub loop_supply: bool,
    pub ac_power: bool,
    pub leds: bool,
}

struct Sequence {
    target: RelayState,
    phases_left: u8,
    next_phase_ms: u32,
}

pub struct RelaySequencer {
    state: RelayState,
    sequence: Option<Sequence>,
    outputs: RelayOutputs,
}

impl RelaySequencer {
    pub const fn new() -> Self {
        Self {
            state: RelayState::Off,
            sequence: None,
            outputs: RelayOutputs {
                loop_supply: false,
                ac_power: false,
                leds: false,
            },
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// True while a power sequence is running.
    pub fn in_transition(&self) -> bool {
        self.sequence.is_some()
    }

    /// Ask for a power state. Ignored while a sequence is running or when
    /// the state is already reached; a caller that still wants the opposite
    /// state simply asks again after the sequence completes.
    pub fn request(&mut self, target: PowerTarget, now_ms: u32) {
        if self.sequence.is_some() {
            return;
        }
        match target {
            PowerTarget::On => {
                if self.state == RelayState::Enabled {
                    return;
                }
                // loop supply closes immediately, AC follows after the
                // blink-out
                self.outputs.loop_supply = true;
                self.outputs.leds = false;
                self.sequence = Some(Sequence {
                    target: RelayState::Enabled,
                    phases_left: POWER_UP_PHASES,
                    next_phase_ms: now_ms.wrapping_add(PHASE_MS),
                });
            }
            PowerTarget::Off => {
                if self.state == RelayState::Off {
                    return;
                }
                // AC drops immediately, loop supply holds until the motor
                // has spun down
                self.outputs.ac_power = false;
                self.outputs.leds = false;
                self.sequence = Some(Sequence {
                    target: RelayState::Off,
                    phases_left: POWER_DOWN_PHASES,
                    next_phase_ms: now_ms.wrapping_add(PHASE_MS),
                });
            }
        }
    }

    /// Advance time and return the levels to drive. `now_ms` may wrap.
    pub fn tick(&mut self, now_ms: u32) -> RelayOutputs {
        while let Some(seq) = self.sequence.as_mut() {
            if now_ms.wrapping_sub(seq.next_phase_ms) >= 0x8000_0000 {
                break; // next phase boundary not reached yet
            }
            seq.next_phase_ms = seq.next_phase_ms.wrapping_add(PHASE_MS);
            seq.phases_left -= 1;
            if seq.phases_left == 0 {
                let target = seq.target;
                self.sequence = None;
                self.outputs.leds = false;
                self.state = target;
                match target {
                    RelayState::Enabled => self.outputs.ac_power = true,
                    RelayState::Off => self.outputs.loop_supply = false,
                }
            } else {
                // odd phases lit, even phases dark: a steady blink
                self.outputs.leds = seq.phases_left % 2 == 1;
            }
        }
        self.outputs
    }
}

impl Default for RelaySequencer {
    fn default() -> Self {
        Self::new()
    }
}
