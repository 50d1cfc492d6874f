// Copyright (c) 2017-2024 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! The control sequence as an unbounded iterator.
//!
//! [`Sequence`] yields one [`Step`] per duty update: first the three fixed
//! positions (maximum, midpoint, minimum), then an alternating ascending and
//! descending sweep that never ends. Consumers that drive hardware iterate
//! forever, while tests take a bounded prefix with `take`.

use std::fmt;
use std::time::Duration;

use crate::servo::{self, Profile};

/// Sequence phases.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Phase {
    /// One of the three fixed positions.
    Hold,
    /// Sweep from the minimum towards the maximum pulse width.
    Ascend,
    /// Sweep from the maximum towards the minimum pulse width.
    Descend,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Phase::Hold => write!(f, "Hold"),
            Phase::Ascend => write!(f, "Ascend"),
            Phase::Descend => write!(f, "Descend"),
        }
    }
}

/// A single duty update and what follows it.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Step {
    pub phase: Phase,
    /// Requested pulse width in microseconds.
    pub pulse_us: u32,
    /// PWM level programmed for `pulse_us`.
    pub level: u16,
    /// Time to wait after the duty update.
    pub dwell: Duration,
    /// New LED state written after the dwell, or `None` if the LED is left alone.
    pub led: Option<bool>,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
enum Cursor {
    Hold(usize),
    Ascend,
    Descend,
}

/// Unbounded iterator over the control steps for a [`Profile`].
///
/// `next` always returns `Some`.
#[derive(Debug, Clone)]
pub struct Sequence {
    profile: Profile,
    cursor: Cursor,
    pulse_us: u32,
    led: bool,
    elapsed: Duration,
    sweep_steps: u64,
}

impl Sequence {
    /// Constructs a new `Sequence`, with the LED initially off.
    ///
    /// Returns an error if `profile` doesn't pass [`Profile::validate`].
    pub fn new(profile: Profile) -> servo::Result<Sequence> {
        Sequence::with_initial_led(profile, false)
    }

    /// Constructs a new `Sequence` starting from the specified LED state.
    pub fn with_initial_led(profile: Profile, led: bool) -> servo::Result<Sequence> {
        // A zero step or inverted limits would stall a ramp forever
        profile.validate()?;

        Ok(Sequence {
            profile,
            cursor: Cursor::Hold(0),
            pulse_us: profile.max_us,
            led,
            elapsed: Duration::ZERO,
            sweep_steps: 0,
        })
    }

    /// Returns the profile this sequence was built from.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Returns the total dwell time of all steps yielded so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the number of sweep steps yielded so far.
    pub fn sweep_steps(&self) -> u64 {
        self.sweep_steps
    }

    /// Returns the LED state after the last yielded step.
    pub fn led(&self) -> bool {
        self.led
    }

    fn hold_target(&self, index: usize) -> u32 {
        match index {
            0 => self.profile.max_us,
            1 => self.profile.mid_us,
            _ => self.profile.min_us,
        }
    }

    fn sweep_step(&mut self, phase: Phase) -> Step {
        let pulse_us = self.pulse_us;

        // Widths stay unsigned; running past either limit ends the ramp
        // instead of wrapping around.
        let next = match phase {
            Phase::Descend => self
                .pulse_us
                .checked_sub(self.profile.step_us)
                .filter(|&pulse| pulse >= self.profile.min_us),
            _ => self
                .pulse_us
                .checked_add(self.profile.step_us)
                .filter(|&pulse| pulse <= self.profile.max_us),
        };

        match (phase, next) {
            (_, Some(pulse)) => self.pulse_us = pulse,
            (Phase::Descend, None) => {
                self.cursor = Cursor::Ascend;
                self.pulse_us = self.profile.min_us;
            }
            (_, None) => {
                self.cursor = Cursor::Descend;
                self.pulse_us = self.profile.max_us;
            }
        }

        self.led = !self.led;
        self.sweep_steps += 1;

        Step {
            phase,
            pulse_us,
            level: self.profile.level(pulse_us),
            dwell: self.profile.step_delay,
            led: Some(self.led),
        }
    }

    /// Advances the sequence and returns the next step.
    ///
    /// Equivalent to `next`, without the `Option`.
    pub fn next_step(&mut self) -> Step {
        let step = match self.cursor {
            Cursor::Hold(index) => {
                let pulse_us = self.hold_target(index);

                self.cursor = if index < 2 {
                    Cursor::Hold(index + 1)
                } else {
                    self.pulse_us = self.profile.min_us;
                    Cursor::Ascend
                };

                Step {
                    phase: Phase::Hold,
                    pulse_us,
                    level: self.profile.level(pulse_us),
                    dwell: self.profile.hold,
                    led: None,
                }
            }
            Cursor::Ascend => self.sweep_step(Phase::Ascend),
            Cursor::Descend => self.sweep_step(Phase::Descend),
        };

        self.elapsed += step.dwell;

        step
    }
}

impl Iterator for Sequence {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        Some(self.next_step())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAMP: usize = 381;

    fn pulses(sequence: Sequence, skip: usize, take: usize) -> Vec<u32> {
        sequence.skip(skip).take(take).map(|step| step.pulse_us).collect()
    }

    #[test]
    fn holds_visit_max_mid_min() {
        let steps: Vec<Step> = Sequence::new(Profile::default()).unwrap().take(3).collect();

        assert_eq!(
            steps.iter().map(|s| s.pulse_us).collect::<Vec<_>>(),
            vec![2400, 1470, 500]
        );

        for step in &steps {
            assert_eq!(step.phase, Phase::Hold);
            assert_eq!(step.dwell, Duration::from_millis(5000));
            assert_eq!(step.led, None);
        }
    }

    #[test]
    fn first_sweep_steps_follow_the_holds() {
        let mut sequence = Sequence::new(Profile::default()).unwrap();
        let steps: Vec<Step> = sequence.by_ref().take(8).collect();

        assert_eq!(
            steps.iter().map(|s| s.pulse_us).collect::<Vec<_>>(),
            vec![2400, 1470, 500, 500, 505, 510, 515, 520]
        );
        assert_eq!(
            steps[3..].iter().map(|s| s.led).collect::<Vec<_>>(),
            vec![Some(true), Some(false), Some(true), Some(false), Some(true)]
        );
        assert_eq!(
            sequence.elapsed(),
            Duration::from_millis(15_000 + 5 * 10)
        );
    }

    #[test]
    fn ascend_covers_full_range() {
        let ascend = pulses(Sequence::new(Profile::default()).unwrap(), 3, RAMP);

        assert_eq!(ascend.first(), Some(&500));
        assert_eq!(ascend.last(), Some(&2400));
        assert!(ascend.windows(2).all(|w| w[1] == w[0] + 5));
    }

    #[test]
    fn descend_follows_ascend() {
        let steps: Vec<Step> = Sequence::new(Profile::default())
            .unwrap()
            .skip(3 + RAMP)
            .take(RAMP + 1)
            .collect();

        assert!(steps[..RAMP].iter().all(|s| s.phase == Phase::Descend));
        assert_eq!(steps[0].pulse_us, 2400);
        assert_eq!(steps[RAMP - 1].pulse_us, 500);
        assert!(steps[..RAMP]
            .windows(2)
            .all(|w| w[1].pulse_us + 5 == w[0].pulse_us));

        // Back to ascending
        assert_eq!(steps[RAMP].phase, Phase::Ascend);
        assert_eq!(steps[RAMP].pulse_us, 500);
    }

    #[test]
    fn led_toggles_once_per_sweep_step() {
        let mut sequence = Sequence::with_initial_led(Profile::default(), true).unwrap();
        let n = 2 * RAMP + 17;

        for step in sequence.by_ref().take(3 + n) {
            assert_eq!(step.led.is_some(), step.phase != Phase::Hold);
        }

        assert_eq!(sequence.sweep_steps(), n as u64);
        assert_eq!(sequence.led(), true ^ (n % 2 == 1));
    }

    #[test]
    fn sweep_never_ends() {
        let mut sequence = Sequence::new(Profile::default()).unwrap();

        for _ in 0..(10 * RAMP) {
            assert!(sequence.next().is_some());
        }

        assert_eq!(sequence.size_hint(), (usize::MAX, None));
    }

    #[test]
    fn uneven_step_stops_within_limits() {
        let profile = Profile::new(500, 1000, 1012, 5).unwrap();
        let ascend = pulses(Sequence::new(profile).unwrap(), 3, 103);

        assert_eq!(ascend.last(), Some(&1010));
        assert!(ascend.iter().all(|&p| (500..=1012).contains(&p)));

        let descend = pulses(Sequence::new(profile).unwrap(), 3 + 103, 103);

        assert_eq!(descend.first(), Some(&1012));
        assert_eq!(descend.last(), Some(&502));
    }

    #[test]
    fn small_minimum_does_not_wrap() {
        let profile = Profile::new(2, 4, 12, 5).unwrap();
        let widths = pulses(Sequence::new(profile).unwrap(), 3, 6);

        assert_eq!(widths, vec![2, 7, 12, 12, 7, 2]);
    }

    #[test]
    fn zero_step_profile_is_rejected() {
        let profile = Profile {
            step_us: 0,
            ..Profile::default()
        };

        assert!(matches!(
            Sequence::new(profile),
            Err(servo::Error::InvalidProfile(_))
        ));
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let profile = Profile {
            min_us: 2400,
            mid_us: 1470,
            max_us: 500,
            ..Profile::default()
        };

        assert!(Sequence::with_initial_led(profile, true).is_err());
    }
}
