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

//! Servo limits, timing and the pulse-to-level mapping.
//!
//! A hobby servo reads its commanded angle from the width of the high pulse in
//! a 50 Hz PWM signal. The constants in this module describe a typical micro
//! servo: 500 µs corresponds to roughly 0°, 1470 µs to 90° and 2400 µs to 180°.
//!
//! Calibrate your servo beforehand, and adjust [`Profile`] to fall within its
//! safe limits to prevent potential damage.

use std::error;
use std::fmt;
use std::result;
use std::time::Duration;

/// PWM period in microseconds (20 ms, 50 Hz).
pub const PERIOD_US: u32 = 20_000;

/// Pulse width for the ~0° position.
pub const SERVO_MIN_US: u32 = 500;
/// Pulse width for the ~90° position.
pub const SERVO_MID_US: u32 = 1470;
/// Pulse width for the ~180° position.
pub const SERVO_MAX_US: u32 = 2400;

/// Pulse width increment between two sweep steps.
pub const STEP_US: u32 = 5;
/// Delay after each sweep step, in milliseconds.
pub const STEP_DELAY_MS: u64 = 10;
/// Dwell time for each fixed position, in milliseconds.
pub const HOLD_MS: u64 = 5000;

/// Errors that can occur when validating a [`Profile`].
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Error {
    /// The profile's limits or step size are inconsistent.
    InvalidProfile(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::InvalidProfile(reason) => write!(f, "Invalid servo profile: {}", reason),
        }
    }
}

impl error::Error for Error {}

/// Result type returned from methods that can have `servo::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Converts a pulse width in microseconds to a PWM level.
///
/// With a 1 µs tick, the level equals the pulse width. Widths longer than the
/// period are saturated to [`PERIOD_US`], which keeps the output high for the
/// entire period instead of programming an out-of-range value.
pub fn pulse_to_level(pulse_us: u32) -> u16 {
    saturate(pulse_us, PERIOD_US)
}

#[inline]
fn saturate(pulse_us: u32, period_us: u32) -> u16 {
    // Periods above u16::MAX ticks can't be programmed anyway
    pulse_us.min(period_us).min(u32::from(u16::MAX)) as u16
}

/// Pulse limits and timing for a single servo program.
///
/// `Profile::default()` returns the values of the module-level constants.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Profile {
    pub min_us: u32,
    pub mid_us: u32,
    pub max_us: u32,
    pub step_us: u32,
    pub period_us: u32,
    /// Dwell time for each of the three fixed positions.
    pub hold: Duration,
    /// Dwell time for each sweep step.
    pub step_delay: Duration,
}

impl Default for Profile {
    fn default() -> Profile {
        Profile {
            min_us: SERVO_MIN_US,
            mid_us: SERVO_MID_US,
            max_us: SERVO_MAX_US,
            step_us: STEP_US,
            period_us: PERIOD_US,
            hold: Duration::from_millis(HOLD_MS),
            step_delay: Duration::from_millis(STEP_DELAY_MS),
        }
    }
}

impl Profile {
    /// Constructs a new `Profile` with the specified pulse widths, and the
    /// default period and timing.
    pub fn new(min_us: u32, mid_us: u32, max_us: u32, step_us: u32) -> Result<Profile> {
        let profile = Profile {
            min_us,
            mid_us,
            max_us,
            step_us,
            ..Profile::default()
        };

        profile.validate()?;

        Ok(profile)
    }

    /// Replaces the dwell times.
    pub fn with_timing(mut self, hold: Duration, step_delay: Duration) -> Profile {
        self.hold = hold;
        self.step_delay = step_delay;

        self
    }

    /// Checks the limits are ordered, the step is non-zero and the maximum
    /// pulse width fits within the period.
    pub fn validate(&self) -> Result<()> {
        if self.min_us > self.mid_us {
            return Err(Error::InvalidProfile("minimum pulse width exceeds midpoint"));
        }

        if self.mid_us > self.max_us {
            return Err(Error::InvalidProfile("midpoint exceeds maximum pulse width"));
        }

        if self.step_us == 0 {
            return Err(Error::InvalidProfile("step size is zero"));
        }

        if self.max_us > self.period_us {
            return Err(Error::InvalidProfile("maximum pulse width exceeds period"));
        }

        Ok(())
    }

    /// Converts a pulse width to a PWM level, saturating at this profile's period.
    pub fn level(&self, pulse_us: u32) -> u16 {
        saturate(pulse_us, self.period_us)
    }

    /// Number of steps in a single ascending or descending ramp, or `None` if
    /// the limits are inverted or the step size is zero.
    pub fn steps_per_ramp(&self) -> Option<u32> {
        self.max_us
            .checked_sub(self.min_us)?
            .checked_div(self.step_us)
            .map(|steps| steps + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_within_period_passes_through() {
        for w in [0, 1, SERVO_MIN_US, SERVO_MID_US, SERVO_MAX_US, 19_999, PERIOD_US] {
            assert_eq!(u32::from(pulse_to_level(w)), w);
        }
    }

    #[test]
    fn pulse_beyond_period_saturates() {
        for w in [PERIOD_US + 1, 25_000, 65_535, 65_536, u32::MAX] {
            assert_eq!(u32::from(pulse_to_level(w)), PERIOD_US);
        }
    }

    #[test]
    fn pulse_to_level_is_monotonic_and_idempotent() {
        let mut previous = 0;
        for w in (0..30_000).step_by(7) {
            let level = pulse_to_level(w);
            assert!(level >= previous);
            assert_eq!(pulse_to_level(u32::from(level)), level);
            previous = level;
        }
    }

    #[test]
    fn default_profile_matches_constants() {
        let profile = Profile::default();

        assert_eq!(profile.min_us, 500);
        assert_eq!(profile.mid_us, 1470);
        assert_eq!(profile.max_us, 2400);
        assert_eq!(profile.step_us, 5);
        assert_eq!(profile.hold, Duration::from_millis(5000));
        assert_eq!(profile.step_delay, Duration::from_millis(10));
        assert_eq!(profile.steps_per_ramp(), Some(381));
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn invalid_profiles_are_rejected() {
        assert!(Profile::new(1500, 1000, 2000, 5).is_err());
        assert!(Profile::new(500, 2500, 2000, 5).is_err());
        assert!(Profile::new(500, 1000, 2000, 0).is_err());
        assert!(Profile::new(500, 1000, 25_000, 5).is_err());
        assert!(Profile::new(1000, 1500, 2000, 10).is_ok());
    }

    #[test]
    fn steps_per_ramp_of_invalid_profile() {
        let zero_step = Profile {
            step_us: 0,
            ..Profile::default()
        };
        let inverted = Profile {
            min_us: 2400,
            max_us: 500,
            ..Profile::default()
        };

        assert_eq!(zero_step.steps_per_ramp(), None);
        assert_eq!(inverted.steps_per_ramp(), None);
    }

    #[test]
    fn profile_level_uses_own_period() {
        let profile = Profile {
            period_us: 3000,
            ..Profile::default()
        };

        assert_eq!(profile.level(2400), 2400);
        assert_eq!(profile.level(3500), 3000);
    }
}
