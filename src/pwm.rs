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

//! Interface for the PWM peripheral.
//!
//! The PWM channel driving the servo is controlled through the `/sys/class/pwm`
//! sysfs interface.
//!
//! ## PWM channels
//!
//! The BCM283x SoC supports two hardware PWM channels. Even-numbered PWM-capable
//! pins (BCM GPIO 12 and 18) are routed to channel 0, odd-numbered ones (BCM GPIO
//! 13 and 19) to channel 1. [`Channel::from_gpio`] performs that mapping. Both
//! channels are disabled by default. Add `dtoverlay=pwm` to `/boot/config.txt` to
//! enable channel 0 on GPIO 18, or `dtoverlay=pwm-2chan` to enable both channels.
//!
//! ## Timebase
//!
//! Servo pulse widths are expressed in counter ticks. A [`Timebase`] describes the
//! counter the same way a microcontroller's PWM slice is configured: an input
//! clock, an integer clock divider and a wrap value. The default timebase divides
//! a 125 MHz clock by 125, which gives a 1 µs tick, and wraps at 19999, which gives
//! a 20 ms (50 Hz) period. Levels written with [`Pwm::set_level`] are converted
//! to nanoseconds before they're handed to the kernel.
//!
//! ## Troubleshooting
//!
//! ### Permission denied
//!
//! If [`Pwm::with_timebase`] returns an `io::ErrorKind::PermissionDenied` error,
//! make sure `/sys/class/pwm` and all of its subdirectories are owned by
//! `root:gpio`, and the current user is a member of the `gpio` group.
//! Alternatively, you can launch your application using `sudo`.
//!
//! ### Not found
//!
//! If [`Pwm::with_timebase`] returns an `io::ErrorKind::NotFound` error, you may
//! have forgotten to enable the selected PWM channel.

use std::error;
use std::fmt;
use std::io;
use std::result;
use std::time::Duration;

use log::debug;

mod hal;
mod sysfs;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Errors that can occur when accessing the PWM peripheral.
#[derive(Debug)]
pub enum Error {
    /// IO error.
    Io(io::Error),
    /// The GPIO pin can't be routed to a PWM channel.
    PinNotPwmCapable(u8),
    /// The clock, divider or wrap value can't produce a usable period.
    InvalidTimebase,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Io(ref err) => write!(f, "IO error: {}", err),
            Error::PinNotPwmCapable(pin) => write!(f, "Pin {} is not PWM capable", pin),
            Error::InvalidTimebase => write!(f, "Invalid PWM timebase"),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Result type returned from methods that can have `pwm::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// PWM channels.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Channel {
    Pwm0 = 0,
    Pwm1 = 1,
}

impl Channel {
    /// Returns the channel the specified BCM GPIO pin is routed to.
    pub fn from_gpio(pin: u8) -> Result<Channel> {
        match pin {
            12 | 18 => Ok(Channel::Pwm0),
            13 | 19 => Ok(Channel::Pwm1),
            _ => Err(Error::PinNotPwmCapable(pin)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Channel::Pwm0 => write!(f, "Pwm0"),
            Channel::Pwm1 => write!(f, "Pwm1"),
        }
    }
}

/// Output polarities.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Polarity {
    Normal,
    Inverse,
}

/// PWM counter configuration.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Timebase {
    input_clock_hz: u32,
    divider: u16,
    wrap: u16,
}

impl Default for Timebase {
    /// 125 MHz / 125, wrapping at 19999: 1 µs ticks and a 20 ms period.
    fn default() -> Timebase {
        Timebase {
            input_clock_hz: 125_000_000,
            divider: 125,
            wrap: 19_999,
        }
    }
}

impl Timebase {
    /// Constructs a new `Timebase`.
    ///
    /// `wrap` is the last counter value before the counter resets, so a period
    /// lasts `wrap + 1` ticks.
    pub fn new(input_clock_hz: u32, divider: u16, wrap: u16) -> Result<Timebase> {
        if input_clock_hz == 0 || divider == 0 || wrap == u16::MAX {
            return Err(Error::InvalidTimebase);
        }

        Ok(Timebase {
            input_clock_hz,
            divider,
            wrap,
        })
    }

    pub fn input_clock_hz(&self) -> u32 {
        self.input_clock_hz
    }

    pub fn divider(&self) -> u16 {
        self.divider
    }

    pub fn wrap(&self) -> u16 {
        self.wrap
    }

    /// Returns the number of ticks in a single period.
    pub fn ticks(&self) -> u16 {
        self.wrap + 1
    }

    /// Converts a tick count to nanoseconds.
    pub fn ticks_to_nanos(&self, ticks: u32) -> u64 {
        u64::from(ticks) * u64::from(self.divider) * NANOS_PER_SEC / u64::from(self.input_clock_hz)
    }

    /// Converts nanoseconds to a tick count, rounding down.
    pub fn nanos_to_ticks(&self, nanos: u64) -> u64 {
        nanos.saturating_mul(u64::from(self.input_clock_hz))
            / (u64::from(self.divider) * NANOS_PER_SEC)
    }

    /// Returns the duration of a single tick.
    pub fn tick(&self) -> Duration {
        Duration::from_nanos(self.ticks_to_nanos(1))
    }

    /// Returns the duration of a single period.
    pub fn period(&self) -> Duration {
        Duration::from_nanos(self.ticks_to_nanos(u32::from(self.ticks())))
    }
}

fn as_nanos(duration: Duration) -> u64 {
    u64::from(duration.subsec_nanos())
        .saturating_add(duration.as_secs().saturating_mul(NANOS_PER_SEC))
}

/// Provides access to a hardware PWM channel.
///
/// Before using `Pwm`, make sure the selected PWM channel has been configured
/// and activated. More information can be found [here].
///
/// [here]: index.html
#[derive(Debug)]
pub struct Pwm {
    chip: u8,
    channel: Channel,
    timebase: Timebase,
}

impl Pwm {
    /// Constructs a new `Pwm` on `pwmchip0` with the default [`Timebase`].
    ///
    /// The period is programmed, the level is set to 0 and the channel is left
    /// disabled.
    pub fn new(channel: Channel) -> Result<Pwm> {
        Pwm::with_timebase(0, channel, Timebase::default(), 0, Polarity::Normal, false)
    }

    /// Constructs a new `Pwm` using the specified settings.
    ///
    /// `chip` selects `/sys/class/pwm/pwmchip{chip}`.
    ///
    /// `timebase` determines the period and the duration of a single tick.
    ///
    /// `level` is the initial pulse width in ticks. Levels beyond the period are
    /// saturated to the period.
    ///
    /// `polarity` configures the active logic level as either high ([`Normal`]) or low ([`Inverse`]).
    ///
    /// `enabled` immediately enables PWM on the selected channel.
    ///
    /// [`Normal`]: enum.Polarity.html
    /// [`Inverse`]: enum.Polarity.html
    pub fn with_timebase(
        chip: u8,
        channel: Channel,
        timebase: Timebase,
        level: u16,
        polarity: Polarity,
        enabled: bool,
    ) -> Result<Pwm> {
        sysfs::export(chip, channel as u8)?;

        let pwm = Pwm {
            chip,
            channel,
            timebase,
        };

        // Always reset "enable" to 0. The sysfs pwm interface has a bug where a previous
        // export may have left "enable" as 1 after unexporting. On the next export,
        // "enable" is still set to 1, even though the channel isn't enabled.
        let _ = pwm.disable();

        // Set pulse width to 0 first in case the new period is shorter than the current pulse width
        let _ = sysfs::set_pulse_width(chip, channel as u8, 0);

        pwm.set_period(timebase.period())?;
        pwm.set_level(level)?;
        pwm.set_polarity(polarity)?;
        if enabled {
            pwm.enable()?;
        }

        debug!(
            "pwmchip{} {}: period {:?}, tick {:?}, level {}",
            chip,
            channel,
            timebase.period(),
            timebase.tick(),
            level
        );

        Ok(pwm)
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn timebase(&self) -> &Timebase {
        &self.timebase
    }

    /// Returns the configured period.
    pub fn period(&self) -> Result<Duration> {
        Ok(Duration::from_nanos(sysfs::period(
            self.chip,
            self.channel as u8,
        )?))
    }

    /// Sets the period.
    ///
    /// The specified period must be longer than or equal to the pulse width.
    pub fn set_period(&self, period: Duration) -> Result<()> {
        sysfs::set_period(self.chip, self.channel as u8, as_nanos(period))?;

        Ok(())
    }

    /// Returns the configured pulse width.
    pub fn pulse_width(&self) -> Result<Duration> {
        Ok(Duration::from_nanos(sysfs::pulse_width(
            self.chip,
            self.channel as u8,
        )?))
    }

    /// Sets the pulse width.
    ///
    /// The pulse width must be shorter than or equal to the period.
    pub fn set_pulse_width(&self, pulse_width: Duration) -> Result<()> {
        sysfs::set_pulse_width(self.chip, self.channel as u8, as_nanos(pulse_width))?;

        Ok(())
    }

    /// Returns the configured pulse width in ticks.
    pub fn level(&self) -> Result<u16> {
        let ticks = self
            .timebase
            .nanos_to_ticks(sysfs::pulse_width(self.chip, self.channel as u8)?);

        Ok(ticks.min(u64::from(self.timebase.ticks())) as u16)
    }

    /// Sets the pulse width in ticks.
    ///
    /// Levels beyond the period are saturated to the period, which keeps the
    /// output active for the entire cycle.
    pub fn set_level(&self, level: u16) -> Result<()> {
        let level = level.min(self.timebase.ticks());

        sysfs::set_pulse_width(
            self.chip,
            self.channel as u8,
            self.timebase.ticks_to_nanos(u32::from(level)),
        )?;

        Ok(())
    }

    /// Returns the configured polarity.
    pub fn polarity(&self) -> Result<Polarity> {
        Ok(sysfs::polarity(self.chip, self.channel as u8)?)
    }

    /// Sets the polarity.
    ///
    /// By default, `polarity` is set to [`Normal`].
    ///
    /// [`Normal`]: enum.Polarity.html
    pub fn set_polarity(&self, polarity: Polarity) -> Result<()> {
        sysfs::set_polarity(self.chip, self.channel as u8, polarity)?;

        Ok(())
    }

    /// Checks whether PWM is currently enabled on the selected channel.
    pub fn enabled(&self) -> Result<bool> {
        Ok(sysfs::enabled(self.chip, self.channel as u8)?)
    }

    /// Enables PWM on the selected channel.
    pub fn enable(&self) -> Result<()> {
        sysfs::set_enabled(self.chip, self.channel as u8, true)?;

        Ok(())
    }

    /// Disables PWM on the selected channel.
    pub fn disable(&self) -> Result<()> {
        sysfs::set_enabled(self.chip, self.channel as u8, false)?;

        Ok(())
    }
}

impl Drop for Pwm {
    fn drop(&mut self) {
        let _ = sysfs::set_enabled(self.chip, self.channel as u8, false);
        let _ = sysfs::unexport(self.chip, self.channel as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timebase_gives_servo_period() {
        let timebase = Timebase::default();

        assert_eq!(timebase.wrap(), 19_999);
        assert_eq!(timebase.ticks(), 20_000);
        assert_eq!(timebase.tick(), Duration::from_micros(1));
        assert_eq!(timebase.period(), Duration::from_millis(20));
    }

    #[test]
    fn ticks_convert_to_nanoseconds() {
        let timebase = Timebase::default();

        assert_eq!(timebase.ticks_to_nanos(500), 500_000);
        assert_eq!(timebase.ticks_to_nanos(2400), 2_400_000);
        assert_eq!(timebase.nanos_to_ticks(1_470_000), 1470);
        assert_eq!(timebase.nanos_to_ticks(1_470_999), 1470);
    }

    #[test]
    fn custom_timebase() {
        // 19.2 MHz / 192 = 100 kHz, 10 µs ticks
        let timebase = Timebase::new(19_200_000, 192, 1999).unwrap();

        assert_eq!(timebase.tick(), Duration::from_micros(10));
        assert_eq!(timebase.period(), Duration::from_millis(20));
    }

    #[test]
    fn invalid_timebase_is_rejected() {
        assert!(matches!(Timebase::new(0, 125, 19_999), Err(Error::InvalidTimebase)));
        assert!(matches!(Timebase::new(125_000_000, 0, 19_999), Err(Error::InvalidTimebase)));
        assert!(matches!(Timebase::new(125_000_000, 1, u16::MAX), Err(Error::InvalidTimebase)));
    }

    #[test]
    fn gpio_to_channel() {
        assert_eq!(Channel::from_gpio(12).unwrap(), Channel::Pwm0);
        assert_eq!(Channel::from_gpio(18).unwrap(), Channel::Pwm0);
        assert_eq!(Channel::from_gpio(13).unwrap(), Channel::Pwm1);
        assert_eq!(Channel::from_gpio(19).unwrap(), Channel::Pwm1);
        assert!(matches!(Channel::from_gpio(22), Err(Error::PinNotPwmCapable(22))));
    }
}
