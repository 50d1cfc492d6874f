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

//! Interface for the LED output pin.
//!
//! The status LED is driven through the `/sys/class/gpio` sysfs interface. Pins
//! are addressed by their BCM GPIO numbers, rather than their physical location
//! on the GPIO header.
//!
//! By default, a pin is unexported when its [`OutputPin`] goes out of scope. Use
//! [`OutputPin::set_reset_on_drop(false)`] to leave it configured. Note that
//! `drop` methods aren't called when a process is abnormally terminated (for
//! instance when a `SIGINT` signal isn't caught).
//!
//! ## Troubleshooting
//!
//! ### Permission denied
//!
//! Users that are part of the `gpio` group can export pins and write their
//! attributes. If you encounter a [`PermissionDenied`] error, either the current
//! user isn't a member of the `gpio` group, or udev hasn't been configured to
//! hand exported pins over to that group. Alternatively, although not
//! recommended, you can run your application with superuser privileges by using
//! `sudo`.
//!
//! [`PermissionDenied`]: enum.Error.html#variant.PermissionDenied
//! [`OutputPin`]: struct.OutputPin.html
//! [`OutputPin::set_reset_on_drop(false)`]: struct.OutputPin.html#method.set_reset_on_drop

use std::error;
use std::fmt;
use std::io;
use std::ops::Not;
use std::result;

use log::debug;

mod hal;
mod sysfs;

/// Errors that can occur when accessing a GPIO pin.
#[derive(Debug)]
pub enum Error {
    /// Permission denied when writing to the specified sysfs path.
    ///
    /// More information on possible causes for this error can be found [here].
    ///
    /// [here]: index.html#permission-denied
    PermissionDenied(String),
    /// I/O error.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::PermissionDenied(ref path) => write!(f, "Permission denied: {}", path),
            Error::Io(ref err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Result type returned from methods that can have `gpio::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Pin logic levels.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl From<bool> for Level {
    fn from(e: bool) -> Level {
        if e {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> bool {
        level == Level::High
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Level::Low => write!(f, "Low"),
            Level::High => write!(f, "High"),
        }
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

// Attach the offending path to permission errors
fn map_permission(pin: u8, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::PermissionDenied {
        Error::PermissionDenied(sysfs::pin_path(pin))
    } else {
        Error::Io(err)
    }
}

/// GPIO pin configured as output.
///
/// The pin is exported and its direction set to output-low on construction, so
/// the LED starts off.
#[derive(Debug)]
pub struct OutputPin {
    pin: u8,
    level: Level,
    reset_on_drop: bool,
}

impl OutputPin {
    /// Exports the specified BCM GPIO pin and configures it as an output,
    /// initially set to [`Low`].
    ///
    /// [`Low`]: enum.Level.html#variant.Low
    pub fn new(pin: u8) -> Result<OutputPin> {
        OutputPin::with_level(pin, Level::Low)
    }

    /// Exports the specified BCM GPIO pin and configures it as an output,
    /// initially set to `level`.
    pub fn with_level(pin: u8, level: Level) -> Result<OutputPin> {
        sysfs::export(pin).map_err(|e| map_permission(pin, e))?;

        // Writing the initial level along with the direction avoids a glitch
        let direction = match level {
            Level::Low => sysfs::Direction::Low,
            Level::High => sysfs::Direction::High,
        };
        sysfs::set_direction(pin, direction).map_err(|e| map_permission(pin, e))?;

        debug!("GPIO {} configured as output ({})", pin, level);

        Ok(OutputPin {
            pin,
            level,
            reset_on_drop: true,
        })
    }

    /// Returns the BCM GPIO pin number.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Sets the pin's output state.
    pub fn write(&mut self, level: Level) -> Result<()> {
        sysfs::write_value(self.pin, level).map_err(|e| map_permission(self.pin, e))?;
        self.level = level;

        Ok(())
    }

    /// Sets the pin's output state to [`High`].
    ///
    /// [`High`]: enum.Level.html#variant.High
    pub fn set_high(&mut self) -> Result<()> {
        self.write(Level::High)
    }

    /// Sets the pin's output state to [`Low`].
    ///
    /// [`Low`]: enum.Level.html#variant.Low
    pub fn set_low(&mut self) -> Result<()> {
        self.write(Level::Low)
    }

    /// Toggles the pin's output state between [`Low`] and [`High`].
    ///
    /// [`Low`]: enum.Level.html#variant.Low
    /// [`High`]: enum.Level.html#variant.High
    pub fn toggle(&mut self) -> Result<()> {
        self.write(!self.level)
    }

    /// Returns the last level written to the pin.
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn is_set_high(&self) -> bool {
        self.level == Level::High
    }

    pub fn is_set_low(&self) -> bool {
        self.level == Level::Low
    }

    /// Returns the value of `reset_on_drop`.
    pub fn reset_on_drop(&self) -> bool {
        self.reset_on_drop
    }

    /// When enabled, the pin is driven low and unexported when `OutputPin` goes
    /// out of scope.
    ///
    /// By default, `reset_on_drop` is set to `true`.
    pub fn set_reset_on_drop(&mut self, reset_on_drop: bool) {
        self.reset_on_drop = reset_on_drop;
    }
}

impl Drop for OutputPin {
    fn drop(&mut self) {
        if !self.reset_on_drop {
            return;
        }

        let _ = sysfs::write_value(self.pin, Level::Low);
        let _ = sysfs::unexport(self.pin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_bool() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(false), Level::Low);
        assert!(bool::from(Level::High));
        assert!(!bool::from(Level::Low));
    }

    #[test]
    fn level_not() {
        assert_eq!(!Level::High, Level::Low);
        assert_eq!(!Level::Low, Level::High);
    }

    #[test]
    fn permission_errors_carry_path() {
        let err = map_permission(12, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::PermissionDenied(ref path) if path == "/sys/class/gpio/gpio12"));

        let err = map_permission(12, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, Error::Io(_)));
    }
}
