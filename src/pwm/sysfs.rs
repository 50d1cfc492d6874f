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

use std::fs;
use std::fs::File;
use std::io;
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::result;
use std::thread;
use std::time::Duration;

use crate::pwm::Polarity;
use crate::user;

/// Result type returned from methods that can have `io::Error`s.
pub type Result<T> = result::Result<T, io::Error>;

fn chip_path(chip: u8) -> String {
    format!("/sys/class/pwm/pwmchip{}", chip)
}

fn channel_path(chip: u8, channel: u8, attribute: &str) -> String {
    if attribute.is_empty() {
        format!("/sys/class/pwm/pwmchip{}/pwm{}", chip, channel)
    } else {
        format!("/sys/class/pwm/pwmchip{}/pwm{}/{}", chip, channel, attribute)
    }
}

// Check file permissions and group ID
fn check_permissions(path: &str, gid: u32) -> bool {
    if let Ok(metadata) = fs::metadata(path) {
        if metadata.permissions().mode() != 0o040_770 && metadata.permissions().mode() != 0o100_770
        {
            return false;
        }

        if metadata.gid() == gid {
            return true;
        }
    }

    false
}

pub fn export(chip: u8, channel: u8) -> Result<()> {
    // Only export if the channel isn't already exported
    if !Path::new(&channel_path(chip, channel, "")).exists() {
        File::create(format!("{}/export", chip_path(chip)))?
            .write_fmt(format_args!("{}", channel))?;
    }

    if user::is_root() {
        return Ok(());
    }

    // Wait 1s max for udev to hand the new attributes over to the gpio group.
    let gid_gpio = user::group_to_gid("gpio").unwrap_or(0);

    let paths = &[
        channel_path(chip, channel, ""),
        channel_path(chip, channel, "period"),
        channel_path(chip, channel, "duty_cycle"),
        channel_path(chip, channel, "polarity"),
        channel_path(chip, channel, "enable"),
    ];

    let mut counter = 0;
    'counter: while counter < 25 {
        for path in paths {
            if !check_permissions(path, gid_gpio) {
                // This should normally be set within the first ~30ms.
                thread::sleep(Duration::from_millis(40));
                counter += 1;

                continue 'counter;
            }
        }

        break;
    }

    Ok(())
}

pub fn unexport(chip: u8, channel: u8) -> Result<()> {
    // Only unexport if the channel is actually exported
    if Path::new(&channel_path(chip, channel, "")).exists() {
        File::create(format!("{}/unexport", chip_path(chip)))?
            .write_fmt(format_args!("{}", channel))?;
    }

    Ok(())
}

fn read_u64(path: &str) -> Result<u64> {
    let value = fs::read_to_string(path)?;

    Ok(value.trim().parse().unwrap_or(0))
}

pub fn period(chip: u8, channel: u8) -> Result<u64> {
    read_u64(&channel_path(chip, channel, "period"))
}

pub fn set_period(chip: u8, channel: u8, period: u64) -> Result<()> {
    File::create(channel_path(chip, channel, "period"))?.write_fmt(format_args!("{}", period))?;

    Ok(())
}

pub fn pulse_width(chip: u8, channel: u8) -> Result<u64> {
    // The sysfs PWM interface specifies the duty cycle in nanoseconds, which
    // means it's actually the pulse width.
    read_u64(&channel_path(chip, channel, "duty_cycle"))
}

pub fn set_pulse_width(chip: u8, channel: u8, pulse_width: u64) -> Result<()> {
    File::create(channel_path(chip, channel, "duty_cycle"))?
        .write_fmt(format_args!("{}", pulse_width))?;

    Ok(())
}

pub fn polarity(chip: u8, channel: u8) -> Result<Polarity> {
    let polarity = fs::read_to_string(channel_path(chip, channel, "polarity"))?;

    match polarity.trim() {
        "normal" => Ok(Polarity::Normal),
        _ => Ok(Polarity::Inverse),
    }
}

pub fn set_polarity(chip: u8, channel: u8, polarity: Polarity) -> Result<()> {
    let b_polarity: &[u8] = match polarity {
        Polarity::Normal => b"normal",
        Polarity::Inverse => b"inversed",
    };

    File::create(channel_path(chip, channel, "polarity"))?.write_all(b_polarity)?;

    Ok(())
}

pub fn enabled(chip: u8, channel: u8) -> Result<bool> {
    let enabled = fs::read_to_string(channel_path(chip, channel, "enable"))?;

    match enabled.trim() {
        "0" => Ok(false),
        _ => Ok(true),
    }
}

pub fn set_enabled(chip: u8, channel: u8, enabled: bool) -> Result<()> {
    File::create(channel_path(chip, channel, "enable"))?
        .write_fmt(format_args!("{}", enabled as u8))
        .map_err(|e| {
            if e.kind() == io::ErrorKind::InvalidInput {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Make sure you have set a period before enabling PWM",
                )
            } else {
                e
            }
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_paths() {
        assert_eq!(channel_path(0, 1, ""), "/sys/class/pwm/pwmchip0/pwm1");
        assert_eq!(
            channel_path(2, 0, "duty_cycle"),
            "/sys/class/pwm/pwmchip2/pwm0/duty_cycle"
        );
        assert_eq!(chip_path(2), "/sys/class/pwm/pwmchip2");
    }
}
