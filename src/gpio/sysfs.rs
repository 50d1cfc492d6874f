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
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::result;
use std::thread;
use std::time::Duration;

use crate::gpio::Level;
use crate::user;

/// Result type returned from methods that can have `io::Error`s.
pub type Result<T> = result::Result<T, io::Error>;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Direction {
    Low,
    High,
}

pub fn pin_path(pin: u8) -> String {
    format!("/sys/class/gpio/gpio{}", pin)
}

pub fn export(pin: u8) -> Result<()> {
    // Only export if the pin isn't already exported
    if !Path::new(&pin_path(pin)).exists() {
        File::create("/sys/class/gpio/export")?.write_fmt(format_args!("{}", pin))?;
    }

    if user::is_root() {
        return Ok(());
    }

    // The symlink created by exporting a pin starts off owned by root:root. There's
    // a short delay before the group is changed to gpio, so wait for max. 1s.
    // If this isn't working, check the udev rules (/etc/udev/rules.d/99-com.rules).
    let gid_gpio = user::group_to_gid("gpio").unwrap_or(0);

    let mut counter = 0;
    while counter < 20 {
        let meta = fs::metadata(pin_path(pin))?;
        if meta.gid() == gid_gpio {
            break;
        }

        thread::sleep(Duration::from_millis(50));
        counter += 1;
    }

    Ok(())
}

pub fn unexport(pin: u8) -> Result<()> {
    // Only unexport if the pin is actually exported
    if Path::new(&pin_path(pin)).exists() {
        File::create("/sys/class/gpio/unexport")?.write_fmt(format_args!("{}", pin))?;
    }

    Ok(())
}

pub fn set_direction(pin: u8, direction: Direction) -> Result<()> {
    let b_direction: &[u8] = match direction {
        Direction::Low => b"low",
        Direction::High => b"high",
    };

    File::create(format!("{}/direction", pin_path(pin)))?.write_all(b_direction)?;

    Ok(())
}

pub fn write_value(pin: u8, level: Level) -> Result<()> {
    let b_value: &[u8] = match level {
        Level::Low => b"0",
        Level::High => b"1",
    };

    File::create(format!("{}/value", pin_path(pin)))?.write_all(b_value)?;

    Ok(())
}
