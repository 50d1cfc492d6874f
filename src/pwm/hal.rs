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

use embedded_hal::pwm::{self, ErrorKind, ErrorType, SetDutyCycle};

use super::{Error, Pwm};
use crate::controller::PwmOutput;

impl pwm::Error for Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// `ErrorType` trait implementation for `embedded-hal` v1.0.0.
impl ErrorType for Pwm {
    type Error = Error;
}

/// `SetDutyCycle` trait implementation for `embedded-hal` v1.0.0.
///
/// The duty cycle is expressed in timebase ticks, so with the default timebase
/// a duty cycle of 1500 is a 1500 µs pulse.
impl SetDutyCycle for Pwm {
    fn max_duty_cycle(&self) -> u16 {
        self.timebase.ticks()
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.set_level(duty)
    }
}

impl PwmOutput for Pwm {
    fn enable(&mut self) -> Result<(), Self::Error> {
        Pwm::enable(self)
    }
}
