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

//! Simulated peripherals.
//!
//! The `sim` module provides stand-ins for the PWM channel, the LED pin and the
//! delay provider. Instead of touching hardware they append [`Event`]s to a
//! shared [`Trace`], and the delay provider advances a simulated clock rather
//! than blocking. This makes it possible to run a [`Controller`] on any host and
//! inspect exactly what it would have done.
//!
//! The peripherals share their trace through `Rc`, so they can't be sent to
//! another thread.
//!
//! ```
//! use servosweep::controller::Controller;
//! use servosweep::servo::Profile;
//! use servosweep::sim::{SimDelay, SimPin, SimPwm, Trace};
//!
//! let trace = Trace::new();
//! let mut controller = Controller::new(
//!     SimPwm::new(&trace, 20_000),
//!     SimPin::new(&trace),
//!     SimDelay::new(&trace),
//!     Profile::default(),
//! )
//! .unwrap();
//!
//! controller.run_steps(3).unwrap();
//! assert_eq!(trace.duty_levels(), vec![500, 2400, 1470, 500]);
//! ```
//!
//! [`Controller`]: ../controller/struct.Controller.html

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin, StatefulOutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::controller::PwmOutput;

/// Something a simulated peripheral did.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Event {
    /// A duty cycle was programmed.
    Duty(u16),
    /// The PWM channel was enabled.
    Enable,
    /// The LED pin was written.
    Led(bool),
    /// The delay provider was asked to wait.
    Delay(Duration),
}

#[derive(Debug, Default)]
struct Inner {
    events: Vec<Event>,
    elapsed: Duration,
}

/// Shared, ordered record of simulated peripheral activity.
#[derive(Debug, Default, Clone)]
pub struct Trace {
    inner: Rc<RefCell<Inner>>,
}

impl Trace {
    /// Constructs a new, empty `Trace`.
    pub fn new() -> Trace {
        Trace::default()
    }

    fn record(&self, event: Event) {
        let mut inner = self.inner.borrow_mut();

        if let Event::Delay(duration) = event {
            inner.elapsed += duration;
        }

        inner.events.push(event);
    }

    /// Returns every event recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.inner.borrow().events.clone()
    }

    /// Returns the programmed duty cycles, in order.
    pub fn duty_levels(&self) -> Vec<u16> {
        self.inner
            .borrow()
            .events
            .iter()
            .filter_map(|event| match *event {
                Event::Duty(level) => Some(level),
                _ => None,
            })
            .collect()
    }

    /// Returns the LED states written, in order.
    pub fn led_states(&self) -> Vec<bool> {
        self.inner
            .borrow()
            .events
            .iter()
            .filter_map(|event| match *event {
                Event::Led(on) => Some(on),
                _ => None,
            })
            .collect()
    }

    /// Returns the total simulated time spent in delays.
    pub fn elapsed(&self) -> Duration {
        self.inner.borrow().elapsed
    }

    /// Discards all recorded events and resets the simulated clock.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();

        inner.events.clear();
        inner.elapsed = Duration::ZERO;
    }
}

/// Simulated PWM channel.
#[derive(Debug)]
pub struct SimPwm {
    trace: Trace,
    max_duty: u16,
    duty: u16,
    enabled: bool,
}

impl SimPwm {
    /// Constructs a new `SimPwm` with the specified number of ticks per period.
    pub fn new(trace: &Trace, max_duty: u16) -> SimPwm {
        SimPwm {
            trace: trace.clone(),
            max_duty,
            duty: 0,
            enabled: false,
        }
    }

    /// Returns the last programmed duty cycle.
    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        // A counter compare value above the period keeps the output high
        self.duty = duty.min(self.max_duty);
        self.trace.record(Event::Duty(self.duty));

        Ok(())
    }
}

impl PwmOutput for SimPwm {
    fn enable(&mut self) -> Result<(), Self::Error> {
        self.enabled = true;
        self.trace.record(Event::Enable);

        Ok(())
    }
}

/// Simulated output pin.
#[derive(Debug)]
pub struct SimPin {
    trace: Trace,
    high: bool,
}

impl SimPin {
    /// Constructs a new `SimPin`, initially low.
    pub fn new(trace: &Trace) -> SimPin {
        SimPin {
            trace: trace.clone(),
            high: false,
        }
    }

    fn write(&mut self, high: bool) {
        self.high = high;
        self.trace.record(Event::Led(high));
    }
}

impl digital::ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);

        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);

        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// Simulated delay provider.
///
/// Every call is recorded as a single [`Event::Delay`] and returns immediately.
#[derive(Debug)]
pub struct SimDelay {
    trace: Trace,
}

impl SimDelay {
    /// Constructs a new `SimDelay`.
    pub fn new(trace: &Trace) -> SimDelay {
        SimDelay {
            trace: trace.clone(),
        }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.trace
            .record(Event::Delay(Duration::from_nanos(u64::from(ns))));
    }

    fn delay_us(&mut self, us: u32) {
        self.trace
            .record(Event::Delay(Duration::from_micros(u64::from(us))));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.trace
            .record(Event::Delay(Duration::from_millis(u64::from(ms))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_is_saturated_to_period() {
        let trace = Trace::new();
        let mut pwm = SimPwm::new(&trace, 20_000);

        pwm.set_duty_cycle(25_000).unwrap();

        assert_eq!(pwm.duty(), 20_000);
        assert_eq!(trace.duty_levels(), vec![20_000]);
    }

    #[test]
    fn pin_toggle_records_writes() {
        let trace = Trace::new();
        let mut pin = SimPin::new(&trace);

        pin.toggle().unwrap();
        pin.toggle().unwrap();

        assert_eq!(trace.led_states(), vec![true, false]);
        assert!(pin.is_set_low().unwrap());
    }

    #[test]
    fn delays_advance_simulated_clock() {
        let trace = Trace::new();
        let mut delay = SimDelay::new(&trace);

        delay.delay_ms(5000);
        delay.delay_us(10);
        delay.delay_ns(500);

        assert_eq!(trace.elapsed(), Duration::from_nanos(5_000_010_500));
        assert_eq!(trace.events().len(), 3);

        trace.clear();
        assert_eq!(trace.elapsed(), Duration::ZERO);
        assert!(trace.events().is_empty());
    }
}
