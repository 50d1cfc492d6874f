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

//! Servo and LED controller.
//!
//! [`Controller`] owns the PWM channel driving the servo, the LED output pin and
//! a delay provider, and plays back a [`Sequence`]: the three fixed positions,
//! followed by a sweep between the minimum and maximum pulse widths that toggles
//! the LED on every step.
//!
//! The controller is generic over the `embedded-hal` traits, so it runs on the
//! sysfs-backed [`Pwm`] and [`gpio::OutputPin`], on any other HAL, or on the
//! [`sim`] backend.
//!
//! ```no_run
//! use servosweep::controller::Controller;
//! use servosweep::gpio::OutputPin;
//! use servosweep::hal::Delay;
//! use servosweep::pwm::{Channel, Polarity, Pwm, Timebase};
//! use servosweep::servo::Profile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pwm = Pwm::with_timebase(0, Channel::from_gpio(18)?, Timebase::default(), 0, Polarity::Normal, false)?;
//! let led = OutputPin::new(12)?;
//!
//! let controller = Controller::new(pwm, led, Delay::new(), Profile::default())?;
//! controller.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Pwm`]: ../pwm/struct.Pwm.html
//! [`gpio::OutputPin`]: ../gpio/struct.OutputPin.html
//! [`sim`]: ../sim/index.html

use std::convert::Infallible;
use std::error;
use std::fmt;
use std::result;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info, trace};

use crate::servo::{self, Profile};
use crate::sweep::{Phase, Sequence, Step};

/// A PWM channel that can be started after its initial duty cycle is set.
pub trait PwmOutput: SetDutyCycle {
    /// Starts the counter.
    fn enable(&mut self) -> result::Result<(), Self::Error>;
}

/// Errors that can occur while driving the servo or the LED.
#[derive(Debug)]
pub enum Error<P, L> {
    /// The servo profile is invalid.
    Profile(servo::Error),
    /// The PWM channel's period isn't the profile's period in 1 µs ticks.
    TickMismatch {
        /// Ticks per period reported by the PWM channel.
        ticks: u16,
        /// Period of the profile in microseconds.
        period_us: u32,
    },
    /// The PWM channel returned an error.
    Pwm(P),
    /// The LED pin returned an error.
    Led(L),
}

impl<P: fmt::Display, L: fmt::Display> fmt::Display for Error<P, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Profile(ref err) => write!(f, "{}", err),
            Error::TickMismatch { ticks, period_us } => write!(
                f,
                "PWM period of {} ticks doesn't match a {} µs period in 1 µs ticks",
                ticks, period_us
            ),
            Error::Pwm(ref err) => write!(f, "PWM error: {}", err),
            Error::Led(ref err) => write!(f, "LED error: {}", err),
        }
    }
}

impl<P: fmt::Debug + fmt::Display, L: fmt::Debug + fmt::Display> error::Error for Error<P, L> {}

impl<P, L> From<servo::Error> for Error<P, L> {
    fn from(err: servo::Error) -> Error<P, L> {
        Error::Profile(err)
    }
}

/// Result type returned from methods that can have `controller::Error`s.
pub type Result<T, P, L> = result::Result<T, Error<P, L>>;

/// Drives a servo and a status LED.
pub struct Controller<P, L, D> {
    pwm: P,
    led: L,
    delay: D,
    sequence: Sequence,
    phase: Option<Phase>,
}

impl<P, L, D> Controller<P, L, D>
where
    P: PwmOutput,
    L: OutputPin,
    D: DelayNs,
{
    /// Constructs a new `Controller`.
    ///
    /// Sets the duty cycle to the profile's minimum pulse width, enables the PWM
    /// channel and turns the LED off.
    ///
    /// Step levels are written in microseconds, so the PWM channel must count
    /// in 1 µs ticks: its `max_duty_cycle` has to equal the profile's period.
    pub fn new(
        mut pwm: P,
        mut led: L,
        delay: D,
        profile: Profile,
    ) -> Result<Controller<P, L, D>, P::Error, L::Error> {
        let sequence = Sequence::new(profile)?;

        let ticks = pwm.max_duty_cycle();
        if u32::from(ticks) != profile.period_us {
            return Err(Error::TickMismatch {
                ticks,
                period_us: profile.period_us,
            });
        }

        let level = profile.level(profile.min_us);
        pwm.set_duty_cycle(level).map_err(Error::Pwm)?;
        pwm.enable().map_err(Error::Pwm)?;
        led.set_low().map_err(Error::Led)?;

        debug!("PWM enabled at level {}, LED off", level);

        Ok(Controller {
            pwm,
            led,
            delay,
            sequence,
            phase: None,
        })
    }

    /// Returns the servo profile.
    pub fn profile(&self) -> &Profile {
        self.sequence.profile()
    }

    /// Returns the sequence, positioned after the last executed step.
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Programs the step's level, waits for its dwell time, then writes the
    /// LED state if the step carries one.
    pub fn apply(&mut self, step: &Step) -> Result<(), P::Error, L::Error> {
        match step.phase {
            Phase::Hold => info!("Holding at {} µs for {:?}", step.pulse_us, step.dwell),
            phase if self.phase != Some(phase) => {
                info!("Sweep {} from {} µs", phase, step.pulse_us)
            }
            _ => {}
        }
        self.phase = Some(step.phase);

        trace!("{} {} µs (level {})", step.phase, step.pulse_us, step.level);

        self.pwm.set_duty_cycle(step.level).map_err(Error::Pwm)?;
        wait(&mut self.delay, step.dwell);

        if let Some(on) = step.led {
            self.led.set_state(PinState::from(on)).map_err(Error::Led)?;
        }

        Ok(())
    }

    /// Executes the next `steps` steps of the sequence.
    pub fn run_steps(&mut self, steps: usize) -> Result<(), P::Error, L::Error> {
        for _ in 0..steps {
            let step = self.next_step();
            self.apply(&step)?;
        }

        Ok(())
    }

    /// Executes the sequence forever.
    ///
    /// `run` only returns when the PWM channel or the LED pin fails.
    pub fn run(mut self) -> Result<Infallible, P::Error, L::Error> {
        loop {
            let step = self.next_step();
            self.apply(&step)?;
        }
    }

    /// Releases the PWM channel, the LED pin and the delay provider.
    pub fn into_parts(self) -> (P, L, D) {
        (self.pwm, self.led, self.delay)
    }

    fn next_step(&mut self) -> Step {
        self.sequence.next_step()
    }
}

// DelayNs takes u32 arguments, so long dwell times are split into chunks
fn wait<D: DelayNs>(delay: &mut D, dwell: Duration) {
    let mut ms = dwell.as_millis();
    while ms > 0 {
        let chunk = ms.min(u128::from(u32::MAX)) as u32;
        delay.delay_ms(chunk);
        ms -= u128::from(chunk);
    }

    let ns = dwell.subsec_nanos() % 1_000_000;
    if ns > 0 {
        delay.delay_ns(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sim::{Event, SimDelay, SimPin, SimPwm, Trace};

    type SimController = Controller<SimPwm, SimPin, SimDelay>;

    fn controller(trace: &Trace) -> SimController {
        Controller::new(
            SimPwm::new(trace, 20_000),
            SimPin::new(trace),
            SimDelay::new(trace),
            Profile::default(),
        )
        .unwrap()
    }

    #[test]
    fn initialization_sets_minimum_then_enables() {
        let trace = Trace::new();
        let _controller = controller(&trace);

        assert_eq!(
            trace.events(),
            vec![Event::Duty(500), Event::Enable, Event::Led(false)]
        );
    }

    #[test]
    fn holds_before_sweep() {
        let trace = Trace::new();
        let mut controller = controller(&trace);

        controller.run_steps(3).unwrap();

        assert_eq!(trace.duty_levels(), vec![500, 2400, 1470, 500]);
        assert_eq!(trace.elapsed(), Duration::from_millis(15_000));
        assert_eq!(trace.led_states(), vec![false]);
    }

    #[test]
    fn first_sweep_steps() {
        let trace = Trace::new();
        let mut controller = controller(&trace);

        controller.run_steps(3 + 5).unwrap();

        assert_eq!(
            trace.duty_levels(),
            vec![500, 2400, 1470, 500, 500, 505, 510, 515, 520]
        );
        // First entry is the LED being switched off during initialization
        assert_eq!(
            trace.led_states(),
            vec![false, true, false, true, false, true]
        );
        assert_eq!(trace.elapsed(), Duration::from_millis(15_050));
    }

    #[test]
    fn sixth_sweep_step_reaches_525() {
        let trace = Trace::new();
        let mut controller = controller(&trace);

        controller.run_steps(3 + 6).unwrap();

        assert_eq!(&trace.duty_levels()[1..], &[2400, 1470, 500, 500, 505, 510, 515, 520, 525]);
    }

    #[test]
    fn each_sweep_step_sets_duty_waits_then_toggles() {
        let trace = Trace::new();
        let mut controller = controller(&trace);

        controller.run_steps(4).unwrap();

        let events = trace.events();
        assert_eq!(
            &events[events.len() - 3..],
            &[
                Event::Duty(500),
                Event::Delay(Duration::from_millis(10)),
                Event::Led(true)
            ]
        );
    }

    #[test]
    fn led_state_follows_step_parity() {
        let trace = Trace::new();
        let mut controller = controller(&trace);
        let n = 1000;

        controller.run_steps(3 + n).unwrap();

        let states = trace.led_states();
        assert_eq!(states.len(), n + 1);
        assert_eq!(*states.last().unwrap(), n % 2 == 1);
        assert_eq!(controller.sequence().sweep_steps(), n as u64);
    }

    #[test]
    fn invalid_profile_is_rejected() {
        let trace = Trace::new();
        let profile = Profile {
            step_us: 0,
            ..Profile::default()
        };

        let result = Controller::new(
            SimPwm::new(&trace, 20_000),
            SimPin::new(&trace),
            SimDelay::new(&trace),
            profile,
        );

        assert!(matches!(result, Err(Error::Profile(_))));
        assert!(trace.events().is_empty());
    }

    #[test]
    fn coarser_tick_is_rejected() {
        let trace = Trace::new();

        // 10 µs ticks: 2000 ticks per 20 ms period
        let result = Controller::new(
            SimPwm::new(&trace, 2000),
            SimPin::new(&trace),
            SimDelay::new(&trace),
            Profile::default(),
        );

        assert!(matches!(
            result,
            Err(Error::TickMismatch {
                ticks: 2000,
                period_us: 20_000
            })
        ));
        assert!(trace.events().is_empty());
    }

    #[test]
    fn long_dwell_is_split() {
        let trace = Trace::new();
        let mut delay = SimDelay::new(&trace);

        wait(&mut delay, Duration::from_micros(5_000_250));

        assert_eq!(
            trace.events(),
            vec![
                Event::Delay(Duration::from_millis(5000)),
                Event::Delay(Duration::from_micros(250))
            ]
        );
    }

    #[test]
    fn into_parts_returns_peripherals() {
        let trace = Trace::new();
        let controller = controller(&trace);

        let (pwm, _led, _delay) = controller.into_parts();
        assert!(pwm.is_enabled());
    }
}
