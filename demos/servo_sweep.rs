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

// servo_sweep.rs - Moves a servo through its fixed positions, then sweeps it
// back and forth while blinking an LED, using hardware PWM.
//
// Calibrate your servo beforehand, and change the profile below to fall within
// your servo's safe limits to prevent potential damage. Don't power the servo
// directly from the Pi's GPIO header. If you're powering the servo using a
// separate power supply, remember to connect the grounds of the Pi and the
// power supply together.
//
// The sweep runs until a SIGINT (Ctrl-C) or SIGTERM signal is caught. The PWM
// channel is disabled and both pins are released when the peripherals go out
// of scope.

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use simple_signal::Signal;

use servosweep::controller::Controller;
use servosweep::gpio::OutputPin;
use servosweep::hal::Delay;
use servosweep::pwm::{Channel, Polarity, Pwm, Timebase};
use servosweep::servo::Profile;

// BCM GPIO 18 (physical pin 12) is routed to PWM channel 0.
const GPIO_SERVO: u8 = 18;
// BCM GPIO 12 (physical pin 32).
const GPIO_LED: u8 = 12;

fn main() -> Result<(), Box<dyn Error>> {
    let profile = Profile::default();

    // 125 MHz / 125 = 1 MHz, wrapping at 19999: 1 µs ticks, 20 ms period.
    let pwm = Pwm::with_timebase(
        0,
        Channel::from_gpio(GPIO_SERVO)?,
        Timebase::default(),
        0,
        Polarity::Normal,
        false,
    )?;
    let led = OutputPin::new(GPIO_LED)?;

    let mut controller = Controller::new(pwm, led, Delay::new(), profile)?;

    let running = Arc::new(AtomicBool::new(true));

    simple_signal::set_handler(&[Signal::Int, Signal::Term], {
        let running = running.clone();
        move |_| {
            running.store(false, Ordering::SeqCst);
        }
    });

    // A fixed-position hold blocks for 5 s, so a signal may take that long to
    // be noticed.
    while running.load(Ordering::SeqCst) {
        controller.run_steps(1)?;
    }

    println!(
        "Stopped after {} sweep steps ({:?})",
        controller.sequence().sweep_steps(),
        controller.sequence().elapsed()
    );

    Ok(())
}
