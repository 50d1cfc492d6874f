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

// servo_sweep_sim.rs - Runs the servo sequence against simulated peripherals
// and prints what the PWM channel and LED would have seen.
//
// No hardware is needed. Delays are simulated, so the 15 s of fixed positions
// and a complete sweep cycle finish instantly.

use servosweep::controller::Controller;
use servosweep::servo::Profile;
use servosweep::sim::{Event, SimDelay, SimPin, SimPwm, Trace};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let profile = Profile::default();
    let trace = Trace::new();

    let mut controller = Controller::new(
        SimPwm::new(&trace, 20_000),
        SimPin::new(&trace),
        SimDelay::new(&trace),
        profile,
    )?;

    // Fixed positions, followed by one ascending and one descending ramp.
    let ramp = profile.steps_per_ramp().unwrap_or(0) as usize;
    let steps = 3 + 2 * ramp;
    controller.run_steps(steps)?;

    for event in trace.events().iter().take(16) {
        match *event {
            Event::Duty(level) => println!("duty  {:>5} µs", level),
            Event::Enable => println!("enable"),
            Event::Led(on) => println!("led   {}", if on { "on" } else { "off" }),
            Event::Delay(duration) => println!("wait  {:?}", duration),
        }
    }

    println!("...");
    println!(
        "{} duty updates, {} LED writes, {:?} simulated",
        trace.duty_levels().len(),
        trace.led_states().len(),
        trace.elapsed()
    );

    Ok(())
}
