//! servosweep drives a hobby servo and a status LED through the Linux PWM and
//! GPIO sysfs interfaces.
//!
//! On start-up the servo is moved to its maximum, midpoint and minimum
//! positions, each held for five seconds. It then sweeps back and forth between
//! the two extremes in 5 µs increments every 10 ms, toggling the LED on every
//! step, until the process is stopped.
//!
//! The sequencing logic in [`controller`] and [`sweep`] only relies on the
//! `embedded-hal` v1.0.0 `SetDutyCycle`, `OutputPin` and `DelayNs` traits. The
//! sysfs-backed [`pwm::Pwm`] and [`gpio::OutputPin`] implement them for the
//! Raspberry Pi, and the [`sim`] module implements them for tests and
//! development hosts.
//!
//! Log output goes through the `log` facade. Install a logger in your
//! application to see phase transitions (`info`), peripheral setup (`debug`)
//! and individual steps (`trace`).

// Used by rustdoc to link other crates to servosweep's docs
#![doc(html_root_url = "https://docs.rs/servosweep/0.1.0")]

pub mod controller;
pub mod gpio;
pub mod hal;
pub mod pwm;
pub mod servo;
pub mod sim;
pub mod sweep;
mod user;
