//! Servo hardware drivers.
//!
//! The control layer drives servos through [`ServoInterface`], which keeps it
//! independent of the PWM backend. [`pwm::PwmServo`] is the Raspberry Pi
//! hardware-PWM driver; [`mock::MockServo`] records the command stream for
//! tests and off-target runs.

pub mod mock;

#[cfg(target_os = "linux")]
pub mod pwm;

pub use mock::{MockServo, ServoCommand};

#[cfg(target_os = "linux")]
pub use pwm::{PwmServo, PwmServoError};

/// Interface to a single servo channel.
///
/// Only one pulse-width binding may be active at a time; [`rebind`](Self::rebind)
/// releases the previous one before applying the new bounds.
pub trait ServoInterface {
    /// Release the current pulse-width binding and re-bind the channel with
    /// the given bounds in microseconds.
    fn rebind(&mut self, min_pulse_us: u16, max_pulse_us: u16) -> Result<(), String>;

    /// Command the servo to a physical angle in degrees. Fire-and-forget:
    /// there is no position feedback, so success means the command was issued.
    fn write_angle(&mut self, angle_deg: i32) -> Result<(), String>;
}

impl<T: ServoInterface + ?Sized> ServoInterface for Box<T> {
    fn rebind(&mut self, min_pulse_us: u16, max_pulse_us: u16) -> Result<(), String> {
        (**self).rebind(min_pulse_us, max_pulse_us)
    }

    fn write_angle(&mut self, angle_deg: i32) -> Result<(), String> {
        (**self).write_angle(angle_deg)
    }
}
