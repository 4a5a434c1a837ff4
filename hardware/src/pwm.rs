//! Raspberry Pi hardware-PWM servo driver.
//!
//! Drives a hobby servo on one of the Pi's two hardware PWM channels at 50 Hz.
//! A physical angle in `[0, 180]` degrees maps linearly into the currently
//! bound pulse-width range; angles above 180 clamp to 180, matching the
//! hobby-servo convention. Don't power the servo from the Pi's GPIO header.

use std::time::Duration;

use rppal::pwm::{Channel, Polarity, Pwm};
use thiserror::Error;
use tracing::{debug, info, warn};

/// 50 Hz servo refresh period.
const PWM_PERIOD: Duration = Duration::from_millis(20);

/// Full mechanical travel the pulse range spans.
const FULL_TRAVEL_DEG: i32 = 180;

#[derive(Error, Debug)]
pub enum PwmServoError {
    #[error("PWM peripheral error: {0}")]
    Pwm(#[from] rppal::pwm::Error),

    #[error("invalid PWM channel {0} (expected 0 or 1)")]
    InvalidChannel(u8),
}

/// Hardware-PWM servo driver.
///
/// Disables the PWM channel on drop by default so the servo stops holding
/// torque when the process exits.
pub struct PwmServo {
    pwm: Pwm,
    min_pulse_us: u16,
    max_pulse_us: u16,
    disable_on_drop: bool,
}

impl PwmServo {
    /// Bind a PWM channel (0 = GPIO18, 1 = GPIO19) with the given pulse-width
    /// bounds and park the servo at the low end of its travel.
    pub fn bind(channel: u8, min_pulse_us: u16, max_pulse_us: u16) -> Result<Self, PwmServoError> {
        let channel = match channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(PwmServoError::InvalidChannel(other)),
        };

        let pwm = Pwm::with_period(
            channel,
            PWM_PERIOD,
            Duration::from_micros(min_pulse_us as u64),
            Polarity::Normal,
            true,
        )?;

        info!("servo bound: pulse range {min_pulse_us}..{max_pulse_us} µs at 50 Hz");

        Ok(Self {
            pwm,
            min_pulse_us,
            max_pulse_us,
            disable_on_drop: true,
        })
    }

    /// Keep the PWM channel enabled (and the servo holding position) after drop.
    pub fn set_disable_on_drop(&mut self, disable: bool) {
        self.disable_on_drop = disable;
    }

    /// Replace the pulse-width bounds. The channel is disabled while the
    /// bounds change so only one binding is ever active.
    pub fn rebind_pulse_range(
        &mut self,
        min_pulse_us: u16,
        max_pulse_us: u16,
    ) -> Result<(), PwmServoError> {
        self.pwm.disable()?;
        self.min_pulse_us = min_pulse_us;
        self.max_pulse_us = max_pulse_us;
        self.pwm
            .set_pulse_width(Duration::from_micros(min_pulse_us as u64))?;
        self.pwm.enable()?;
        info!("servo rebound: pulse range {min_pulse_us}..{max_pulse_us} µs");
        Ok(())
    }

    /// Command the servo to a physical angle in degrees.
    pub fn write_angle_deg(&mut self, angle_deg: i32) -> Result<(), PwmServoError> {
        let pulse_us = pulse_for_angle(self.min_pulse_us, self.max_pulse_us, angle_deg);
        self.pwm.set_pulse_width(Duration::from_micros(pulse_us))?;
        debug!("servo write: {angle_deg}° -> {pulse_us} µs");
        Ok(())
    }
}

impl crate::ServoInterface for PwmServo {
    fn rebind(&mut self, min_pulse_us: u16, max_pulse_us: u16) -> Result<(), String> {
        PwmServo::rebind_pulse_range(self, min_pulse_us, max_pulse_us)
            .map_err(|e| format!("servo rebind failed: {e}"))
    }

    fn write_angle(&mut self, angle_deg: i32) -> Result<(), String> {
        PwmServo::write_angle_deg(self, angle_deg).map_err(|e| format!("servo write failed: {e}"))
    }
}

impl Drop for PwmServo {
    fn drop(&mut self) {
        if self.disable_on_drop {
            if let Err(e) = self.pwm.disable() {
                warn!("failed to disable PWM channel on drop: {e}");
            }
        }
    }
}

/// Map an angle in degrees to a pulse width inside the bound range.
/// Angles outside `[0, 180]` clamp to the nearest bound.
fn pulse_for_angle(min_pulse_us: u16, max_pulse_us: u16, angle_deg: i32) -> u64 {
    let clamped = angle_deg.clamp(0, FULL_TRAVEL_DEG) as u64;
    let span = (max_pulse_us - min_pulse_us) as u64;
    min_pulse_us as u64 + clamped * span / FULL_TRAVEL_DEG as u64
}
