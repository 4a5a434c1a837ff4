//! Actuation engine: command-to-physical mapping, motion compensation, and
//! mode switching.
//!
//! The engine owns the servo driver and the full actuation state (active
//! mode, committed angle, last-command sentinel), so `set_angle` and
//! `select_mode` are the only writers. Settle waits are strictly blocking;
//! callers that must not block (the HTTP handlers) run the engine on a
//! blocking task.

use std::thread;
use std::time::Duration;

use hardware::ServoInterface;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calibration::{CalibrationMode, MIN_PULSE_US};

/// Settle time after a normal move, long enough for full-range travel.
const MOVE_SETTLE: Duration = Duration::from_millis(350);

/// Hold time at the overshoot position during lag compensation.
const NUDGE_HOLD: Duration = Duration::from_millis(100);

/// Settle time after driving to the zero baseline.
const RESET_SETTLE: Duration = Duration::from_millis(500);

/// Overshoot in degrees applied at full travel in the 180° mode. The
/// mechanism under-rotates at its extreme there; nudging past the target and
/// returning takes up the slack. Measured for this rig, not a general rule.
const NUDGE_DEG: i32 = 5;

#[derive(Error, Debug)]
pub enum ActuationError {
    #[error("servo error: {0}")]
    Servo(String),
}

/// Owns the servo and the actuation state for one rig.
pub struct ActuationEngine<S: ServoInterface> {
    servo: S,
    mode: CalibrationMode,
    command_angle: i32,
    last_command: Option<i32>,
}

impl<S: ServoInterface> ActuationEngine<S> {
    /// Bind the servo and reset it to the zero baseline.
    ///
    /// The initial binding uses the widest corrected pulse range so the servo
    /// is capable of full travel before the first mode switch.
    pub fn new(servo: S) -> Result<Self, ActuationError> {
        let mut engine = Self {
            servo,
            mode: CalibrationMode::Range90,
            command_angle: 0,
            last_command: None,
        };
        engine
            .servo
            .rebind(MIN_PULSE_US, CalibrationMode::Range180.max_pulse_us())
            .map_err(ActuationError::Servo)?;
        engine.reset_to_zero()?;
        Ok(engine)
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    pub fn command_angle(&self) -> i32 {
        self.command_angle
    }

    pub fn last_command(&self) -> Option<i32> {
        self.last_command
    }

    pub fn servo(&self) -> &S {
        &self.servo
    }

    pub fn servo_mut(&mut self) -> &mut S {
        &mut self.servo
    }

    /// Drive the servo to a command angle and block until it has settled.
    ///
    /// The request clamps to `[0, command_max]` for the active mode, then
    /// maps linearly onto the mode's physical range with truncating integer
    /// division (45° in the 90° mode commits physical 43, not 44). Repeating
    /// the last committed angle skips actuation entirely.
    ///
    /// Returns the committed (clamped) angle.
    pub fn set_angle(&mut self, requested: i32) -> Result<i32, ActuationError> {
        let committed = requested.clamp(0, self.mode.command_max());
        if self.last_command == Some(committed) {
            debug!("angle {committed}° already committed, skipping actuation");
            return Ok(committed);
        }

        let physical = committed * self.mode.physical_max() / self.mode.command_max();
        debug!(
            "actuating: command {committed}° -> physical {physical}° (mode {})",
            self.mode.command_max()
        );

        self.servo
            .write_angle(physical)
            .map_err(ActuationError::Servo)?;
        thread::sleep(MOVE_SETTLE);

        // Lag compensation, only for the 180° mode at exactly full travel.
        if self.mode == CalibrationMode::Range180 && committed == self.mode.command_max() {
            self.servo
                .write_angle(physical + NUDGE_DEG)
                .map_err(ActuationError::Servo)?;
            thread::sleep(NUDGE_HOLD);
            self.servo
                .write_angle(physical)
                .map_err(ActuationError::Servo)?;
        }

        self.command_angle = committed;
        self.last_command = Some(committed);
        Ok(committed)
    }

    /// Drive the servo to physical zero and block for a clean baseline.
    ///
    /// Clears the last-command sentinel rather than setting it to 0: after a
    /// rebind the servo may not sit at logical zero, so the next
    /// `set_angle(0)` must still actuate.
    pub fn reset_to_zero(&mut self) -> Result<(), ActuationError> {
        self.servo.write_angle(0).map_err(ActuationError::Servo)?;
        thread::sleep(RESET_SETTLE);
        self.command_angle = 0;
        self.last_command = None;
        Ok(())
    }

    /// Switch the active calibration mode.
    ///
    /// An index outside `{0, 1, 2}` changes nothing and reports the mode that
    /// stayed in effect. A valid index (including the current one) rebinds
    /// the pulse range with the mode's correction and resets to zero.
    pub fn select_mode(&mut self, requested: i32) -> Result<CalibrationMode, ActuationError> {
        let Some(mode) = CalibrationMode::from_index(requested) else {
            warn!("ignoring invalid mode index {requested}");
            return Ok(self.mode);
        };

        self.servo
            .rebind(MIN_PULSE_US, mode.max_pulse_us())
            .map_err(ActuationError::Servo)?;
        self.mode = mode;
        self.reset_to_zero()?;
        info!("mode set to {}°", mode.command_max());
        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hardware::{MockServo, ServoCommand};

    fn engine() -> ActuationEngine<MockServo> {
        let mut engine = ActuationEngine::new(MockServo::new()).unwrap();
        engine.servo_mut().clear();
        engine
    }

    #[test]
    fn startup_binds_extended_range_and_resets() {
        let engine = ActuationEngine::new(MockServo::new()).unwrap();
        assert_eq!(
            engine.servo().commands(),
            &[
                ServoCommand::Rebind {
                    min_pulse_us: 500,
                    max_pulse_us: 2430
                },
                ServoCommand::Write { angle_deg: 0 },
            ]
        );
        assert_eq!(engine.mode(), CalibrationMode::Range90);
        assert_eq!(engine.command_angle(), 0);
        assert_eq!(engine.last_command(), None);
    }

    #[test]
    fn set_angle_clamps_to_the_active_command_range() {
        let mut engine = engine();
        assert_eq!(engine.set_angle(-20).unwrap(), 0);
        assert_eq!(engine.set_angle(45).unwrap(), 45);
        assert_eq!(engine.set_angle(200).unwrap(), 90);

        engine.select_mode(1).unwrap();
        assert_eq!(engine.set_angle(500).unwrap(), 120);
    }

    #[test]
    fn linear_map_truncates() {
        let mut engine = engine();
        // Mode 0: 90 -> 87, 45 -> 43 (truncating division).
        engine.set_angle(45).unwrap();
        assert_eq!(engine.servo().last_write(), Some(43));
        engine.set_angle(90).unwrap();
        assert_eq!(engine.servo().last_write(), Some(87));
    }

    #[test]
    fn repeated_angle_actuates_once() {
        let mut engine = engine();
        engine.set_angle(50).unwrap();
        let writes_after_first = engine.servo().writes().len();
        assert_eq!(engine.set_angle(50).unwrap(), 50);
        assert_eq!(engine.servo().writes().len(), writes_after_first);
    }

    #[test]
    fn clamped_duplicate_is_also_skipped() {
        let mut engine = engine();
        engine.set_angle(90).unwrap();
        let writes_after_first = engine.servo().writes().len();
        // 200 clamps to 90, which is already committed.
        engine.set_angle(200).unwrap();
        assert_eq!(engine.servo().writes().len(), writes_after_first);
    }

    #[test]
    fn full_travel_nudge_fires_only_in_the_180_mode_at_180() {
        let mut engine = engine();

        // Not at mode 0's maximum.
        engine.set_angle(90).unwrap();
        assert_eq!(engine.servo().writes(), vec![87]);

        // Not at mode 1's maximum.
        engine.select_mode(1).unwrap();
        engine.servo_mut().clear();
        engine.set_angle(120).unwrap();
        assert_eq!(engine.servo().writes(), vec![117]);

        // Not in mode 2 short of full travel.
        engine.select_mode(2).unwrap();
        engine.servo_mut().clear();
        engine.set_angle(179).unwrap();
        assert_eq!(engine.servo().writes(), vec![179]);

        // Exactly mode 2 at 180: overshoot, hold, return.
        engine.servo_mut().clear();
        engine.set_angle(180).unwrap();
        assert_eq!(engine.servo().writes(), vec![180, 185, 180]);
    }

    #[test]
    fn mode_switch_rebinds_and_resets() {
        let mut engine = engine();
        engine.set_angle(30).unwrap();
        engine.servo_mut().clear();

        let applied = engine.select_mode(2).unwrap();
        assert_eq!(applied, CalibrationMode::Range180);
        assert_eq!(
            engine.servo().commands(),
            &[
                ServoCommand::Rebind {
                    min_pulse_us: 500,
                    max_pulse_us: 2430
                },
                ServoCommand::Write { angle_deg: 0 },
            ]
        );
        assert_eq!(engine.command_angle(), 0);
        assert_eq!(engine.last_command(), None);

        // The cleared sentinel forces the next zero command to actuate.
        engine.servo_mut().clear();
        engine.set_angle(0).unwrap();
        assert_eq!(engine.servo().writes(), vec![0]);
    }

    #[test]
    fn reselecting_the_current_mode_still_rebinds_and_resets() {
        let mut engine = engine();
        engine.set_angle(45).unwrap();
        engine.servo_mut().clear();

        engine.select_mode(0).unwrap();
        assert_eq!(
            engine.servo().commands(),
            &[
                ServoCommand::Rebind {
                    min_pulse_us: 500,
                    max_pulse_us: 2400
                },
                ServoCommand::Write { angle_deg: 0 },
            ]
        );
        assert_eq!(engine.last_command(), None);
    }

    #[test]
    fn invalid_mode_index_changes_nothing() {
        let mut engine = engine();
        engine.set_angle(45).unwrap();
        let commands_before = engine.servo().commands().len();

        for bad in [-1, 3, 5] {
            let applied = engine.select_mode(bad).unwrap();
            assert_eq!(applied, CalibrationMode::Range90);
        }

        assert_eq!(engine.servo().commands().len(), commands_before);
        assert_eq!(engine.mode(), CalibrationMode::Range90);
        assert_eq!(engine.command_angle(), 45);
        assert_eq!(engine.last_command(), Some(45));
    }
}
