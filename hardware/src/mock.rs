//! Recording servo driver for tests and off-target runs.
//!
//! Captures every command in order so tests can assert the exact actuation
//! sequence, including rebinds and repeated writes.

use crate::ServoInterface;

/// A single command issued to the servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoCommand {
    /// Pulse-width binding was replaced.
    Rebind { min_pulse_us: u16, max_pulse_us: u16 },
    /// Servo was commanded to a physical angle.
    Write { angle_deg: i32 },
}

/// Servo driver that records commands instead of touching hardware.
#[derive(Debug, Default)]
pub struct MockServo {
    commands: Vec<ServoCommand>,
}

impl MockServo {
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands issued so far, in order.
    pub fn commands(&self) -> &[ServoCommand] {
        &self.commands
    }

    /// Just the angle writes, in order.
    pub fn writes(&self) -> Vec<i32> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                ServoCommand::Write { angle_deg } => Some(*angle_deg),
                ServoCommand::Rebind { .. } => None,
            })
            .collect()
    }

    /// The most recent angle write, if any.
    pub fn last_write(&self) -> Option<i32> {
        self.writes().last().copied()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl ServoInterface for MockServo {
    fn rebind(&mut self, min_pulse_us: u16, max_pulse_us: u16) -> Result<(), String> {
        self.commands.push(ServoCommand::Rebind {
            min_pulse_us,
            max_pulse_us,
        });
        Ok(())
    }

    fn write_angle(&mut self, angle_deg: i32) -> Result<(), String> {
        self.commands.push(ServoCommand::Write { angle_deg });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_commands_in_order() {
        let mut servo = MockServo::new();
        servo.rebind(500, 2400).unwrap();
        servo.write_angle(87).unwrap();
        servo.write_angle(0).unwrap();

        assert_eq!(
            servo.commands(),
            &[
                ServoCommand::Rebind {
                    min_pulse_us: 500,
                    max_pulse_us: 2400
                },
                ServoCommand::Write { angle_deg: 87 },
                ServoCommand::Write { angle_deg: 0 },
            ]
        );
        assert_eq!(servo.writes(), vec![87, 0]);
        assert_eq!(servo.last_write(), Some(0));
    }

    #[test]
    fn clear_empties_the_log() {
        let mut servo = MockServo::new();
        servo.write_angle(10).unwrap();
        servo.clear();
        assert!(servo.commands().is_empty());
        assert_eq!(servo.last_write(), None);
    }
}
