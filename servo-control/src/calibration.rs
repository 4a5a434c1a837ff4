//! Mode calibration table.
//!
//! Exactly three calibration modes exist; they are the system's entire
//! addressable configuration space, so they are modeled as a closed enum
//! rather than a runtime-extensible list. Each mode maps a user-facing
//! command range `[0, command_max]` onto a measured physical range and
//! carries an optional pulse-width correction for mechanical lag at full
//! travel.

/// Shortest pulse the servo accepts, in microseconds.
pub const MIN_PULSE_US: u16 = 500;

/// Longest uncorrected pulse the servo accepts, in microseconds. Modes with
/// a pulse correction extend this bound when they are active.
pub const MAX_PULSE_US: u16 = 2400;

/// One of the three fixed calibration modes, ordered by increasing range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationMode {
    /// 90° command range.
    Range90,
    /// 120° command range.
    Range120,
    /// 180° command range, with lag compensation at full travel.
    Range180,
}

impl CalibrationMode {
    pub const ALL: [CalibrationMode; 3] = [
        CalibrationMode::Range90,
        CalibrationMode::Range120,
        CalibrationMode::Range180,
    ];

    /// Look up a mode by its index. Defined only for `{0, 1, 2}`.
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(CalibrationMode::Range90),
            1 => Some(CalibrationMode::Range120),
            2 => Some(CalibrationMode::Range180),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            CalibrationMode::Range90 => 0,
            CalibrationMode::Range120 => 1,
            CalibrationMode::Range180 => 2,
        }
    }

    /// Upper bound of the user-facing command range (inclusive, lower bound 0).
    pub const fn command_max(self) -> i32 {
        match self {
            CalibrationMode::Range90 => 90,
            CalibrationMode::Range120 => 120,
            CalibrationMode::Range180 => 180,
        }
    }

    /// Upper bound of the true actuation range this mode maps onto.
    pub const fn physical_max(self) -> i32 {
        match self {
            CalibrationMode::Range90 => 87,
            CalibrationMode::Range120 => 117,
            CalibrationMode::Range180 => 180,
        }
    }

    /// Extra microseconds added to the maximum pulse width while this mode is
    /// active. Zero for modes without mechanical-lag compensation.
    pub const fn pulse_correction_us(self) -> u16 {
        match self {
            CalibrationMode::Range90 | CalibrationMode::Range120 => 0,
            CalibrationMode::Range180 => 30,
        }
    }

    /// Corrected maximum pulse width for this mode's binding.
    pub const fn max_pulse_us(self) -> u16 {
        MAX_PULSE_US + self.pulse_correction_us()
    }
}
