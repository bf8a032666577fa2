//! Injected collaborator interfaces: robot hardware and time.
//!
//! Both are consumed by the scheduler and the modules but implemented
//! elsewhere (a NAO backend, a simulator shim). The scheduler treats them as
//! opaque: it never interprets sensor contents and only uses the clock for
//! cycle-time accounting and cadence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One batch of sensor readings, as delivered by the hardware backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Measured joint angles, in the backend's joint order.
    pub joint_angles: Vec<f32>,
    /// Gyroscope rates around x/y/z.
    pub gyro: [f32; 3],
    /// Accelerometer readings along x/y/z.
    pub accelerometer: [f32; 3],
    /// Button and bumper states.
    pub switches: Vec<bool>,
}

/// One batch of actuator commands sent back to the hardware.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// Target joint angles, in the backend's joint order.
    pub joint_angles: Vec<f32>,
    /// Per-joint stiffness in `[0, 1]`.
    pub stiffness: Vec<f32>,
}

/// Narrow interface to the physical (or simulated) robot.
pub trait RobotInterface: Send + Sync {
    /// Reads the most recent sensor batch.
    fn read_sensors(&self) -> SensorFrame;

    /// Applies an actuator command batch.
    fn apply_commands(&self, command: &ActuatorCommand);
}

/// Hardware stub that returns default sensors and discards commands.
///
/// Used in tests and dry runs where no backend is attached.
#[derive(Debug, Default)]
pub struct NullRobot;

impl RobotInterface for NullRobot {
    fn read_sensors(&self) -> SensorFrame {
        SensorFrame::default()
    }

    fn apply_commands(&self, _command: &ActuatorCommand) {}
}

/// Monotonic time source used for cycle-time measurement.
pub trait Clock: Send + Sync {
    /// The current monotonic instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock advanced by hand, for deterministic tests and simulation.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Starts a manual clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        *self.offset.lock() += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Convenience constructor for the common test setup.
#[must_use]
pub fn null_hardware() -> Arc<dyn RobotInterface> {
    Arc::new(NullRobot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_on_demand() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);
        clock.advance(Duration::from_millis(12));
        assert_eq!(clock.now() - t0, Duration::from_millis(12));
    }

    #[test]
    fn null_robot_reads_defaults() {
        let robot = NullRobot;
        assert_eq!(robot.read_sensors(), SensorFrame::default());
    }
}
