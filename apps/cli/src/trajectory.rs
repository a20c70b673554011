//! 脚本化工具轨迹
//!
//! 替代真实仿真：工具尖端沿竖直方向做正弦运动，周期性穿过地面。

use crate::settings::TrajectorySection;
use avatar_sdk::ToolPose;
use nalgebra::{Rotation3, Vector3};

#[derive(Debug, Clone, Copy)]
pub struct SineTrajectory {
    offset: f64,
    amplitude: f64,
    frequency_hz: f64,
    rotation: Rotation3<f64>,
}

impl SineTrajectory {
    pub fn new(section: &TrajectorySection, rotation: Rotation3<f64>) -> Self {
        Self {
            offset: section.offset,
            amplitude: section.amplitude,
            frequency_hz: section.frequency_hz,
            rotation,
        }
    }

    pub fn height_at(&self, t_secs: f64) -> f64 {
        self.offset + self.amplitude * (std::f64::consts::TAU * self.frequency_hz * t_secs).sin()
    }

    pub fn pose_at(&self, t_secs: f64) -> ToolPose {
        ToolPose::new(Vector3::new(0.0, self.height_at(t_secs), 0.0), self.rotation)
    }

    /// 轨迹的最低点是否在 `floor_height` 以下
    pub fn crosses(&self, floor_height: f64) -> bool {
        self.offset - self.amplitude.abs() < floor_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trajectory() -> SineTrajectory {
        SineTrajectory::new(&TrajectorySection::default(), Rotation3::identity())
    }

    #[test]
    fn test_height_follows_sine() {
        let t = trajectory();
        assert_relative_eq!(t.height_at(0.0), 0.1);
        // 0.5 Hz：0.5 s 处于波峰，1.5 s 处于波谷
        assert_relative_eq!(t.height_at(0.5), 0.6, epsilon = 1e-12);
        assert_relative_eq!(t.height_at(1.5), -0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_default_crosses_floor() {
        let t = trajectory();
        assert!(t.crosses(0.0));
        assert!(!t.crosses(-1.0));
        assert_eq!(t.pose_at(1.5).rotation, Rotation3::identity());
    }
}
