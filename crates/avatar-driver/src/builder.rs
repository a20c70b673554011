//! Builder 模式实现
//!
//! 提供链式构造 [`HapticDevice`] 的便捷方式。

use crate::device::{CompanionInfo, HapticDevice};
use crate::error::HapticError;
use crate::pipeline::LoopConfig;
use crate::portal::PortalDescriptor;
use crate::state::ToolPose;

/// HapticDevice Builder（链式构造）
///
/// # Example
///
/// ```
/// use avatar_driver::{CompanionInfo, HapticDeviceBuilder, LoopConfig};
///
/// let device = HapticDeviceBuilder::new()
///     .identity("left-hand")
///     .port_name("COM3")
///     .companion(CompanionInfo::new("COM4", "IBOX-17"))
///     .loop_config(LoopConfig {
///         damping: 2.5,
///         ..Default::default()
///     })
///     .build()
///     .unwrap();
/// assert_eq!(device.handle().identity, "left-hand");
/// ```
#[derive(Debug, Default)]
pub struct HapticDeviceBuilder {
    /// 设备标识（默认使用端口名）
    identity: Option<String>,
    /// 通信端口名
    port_name: Option<String>,
    companion: Option<CompanionInfo>,
    loop_config: Option<LoopConfig>,
    initial_pose: Option<ToolPose>,
}

impl HapticDeviceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn port_name(mut self, port_name: impl Into<String>) -> Self {
        self.port_name = Some(port_name.into());
        self
    }

    /// 设置伴随设备（IBox）
    pub fn companion(mut self, companion: CompanionInfo) -> Self {
        self.companion = Some(companion);
        self
    }

    pub fn loop_config(mut self, config: LoopConfig) -> Self {
        self.loop_config = Some(config);
        self
    }

    /// 第一次动画步之前设备线程使用的工具位姿
    pub fn initial_pose(mut self, pose: ToolPose) -> Self {
        self.initial_pose = Some(pose);
        self
    }

    /// 从 Portal 描述填充端口名，并以安装姿态作为初始工具旋转
    pub fn portal(mut self, portal: &PortalDescriptor) -> Self {
        let mut pose = self.initial_pose.unwrap_or_default();
        pose.rotation = portal.base_rotation();
        self.initial_pose = Some(pose);
        self.port_name = Some(portal.com_port.clone());
        self
    }

    /// 构建设备（尚未初始化）
    ///
    /// 缺少端口名或配置非法时返回 `InvalidConfig`。
    pub fn build(self) -> Result<HapticDevice, HapticError> {
        let port_name = self
            .port_name
            .filter(|p| !p.is_empty())
            .ok_or_else(|| HapticError::InvalidConfig("port_name is required".to_string()))?;

        let config = self.loop_config.unwrap_or_default();
        config.validate()?;

        let identity = self.identity.unwrap_or_else(|| port_name.clone());

        Ok(HapticDevice::new(
            identity,
            port_name,
            self.companion,
            config,
            self.initial_pose.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::DeviceState;
    use nalgebra::{Rotation3, Vector3};

    #[test]
    fn test_builder_requires_port() {
        assert!(matches!(
            HapticDeviceBuilder::new().build(),
            Err(HapticError::InvalidConfig(_))
        ));
        assert!(HapticDeviceBuilder::new().port_name("").build().is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let device = HapticDeviceBuilder::new().port_name("COM3").build().unwrap();
        assert_eq!(device.handle().identity, "COM3");
        assert_eq!(device.handle().port_id, None);
        assert_eq!(device.state(), DeviceState::Uninitialized);
        assert_eq!(device.config(), &LoopConfig::default());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = HapticDeviceBuilder::new()
            .port_name("COM3")
            .loop_config(LoopConfig {
                target_period_us: 0,
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(HapticError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_from_portal() {
        let portal = PortalDescriptor {
            id: 4,
            rail: 1,
            rail_position_mm: 250.0,
            flip_angle_deg: 180.0,
            tilt_angle_deg: 0.0,
            com_port: "/dev/ttyUSB1".to_string(),
        };
        let device = HapticDeviceBuilder::new()
            .initial_pose(ToolPose::new(Vector3::new(0.0, 5.0, 0.0), Rotation3::identity()))
            .portal(&portal)
            .build()
            .unwrap();
        assert_eq!(device.handle().port_name, "/dev/ttyUSB1");
    }
}
