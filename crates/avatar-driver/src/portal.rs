//! Portal 注册表
//!
//! 每个 Portal 槽位对应导轨上的一个安装位置和一个通信端口。
//! 设备初始化时按端口名查找 Portal id，查不到即为 `PortNotFound`。

use crate::error::HapticError;
use nalgebra::{Rotation3, Vector3};
use std::fmt;

/// Portal 标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub u32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "portal#{}", self.0)
    }
}

/// 端口名 → Portal id 解析
pub trait PortalRegistry {
    fn resolve_port(&self, name: &str) -> Option<PortId>;
}

impl<R: PortalRegistry + ?Sized> PortalRegistry for &R {
    fn resolve_port(&self, name: &str) -> Option<PortId> {
        (**self).resolve_port(name)
    }
}

/// 单个 Portal 槽位描述
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortalDescriptor {
    pub id: u32,
    /// 所在导轨编号
    pub rail: u32,
    /// 导轨上的位置（毫米）
    pub rail_position_mm: f64,
    /// 翻转角（度，绕 X 轴）
    pub flip_angle_deg: f64,
    /// 倾斜角（度，绕 Z 轴）
    pub tilt_angle_deg: f64,
    /// 通信端口名（如 `COM3`、`/dev/ttyUSB0`）
    pub com_port: String,
}

impl PortalDescriptor {
    /// 安装姿态 `Rx(flip) · Rz(tilt)`
    ///
    /// 可作为工具旋转的初值。
    pub fn base_rotation(&self) -> Rotation3<f64> {
        let flip = Rotation3::from_axis_angle(&Vector3::x_axis(), self.flip_angle_deg.to_radians());
        let tilt = Rotation3::from_axis_angle(&Vector3::z_axis(), self.tilt_angle_deg.to_radians());
        flip * tilt
    }

    pub fn port_id(&self) -> PortId {
        PortId(self.id)
    }
}

/// 内存中的 Portal 注册表
#[derive(Debug, Default, Clone)]
pub struct PortalManager {
    portals: Vec<PortalDescriptor>,
}

impl PortalManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个 Portal
    ///
    /// id 或端口名重复时返回 `InvalidConfig`。
    pub fn add_portal(&mut self, portal: PortalDescriptor) -> Result<PortId, HapticError> {
        if let Some(existing) = self
            .portals
            .iter()
            .find(|p| p.id == portal.id || p.com_port == portal.com_port)
        {
            return Err(HapticError::InvalidConfig(format!(
                "portal {} ({}) conflicts with portal {} ({})",
                portal.id, portal.com_port, existing.id, existing.com_port
            )));
        }
        let id = portal.port_id();
        self.portals.push(portal);
        Ok(id)
    }

    pub fn portal(&self, id: PortId) -> Option<&PortalDescriptor> {
        self.portals.iter().find(|p| p.id == id.0)
    }

    pub fn portals(&self) -> &[PortalDescriptor] {
        &self.portals
    }

    pub fn len(&self) -> usize {
        self.portals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portals.is_empty()
    }
}

impl PortalRegistry for PortalManager {
    fn resolve_port(&self, name: &str) -> Option<PortId> {
        self.portals
            .iter()
            .find(|p| p.com_port == name)
            .map(PortalDescriptor::port_id)
    }
}
