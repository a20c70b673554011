//! 接触力模型
//!
//! 单侧平面约束：工具尖端的竖直坐标（Y 轴）低于地面高度即为接触。
//! 力 = 阻尼系数 × 穿透向量，再旋转到设备坐标系。
//!
//! 进入/离开接触时力是阶跃变化，没有斜坡平滑。

use crate::state::ToolPose;
use nalgebra::{Rotation3, Vector3};

/// 竖直轴索引（Y）
pub const VERTICAL_AXIS: usize = 1;

/// 单次接触力计算结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactForce {
    /// 设备坐标系下的力
    pub force: Vector3<f64>,
    pub in_contact: bool,
}

impl ContactForce {
    pub fn none() -> Self {
        Self {
            force: Vector3::zeros(),
            in_contact: false,
        }
    }
}

/// 计算接触力（纯函数）
///
/// ```
/// use avatar_driver::contact::compute_force;
/// use nalgebra::{Rotation3, Vector3};
///
/// let result = compute_force(&Vector3::new(0.0, -0.5, 0.0), 0.0, 2.0, &Rotation3::identity());
/// assert!(result.in_contact);
/// assert_eq!(result.force, Vector3::new(0.0, 1.0, 0.0));
/// ```
pub fn compute_force(
    tip_position: &Vector3<f64>,
    floor_height: f64,
    damping: f64,
    tool_rotation: &Rotation3<f64>,
) -> ContactForce {
    if tip_position[VERTICAL_AXIS] >= floor_height {
        return ContactForce::none();
    }

    let mut floor_position = *tip_position;
    floor_position[VERTICAL_AXIS] = floor_height;
    let penetration = floor_position - tip_position;

    ContactForce {
        force: tool_rotation * (penetration * damping),
        in_contact: true,
    }
}

/// 接触状态沿时间的变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactTransition {
    /// 本周期首次接触
    Entered,
    /// 持续接触
    Held,
    /// 本周期离开接触
    Exited,
    /// 持续无接触
    Free,
}

impl ContactTransition {
    fn from_edges(was: bool, now: bool) -> Self {
        match (was, now) {
            (false, true) => Self::Entered,
            (true, true) => Self::Held,
            (true, false) => Self::Exited,
            (false, false) => Self::Free,
        }
    }

    /// 本周期是否需要下发力
    pub fn commands_force(self) -> bool {
        matches!(self, Self::Entered | Self::Held)
    }
}

/// 接触状态（仅设备线程修改）
#[derive(Debug, Clone, PartialEq)]
pub struct ContactState {
    pub in_contact: bool,
    pub tool_tip_position: Vector3<f64>,
    pub floor_height: f64,
    pub damping_coefficient: f64,
    pub tool_rotation: Rotation3<f64>,
}

impl ContactState {
    pub fn new(floor_height: f64, damping_coefficient: f64) -> Self {
        Self {
            in_contact: false,
            tool_tip_position: Vector3::zeros(),
            floor_height,
            damping_coefficient,
            tool_rotation: Rotation3::identity(),
        }
    }

    /// 用最新位姿评估一次接触，返回力与边沿变化
    ///
    /// `sample_valid == false`（本周期读取失败）时强制视为无接触。
    pub fn evaluate(&mut self, pose: &ToolPose, sample_valid: bool) -> (ContactForce, ContactTransition) {
        self.tool_tip_position = pose.position;
        self.tool_rotation = pose.rotation;

        let contact = if sample_valid {
            compute_force(
                &self.tool_tip_position,
                self.floor_height,
                self.damping_coefficient,
                &self.tool_rotation,
            )
        } else {
            ContactForce::none()
        };

        let transition = ContactTransition::from_edges(self.in_contact, contact.in_contact);
        self.in_contact = contact.in_contact;
        (contact, transition)
    }
}
