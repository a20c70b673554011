//! # Avatar Device Link Layer
//!
//! 力反馈设备链路抽象层，提供统一的 `DeviceLink` 接口。
//!
//! 具体的传输驱动（串口、USB 等）不在本 crate 范围内，上层只依赖
//! [`DeviceLink`] trait：
//! - 读取关节角度与器械长度（[`AngleLengthSample`]）
//! - 读取电机 PWM（[`PwmSample`]）
//! - 下发力向量 / 释放力
//!
//! 所有调用都假定是微秒级、非阻塞的，失败通过 `Result` 返回，
//! 实时线程内不会因错误而 unwind。

use thiserror::Error;

pub mod emulator;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod sample;

pub use emulator::{EmulatedLink, EmulatorProbe};
pub use nalgebra::{Rotation3, Vector3};
pub use sample::{AngleLengthSample, PwmSample, SAMPLE_INLINE_CAPACITY};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Device disconnected")]
    Disconnected,
    #[error("Link timeout")]
    Timeout,
    #[error("Device error: {0}")]
    Device(#[from] LinkDeviceError),
    #[error("Link not started")]
    NotStarted,
}

impl LinkError {
    /// 是否为致命错误（设备不可用，重试无意义）
    pub fn is_fatal(&self) -> bool {
        match self {
            LinkError::Disconnected => true,
            LinkError::Device(e) => e.is_fatal(),
            LinkError::Timeout | LinkError::NotStarted => false,
        }
    }
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    InvalidResponse,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct LinkDeviceError {
    pub kind: LinkDeviceErrorKind,
    pub message: String,
}

impl LinkDeviceError {
    pub fn new(kind: LinkDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            LinkDeviceErrorKind::NoDevice
                | LinkDeviceErrorKind::AccessDenied
                | LinkDeviceErrorKind::NotFound
        )
    }
}

impl From<&str> for LinkDeviceError {
    fn from(message: &str) -> Self {
        Self::new(LinkDeviceErrorKind::Unknown, message)
    }
}

/// 力反馈设备链路
///
/// 由设备线程独占（`&mut self`），同一设备不会被两个循环并发轮询。
pub trait DeviceLink {
    /// 读取关节角度和器械长度
    fn read_angles_and_length(&mut self) -> Result<AngleLengthSample, LinkError>;

    /// 读取最近一次电机 PWM 值
    fn read_motor_pwm(&mut self) -> Result<PwmSample, LinkError>;

    /// 下发力向量（设备坐标系）
    fn set_force_vector(&mut self, force: &Vector3<f64>) -> Result<(), LinkError>;

    /// 释放力（设备回到零力状态）
    ///
    /// 连续调用多次必须是安全的。
    fn release_force(&mut self) -> Result<(), LinkError>;
}

impl<L: DeviceLink + ?Sized> DeviceLink for Box<L> {
    fn read_angles_and_length(&mut self) -> Result<AngleLengthSample, LinkError> {
        (**self).read_angles_and_length()
    }

    fn read_motor_pwm(&mut self) -> Result<PwmSample, LinkError> {
        (**self).read_motor_pwm()
    }

    fn set_force_vector(&mut self, force: &Vector3<f64>) -> Result<(), LinkError> {
        (**self).set_force_vector(force)
    }

    fn release_force(&mut self) -> Result<(), LinkError> {
        (**self).release_force()
    }
}
