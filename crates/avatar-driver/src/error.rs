//! 驱动层错误类型定义

use crate::lifecycle::DeviceState;
use avatar_link::LinkError;
use thiserror::Error;

/// 驱动层错误类型
///
/// - 初始化阶段的致命错误（`PortNotFound`、`ThreadStart`）返回给调用者，
///   设备保持 not-ready
/// - 设备线程内的瞬时 IO 错误（`DeviceRead`、`DeviceWrite`）只在线程内部
///   记录，不会跨线程传播
#[derive(Error, Debug)]
pub enum HapticError {
    /// 通信端口未在 Portal 注册表中登记（致命，不重试）
    #[error("Portal id not found for port '{port}'")]
    PortNotFound { port: String },

    /// 设备读取失败（瞬时）
    #[error("Device read failure: {0}")]
    DeviceRead(#[source] LinkError),

    /// 设备写入失败（瞬时，本周期的力指令被丢弃）
    #[error("Device write failure: {0}")]
    DeviceWrite(#[source] LinkError),

    /// 线程启动失败（致命）
    #[error("Failed to start {thread} thread: {source}")]
    ThreadStart {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// 生命周期状态不允许该操作
    #[error("Invalid device state: expected {expected:?}, found {actual:?}")]
    InvalidState {
        expected: DeviceState,
        actual: DeviceState,
    },

    /// 配置非法
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HapticError {
    /// 是否为致命错误（设备进入永久 not-ready）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HapticError::PortNotFound { .. } | HapticError::ThreadStart { .. }
        )
    }
}
