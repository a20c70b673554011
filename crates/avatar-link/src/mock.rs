//! Mock 链路（`mock` feature）
//!
//! 按顺序记录所有调用，可注入读/写故障，用于验证设备循环的调用时序。

use crate::{AngleLengthSample, DeviceLink, LinkError, PwmSample};
use nalgebra::Vector3;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 一次链路调用记录
#[derive(Debug, Clone, PartialEq)]
pub enum LinkCall {
    ReadAngles,
    ReadPwm,
    SetForce(Vector3<f64>),
    ReleaseForce,
}

impl LinkCall {
    pub fn is_read(&self) -> bool {
        matches!(self, LinkCall::ReadAngles | LinkCall::ReadPwm)
    }
}

#[derive(Debug, Default)]
struct MockShared {
    calls: Mutex<Vec<LinkCall>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    record_reads: AtomicBool,
}

/// Mock 控制与观察句柄
#[derive(Debug, Clone)]
pub struct MockLinkControl {
    shared: Arc<MockShared>,
}

impl MockLinkControl {
    /// 全部调用记录的副本
    pub fn calls(&self) -> Vec<LinkCall> {
        self.shared.calls.lock().clone()
    }

    /// 写调用记录（过滤掉读）
    pub fn write_calls(&self) -> Vec<LinkCall> {
        self.shared
            .calls
            .lock()
            .iter()
            .filter(|c| !c.is_read())
            .cloned()
            .collect()
    }

    /// 让所有读取返回 `LinkError::Disconnected`
    pub fn set_fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::Release);
    }

    /// 让所有写入返回 `LinkError::Timeout`
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Release);
    }
}

/// 记录调用的 Mock 链路
///
/// 读取返回固定样本；默认不记录读调用（1kHz 下记录会迅速膨胀），
/// 需要时用 [`MockLink::recording_reads`] 打开。
#[derive(Debug)]
pub struct MockLink {
    shared: Arc<MockShared>,
    angles: AngleLengthSample,
    pwm: PwmSample,
}

impl MockLink {
    pub fn new() -> (Self, MockLinkControl) {
        let shared = Arc::new(MockShared::default());
        (
            Self {
                shared: shared.clone(),
                angles: AngleLengthSample::new(&[0.0, 0.0, 0.0, 0.0], 0.0),
                pwm: PwmSample::new(&[0, 0, 0, 0]),
            },
            MockLinkControl { shared },
        )
    }

    /// 设置读取返回的样本
    pub fn with_samples(mut self, angles: AngleLengthSample, pwm: PwmSample) -> Self {
        self.angles = angles;
        self.pwm = pwm;
        self
    }

    /// 同时记录读调用
    pub fn recording_reads(self) -> Self {
        self.shared.record_reads.store(true, Ordering::Relaxed);
        self
    }

    fn record(&self, call: LinkCall) {
        if call.is_read() && !self.shared.record_reads.load(Ordering::Relaxed) {
            return;
        }
        self.shared.calls.lock().push(call);
    }
}

impl DeviceLink for MockLink {
    fn read_angles_and_length(&mut self) -> Result<AngleLengthSample, LinkError> {
        self.record(LinkCall::ReadAngles);
        if self.shared.fail_reads.load(Ordering::Acquire) {
            return Err(LinkError::Disconnected);
        }
        Ok(self.angles.clone())
    }

    fn read_motor_pwm(&mut self) -> Result<PwmSample, LinkError> {
        self.record(LinkCall::ReadPwm);
        if self.shared.fail_reads.load(Ordering::Acquire) {
            return Err(LinkError::Disconnected);
        }
        Ok(self.pwm.clone())
    }

    fn set_force_vector(&mut self, force: &Vector3<f64>) -> Result<(), LinkError> {
        self.record(LinkCall::SetForce(*force));
        if self.shared.fail_writes.load(Ordering::Acquire) {
            return Err(LinkError::Timeout);
        }
        Ok(())
    }

    fn release_force(&mut self) -> Result<(), LinkError> {
        self.record(LinkCall::ReleaseForce);
        if self.shared.fail_writes.load(Ordering::Acquire) {
            return Err(LinkError::Timeout);
        }
        Ok(())
    }
}
