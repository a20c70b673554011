//! 设备采样数据结构

use smallvec::SmallVec;

/// 采样序列的内联容量
///
/// Haptic Avatar 最多 8 个关节/电机，容量内的 clone 不会触发堆分配。
pub const SAMPLE_INLINE_CAPACITY: usize = 8;

/// 关节角度 + 器械长度采样
///
/// 每次轮询由 `DeviceLink` 产生，采集后不可变。
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AngleLengthSample {
    /// 关节角度（弧度），按关节顺序
    pub angles: SmallVec<[f32; SAMPLE_INLINE_CAPACITY]>,
    /// 器械伸出长度（mm）
    pub length: f32,
}

impl AngleLengthSample {
    pub fn new(angles: &[f32], length: f32) -> Self {
        Self {
            angles: SmallVec::from_slice(angles),
            length,
        }
    }

    /// 原地覆盖（容量内不分配）
    pub fn copy_from(&mut self, other: &Self) {
        self.angles.clear();
        self.angles.extend_from_slice(&other.angles);
        self.length = other.length;
    }
}

/// 电机 PWM 采样
///
/// 与 [`AngleLengthSample`] 同频采集。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PwmSample {
    /// 每个电机的 PWM 值
    pub values: SmallVec<[i32; SAMPLE_INLINE_CAPACITY]>,
}

impl PwmSample {
    pub fn new(values: &[i32]) -> Self {
        Self {
            values: SmallVec::from_slice(values),
        }
    }

    pub fn copy_from(&mut self, other: &Self) {
        self.values.clear();
        self.values.extend_from_slice(&other.values);
    }
}
