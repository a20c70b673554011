//! 力反馈循环性能指标
//!
//! 所有计数器都是原子操作，设备线程更新时不会引入锁竞争，
//! 任何线程都可以随时读取快照。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 设备循环实时指标
///
/// # 使用示例
///
/// ```rust
/// use avatar_driver::HapticMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = HapticMetrics::new();
/// metrics.cycles.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().cycles, 1);
/// ```
#[derive(Debug, Default)]
pub struct HapticMetrics {
    /// 设备循环周期数
    pub cycles: AtomicU64,

    /// 读取失败次数（角度或 PWM）
    pub read_failures: AtomicU64,

    /// 写入失败次数（力指令或释放）
    pub write_failures: AtomicU64,

    /// 成功下发的力指令数
    pub force_commands: AtomicU64,

    /// 成功的释放力调用数（含退出时的一次）
    pub force_releases: AtomicU64,

    /// 进入接触次数
    pub contact_entries: AtomicU64,

    /// 离开接触次数
    pub contact_exits: AtomicU64,

    /// 复制线程推送到仿真侧的快照数
    pub snapshots_copied: AtomicU64,

    /// 初始化阶段输出的致命诊断数
    pub fatal_diagnostics: AtomicU64,

    /// 最近一个周期耗时（微秒）
    pub last_cycle_us: AtomicU64,

    /// 最长周期耗时（微秒）
    ///
    /// 如果远大于目标周期，说明设备轮询阻塞或线程被抢占。
    pub max_cycle_us: AtomicU64,
}

impl HapticMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个周期的耗时
    pub fn record_cycle(&self, elapsed: Duration) {
        let us = elapsed.as_micros() as u64;
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_us.store(us, Ordering::Relaxed);
        self.max_cycle_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            force_commands: self.force_commands.load(Ordering::Relaxed),
            force_releases: self.force_releases.load(Ordering::Relaxed),
            contact_entries: self.contact_entries.load(Ordering::Relaxed),
            contact_exits: self.contact_exits.load(Ordering::Relaxed),
            snapshots_copied: self.snapshots_copied.load(Ordering::Relaxed),
            fatal_diagnostics: self.fatal_diagnostics.load(Ordering::Relaxed),
            last_cycle_us: self.last_cycle_us.load(Ordering::Relaxed),
            max_cycle_us: self.max_cycle_us.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.cycles.store(0, Ordering::Relaxed);
        self.read_failures.store(0, Ordering::Relaxed);
        self.write_failures.store(0, Ordering::Relaxed);
        self.force_commands.store(0, Ordering::Relaxed);
        self.force_releases.store(0, Ordering::Relaxed);
        self.contact_entries.store(0, Ordering::Relaxed);
        self.contact_exits.store(0, Ordering::Relaxed);
        self.snapshots_copied.store(0, Ordering::Relaxed);
        self.fatal_diagnostics.store(0, Ordering::Relaxed);
        self.last_cycle_us.store(0, Ordering::Relaxed);
        self.max_cycle_us.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub read_failures: u64,
    pub write_failures: u64,
    pub force_commands: u64,
    pub force_releases: u64,
    pub contact_entries: u64,
    pub contact_exits: u64,
    pub snapshots_copied: u64,
    pub fatal_diagnostics: u64,
    pub last_cycle_us: u64,
    pub max_cycle_us: u64,
}

impl MetricsSnapshot {
    /// 读取失败率（0.0 ~ 1.0）
    pub fn read_failure_rate(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.read_failures as f64 / self.cycles as f64
        }
    }
}
