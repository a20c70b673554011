//! Pipeline 循环模块
//!
//! - [`device_loop`]：固定周期的设备线程（轮询 → 定时等待 → 接触评估 → 力指令）
//! - [`copy_loop`]：把设备快照搬运到仿真可见位置的复制线程
//!
//! 两个循环共用一个终止标志；设备循环退出时无条件释放力。

use crate::contact::{ContactState, ContactTransition};
use crate::error::HapticError;
use crate::metrics::HapticMetrics;
use crate::state::{HapticContext, HapticFetcher, HapticPublisher, HapticSnapshot, PoseReader, ToolPose};
use avatar_link::{DeviceLink, LinkError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// 每隔多少个周期输出一次定时诊断
pub const TIMING_DUMP_INTERVAL: u64 = 100;

/// 周期等待策略
///
/// 真实设备使用 `Spin`（OS sleep 粒度不足以保证亚毫秒周期）；
/// 非实时环境（CI、测试）可以换成粗粒度的 `Sleep`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PacingStrategy {
    /// 纯自旋忙等
    #[default]
    Spin,
    /// `spin_sleep`：先 sleep，最后一段自旋
    SpinSleep,
    /// `std::thread::sleep`
    Sleep,
}

impl PacingStrategy {
    /// 等待直到 `deadline`
    #[inline]
    pub fn wait_until(self, deadline: Instant) {
        match self {
            PacingStrategy::Spin => {
                while Instant::now() < deadline {
                    std::hint::spin_loop();
                }
            },
            PacingStrategy::SpinSleep => {
                let now = Instant::now();
                if deadline > now {
                    spin_sleep::sleep(deadline - now);
                }
            },
            PacingStrategy::Sleep => {
                let now = Instant::now();
                if deadline > now {
                    std::thread::sleep(deadline - now);
                }
            },
        }
    }

    /// 非关键路径上的空闲等待（复制线程）
    ///
    /// `Spin` 在这里退化为 `spin_sleep`，避免复制线程再占满一个核。
    pub fn idle(self, duration: Duration) {
        match self {
            PacingStrategy::Sleep => std::thread::sleep(duration),
            PacingStrategy::Spin | PacingStrategy::SpinSleep => spin_sleep::sleep(duration),
        }
    }
}

/// 设备循环配置
///
/// # Example
///
/// ```
/// use avatar_driver::{LoopConfig, PacingStrategy};
///
/// let config = LoopConfig {
///     damping: 2.0,
///     pacing: PacingStrategy::SpinSleep,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoopConfig {
    /// 设备循环目标周期（微秒）
    pub target_period_us: u64,
    /// 阻尼系数（力 = 阻尼 × 穿透深度）
    pub damping: f64,
    /// 地面高度（仿真坐标系 Y）
    pub floor_height: f64,
    /// 每 100 个周期输出一次循环耗时
    pub debug_timing: bool,
    /// 周期等待策略
    pub pacing: PacingStrategy,
    /// 复制线程周期（微秒）
    pub copy_period_us: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_period_us: 1000,
            damping: 1.0,
            floor_height: 0.0,
            debug_timing: false,
            pacing: PacingStrategy::Spin,
            copy_period_us: 1000,
        }
    }
}

impl LoopConfig {
    pub fn target_period(&self) -> Duration {
        Duration::from_micros(self.target_period_us)
    }

    pub fn copy_period(&self) -> Duration {
        Duration::from_micros(self.copy_period_us)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), HapticError> {
        if self.target_period_us == 0 {
            return Err(HapticError::InvalidConfig(
                "target_period_us must be > 0".to_string(),
            ));
        }
        if self.copy_period_us == 0 {
            return Err(HapticError::InvalidConfig(
                "copy_period_us must be > 0".to_string(),
            ));
        }
        if !self.damping.is_finite() || self.damping < 0.0 {
            return Err(HapticError::InvalidConfig(format!(
                "damping must be finite and >= 0 (got {})",
                self.damping
            )));
        }
        if !self.floor_height.is_finite() {
            return Err(HapticError::InvalidConfig(format!(
                "floor_height must be finite (got {})",
                self.floor_height
            )));
        }
        if self.target_period_us > 10_000 {
            warn!(
                "Device loop period {}us is slower than 100Hz; force feedback will feel soft",
                self.target_period_us
            );
        }
        Ok(())
    }
}

/// 设备循环读取工具位姿的来源
///
/// 由仿真侧提供，可能滞后一个动画步。
pub trait ContactInputsProvider {
    fn current_tool_pose(&mut self) -> ToolPose;
}

impl ContactInputsProvider for PoseReader {
    fn current_tool_pose(&mut self) -> ToolPose {
        self.latest()
    }
}

/// 固定位姿（测试、离线回放）
impl ContactInputsProvider for ToolPose {
    fn current_tool_pose(&mut self) -> ToolPose {
        *self
    }
}

/// 轮询设备并写入快照
fn poll_device(link: &mut impl DeviceLink, snapshot: &mut HapticSnapshot) -> Result<(), LinkError> {
    snapshot.angles_and_length = link.read_angles_and_length()?;
    snapshot.motor_values = link.read_motor_pwm()?;
    snapshot.valid = true;
    Ok(())
}

/// 设备线程主循环
///
/// # 参数
/// - `terminate`: 终止标志（与复制线程共享）
/// - `link`: 设备链路（移动进线程，独占）
/// - `publisher`: 快照发布端
/// - `inputs`: 工具位姿来源
/// - `config`: 循环配置
/// - `ctx`: 共享上下文（链路/接触标志）
/// - `metrics`: 性能指标
///
/// # 周期内顺序
/// 轮询 → 定时等待 → 读取位姿 → 接触评估 → 力指令
///
/// 读写错误只在线程内记录，循环不会因此退出。
pub fn device_loop(
    terminate: Arc<AtomicBool>,
    mut link: impl DeviceLink,
    mut publisher: HapticPublisher,
    mut inputs: impl ContactInputsProvider,
    config: LoopConfig,
    ctx: Arc<HapticContext>,
    metrics: Arc<HapticMetrics>,
) {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Device thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set device thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    let period = config.target_period();
    let mut snapshot = HapticSnapshot::default();
    let mut contact = ContactState::new(config.floor_height, config.damping);
    let mut sequence: u64 = 0;

    // 故障边沿，避免 1kHz 刷屏
    let mut read_fault = false;
    let mut write_fault = false;
    // 离开接触时释放失败，后续无接触周期继续重试
    let mut release_pending = false;

    let mut window_start = Instant::now();

    trace!(
        "Device thread: started (period {}us, damping {}, floor {})",
        config.target_period_us, config.damping, config.floor_height
    );

    // Acquire: 看到 true 时必须能看到设置者之前的所有写入
    while !terminate.load(Ordering::Acquire) {
        let cycle_start = Instant::now();
        sequence += 1;
        snapshot.sequence = sequence;

        // 1. 轮询设备
        let sample_valid = match poll_device(&mut link, &mut snapshot) {
            Ok(()) => {
                if read_fault {
                    info!("Device link recovered after read failures");
                    read_fault = false;
                }
                ctx.link_ready.store(true, Ordering::Release);
                true
            },
            Err(e) => {
                metrics.read_failures.fetch_add(1, Ordering::Relaxed);
                if !read_fault {
                    warn!("Device not ready: {}", HapticError::DeviceRead(e));
                    read_fault = true;
                }
                ctx.link_ready.store(false, Ordering::Release);
                snapshot.clear_samples();
                false
            },
        };
        publisher.publish(&snapshot);

        // 2. 定时等待（包含轮询耗时）
        config.pacing.wait_until(cycle_start + period);

        // 3. 读取工具位姿（允许滞后一个动画步）
        let pose = inputs.current_tool_pose();

        // 4. 接触评估与力指令
        let (force, transition) = contact.evaluate(&pose, sample_valid);
        match transition {
            ContactTransition::Entered => {
                info!("First contact! penetration force {:?}", force.force);
                metrics.contact_entries.fetch_add(1, Ordering::Relaxed);
                release_pending = false;
            },
            ContactTransition::Exited => {
                info!("Contact released");
                metrics.contact_exits.fetch_add(1, Ordering::Relaxed);
                release_pending = true;
            },
            ContactTransition::Held | ContactTransition::Free => {},
        }

        if transition.commands_force() {
            match link.set_force_vector(&force.force) {
                Ok(()) => {
                    metrics.force_commands.fetch_add(1, Ordering::Relaxed);
                    write_fault = false;
                },
                Err(e) => {
                    metrics.write_failures.fetch_add(1, Ordering::Relaxed);
                    if !write_fault {
                        warn!("Force command dropped: {}", HapticError::DeviceWrite(e));
                        write_fault = true;
                    }
                },
            }
        }

        if release_pending {
            match link.release_force() {
                Ok(()) => {
                    metrics.force_releases.fetch_add(1, Ordering::Relaxed);
                    release_pending = false;
                    write_fault = false;
                },
                Err(e) => {
                    metrics.write_failures.fetch_add(1, Ordering::Relaxed);
                    if !write_fault {
                        warn!("Force release failed, will retry: {}", HapticError::DeviceWrite(e));
                        write_fault = true;
                    }
                },
            }
        }

        // 5. 接触边沿状态
        ctx.in_contact.store(contact.in_contact, Ordering::Release);

        // 6. 定时诊断
        let elapsed = cycle_start.elapsed();
        metrics.record_cycle(elapsed);
        if config.debug_timing && sequence % TIMING_DUMP_INTERVAL == 0 {
            let window = window_start.elapsed();
            window_start = Instant::now();
            debug!(
                "loop nb: {} -> {:.3}ms / {} loops | last {}us",
                sequence,
                window.as_secs_f64() * 1000.0,
                TIMING_DUMP_INTERVAL,
                elapsed.as_micros()
            );
        }
    }

    // 保证退出后设备不保留任何力
    match link.release_force() {
        Ok(()) => {
            metrics.force_releases.fetch_add(1, Ordering::Relaxed);
        },
        Err(e) => {
            metrics.write_failures.fetch_add(1, Ordering::Relaxed);
            error!("Device thread: final force release failed: {}", e);
        },
    }
    ctx.in_contact.store(false, Ordering::Release);

    trace!("Device thread: loop exited after {} cycles", sequence);
}

/// 复制线程主循环
///
/// 按 `copy_period_us` 周期从 [`HapticFetcher`] 取最新快照，
/// 只有比上次更新的快照才推送到 `ctx.latest`。
pub fn copy_loop(
    terminate: Arc<AtomicBool>,
    mut fetcher: HapticFetcher,
    config: LoopConfig,
    ctx: Arc<HapticContext>,
    metrics: Arc<HapticMetrics>,
) {
    let period = config.copy_period();
    let mut snapshot = HapticSnapshot::default();
    let mut last_sequence = 0;

    while !terminate.load(Ordering::Acquire) {
        if fetcher.fetch_into(&mut snapshot) && snapshot.sequence > last_sequence {
            last_sequence = snapshot.sequence;
            ctx.latest.store(Arc::new(snapshot.clone()));
            metrics.snapshots_copied.fetch_add(1, Ordering::Relaxed);
        }

        config.pacing.idle(period);
    }

    trace!("Copy thread: loop exited at sequence {}", last_sequence);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SharedHapticState;
    use avatar_link::mock::{LinkCall, MockLink};
    use avatar_link::{AngleLengthSample, PwmSample};
    use nalgebra::{Rotation3, Vector3};
    use std::thread;

    fn fast_config() -> LoopConfig {
        LoopConfig {
            target_period_us: 200,
            copy_period_us: 200,
            pacing: PacingStrategy::Sleep,
            ..Default::default()
        }
    }

    /// 按预设序列返回位姿，序列结束后设置终止标志
    struct ScriptedInputs {
        poses: Vec<ToolPose>,
        next: usize,
        terminate: Arc<AtomicBool>,
    }

    impl ScriptedInputs {
        fn heights(heights: &[f64], terminate: Arc<AtomicBool>) -> Self {
            Self {
                poses: heights
                    .iter()
                    .map(|&y| ToolPose::new(Vector3::new(0.0, y, 0.0), Rotation3::identity()))
                    .collect(),
                next: 0,
                terminate,
            }
        }
    }

    impl ContactInputsProvider for ScriptedInputs {
        fn current_tool_pose(&mut self) -> ToolPose {
            let pose = self.poses[self.next.min(self.poses.len() - 1)];
            self.next += 1;
            if self.next >= self.poses.len() {
                self.terminate.store(true, Ordering::Release);
            }
            pose
        }
    }

    fn run_scripted(link: MockLink, heights: &[f64], config: LoopConfig) -> Arc<HapticMetrics> {
        let terminate = Arc::new(AtomicBool::new(false));
        let (publisher, _fetcher) = SharedHapticState::new().split();
        let inputs = ScriptedInputs::heights(heights, terminate.clone());
        let metrics = Arc::new(HapticMetrics::new());
        device_loop(
            terminate,
            link,
            publisher,
            inputs,
            config,
            Arc::new(HapticContext::new()),
            metrics.clone(),
        );
        metrics
    }

    #[test]
    fn test_loop_config_default() {
        let config = LoopConfig::default();
        assert_eq!(config.target_period_us, 1000);
        assert_eq!(config.damping, 1.0);
        assert_eq!(config.floor_height, 0.0);
        assert!(!config.debug_timing);
        assert_eq!(config.pacing, PacingStrategy::Spin);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_loop_config_validation() {
        let bad = [
            LoopConfig {
                target_period_us: 0,
                ..Default::default()
            },
            LoopConfig {
                copy_period_us: 0,
                ..Default::default()
            },
            LoopConfig {
                damping: f64::NAN,
                ..Default::default()
            },
            LoopConfig {
                damping: -1.0,
                ..Default::default()
            },
            LoopConfig {
                floor_height: f64::INFINITY,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(HapticError::InvalidConfig(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_pacing_waits_at_least_until_deadline() {
        for pacing in [PacingStrategy::Spin, PacingStrategy::SpinSleep, PacingStrategy::Sleep] {
            let start = Instant::now();
            pacing.wait_until(start + Duration::from_micros(500));
            assert!(start.elapsed() >= Duration::from_micros(500), "{:?}", pacing);
        }
        // 已过期的 deadline 立即返回
        PacingStrategy::Sleep.wait_until(Instant::now() - Duration::from_millis(1));
    }

    #[test]
    fn test_two_crossings_edge_triggered() {
        let (link, control) = MockLink::new();
        let config = LoopConfig {
            damping: 2.0,
            ..fast_config()
        };
        let metrics = run_scripted(link, &[1.0, -0.5, -0.5, 1.0, 1.0, -0.25, 1.0, 1.0], config);

        let force = |y: f64| LinkCall::SetForce(Vector3::new(0.0, y, 0.0));
        assert_eq!(
            control.write_calls(),
            vec![
                force(1.0),
                force(1.0),
                LinkCall::ReleaseForce,
                force(0.5),
                LinkCall::ReleaseForce,
                // 退出时无条件释放
                LinkCall::ReleaseForce,
            ]
        );

        let snap = metrics.snapshot();
        assert_eq!(snap.contact_entries, 2);
        assert_eq!(snap.contact_exits, 2);
        assert_eq!(snap.force_commands, 3);
        assert_eq!(snap.force_releases, 3);
        assert_eq!(snap.cycles, 8);
    }

    #[test]
    fn test_no_contact_only_final_release() {
        let (link, control) = MockLink::new();
        run_scripted(link, &[0.5, 0.1, 0.0], fast_config());
        assert_eq!(control.write_calls(), vec![LinkCall::ReleaseForce]);
    }

    #[test]
    fn test_poll_precedes_force_within_cycle() {
        let (link, control) = MockLink::new();
        let link = link.recording_reads();
        run_scripted(link, &[-1.0], fast_config());

        assert_eq!(
            control.calls(),
            vec![
                LinkCall::ReadAngles,
                LinkCall::ReadPwm,
                LinkCall::SetForce(Vector3::new(0.0, 1.0, 0.0)),
                LinkCall::ReleaseForce,
            ]
        );
    }

    #[test]
    fn test_read_failure_zero_force_and_recovery() {
        let (link, control) = MockLink::new();
        let terminate = Arc::new(AtomicBool::new(false));
        let (publisher, mut fetcher) = SharedHapticState::new().split();
        let ctx = Arc::new(HapticContext::new());
        let metrics = Arc::new(HapticMetrics::new());

        control.set_fail_reads(true);
        let below = ToolPose::new(Vector3::new(0.0, -1.0, 0.0), Rotation3::identity());

        let handle = {
            let terminate = terminate.clone();
            let ctx = ctx.clone();
            let metrics = metrics.clone();
            thread::spawn(move || {
                device_loop(terminate, link, publisher, below, fast_config(), ctx, metrics)
            })
        };

        // 读取失败期间：不下发力，快照为零样本
        while metrics.snapshot().read_failures < 5 {
            thread::yield_now();
        }
        assert!(!ctx.is_link_ready());
        assert!(control.write_calls().is_empty());
        let snap = fetcher.fetch();
        assert!(!snap.valid);
        assert!(snap.angles_and_length.angles.is_empty());

        // 恢复后开始下发力
        control.set_fail_reads(false);
        while metrics.snapshot().force_commands < 3 {
            thread::yield_now();
        }
        assert!(ctx.is_link_ready());
        assert!(ctx.is_in_contact());

        terminate.store(true, Ordering::Release);
        handle.join().unwrap();

        assert_eq!(control.write_calls().last(), Some(&LinkCall::ReleaseForce));
        assert!(!ctx.is_in_contact());
    }

    #[test]
    fn test_read_failure_while_in_contact_releases_once() {
        let (link, control) = MockLink::new();
        let terminate = Arc::new(AtomicBool::new(false));
        let (publisher, _fetcher) = SharedHapticState::new().split();
        let ctx = Arc::new(HapticContext::new());
        let metrics = Arc::new(HapticMetrics::new());
        let below = ToolPose::new(Vector3::new(0.0, -1.0, 0.0), Rotation3::identity());

        let handle = {
            let terminate = terminate.clone();
            let ctx = ctx.clone();
            let metrics = metrics.clone();
            thread::spawn(move || {
                device_loop(terminate, link, publisher, below, fast_config(), ctx, metrics)
            })
        };

        while metrics.snapshot().force_commands < 2 {
            thread::yield_now();
        }
        control.set_fail_reads(true);
        let failures_at_switch = metrics.snapshot().read_failures;
        while metrics.snapshot().read_failures < failures_at_switch + 5 {
            thread::yield_now();
        }
        terminate.store(true, Ordering::Release);
        handle.join().unwrap();

        let calls = control.write_calls();
        let releases = calls.iter().filter(|c| **c == LinkCall::ReleaseForce).count();
        // 断开时一次 + 退出时一次
        assert_eq!(releases, 2, "{:?}", calls);
        assert_eq!(metrics.snapshot().contact_exits, 1);
    }

    #[test]
    fn test_write_failure_retried_next_cycle() {
        let (link, control) = MockLink::new();
        control.set_fail_writes(true);
        let metrics = run_scripted(link, &[-1.0, -1.0, -1.0], fast_config());

        let snap = metrics.snapshot();
        // 三次力指令 + 最终释放全部失败
        assert_eq!(snap.write_failures, 4);
        assert_eq!(snap.force_commands, 0);
        assert_eq!(snap.contact_entries, 1);
        let sets = control
            .write_calls()
            .iter()
            .filter(|c| matches!(c, LinkCall::SetForce(_)))
            .count();
        assert_eq!(sets, 3);
    }

    #[test]
    fn test_failed_release_retried_until_success() {
        let (link, control) = MockLink::new();
        let terminate = Arc::new(AtomicBool::new(false));
        let (publisher, _fetcher) = SharedHapticState::new().split();
        let metrics = Arc::new(HapticMetrics::new());

        // 先接触一次，然后切到地面之上并让写入失败
        let (mut pose_writer, pose_reader) = crate::state::pose_channel(ToolPose::new(
            Vector3::new(0.0, -1.0, 0.0),
            Rotation3::identity(),
        ));

        let handle = {
            let terminate = terminate.clone();
            let metrics = metrics.clone();
            thread::spawn(move || {
                device_loop(
                    terminate,
                    link,
                    publisher,
                    pose_reader,
                    fast_config(),
                    Arc::new(HapticContext::new()),
                    metrics,
                )
            })
        };

        while metrics.snapshot().force_commands < 1 {
            thread::yield_now();
        }
        control.set_fail_writes(true);
        pose_writer.publish(&ToolPose::new(Vector3::new(0.0, 1.0, 0.0), Rotation3::identity()));
        while metrics.snapshot().write_failures < 3 {
            thread::yield_now();
        }
        control.set_fail_writes(false);
        while metrics.snapshot().force_releases < 1 {
            thread::yield_now();
        }
        terminate.store(true, Ordering::Release);
        handle.join().unwrap();

        let snap = metrics.snapshot();
        assert_eq!(snap.contact_exits, 1);
        // 重试成功一次 + 退出一次
        assert_eq!(snap.force_releases, 2);
    }

    /// 把 fmt 输出收集到内存
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_debug_timing_dumps_every_interval() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let config = LoopConfig {
            debug_timing: true,
            ..fast_config()
        };
        let (link, _control) = MockLink::new();
        let metrics = tracing::subscriber::with_default(subscriber, || {
            run_scripted(link, &[1.0; 250], config)
        });
        assert_eq!(metrics.snapshot().cycles, 250);

        let output = String::from_utf8_lossy(&log.0.lock()).into_owned();
        assert_eq!(output.matches("loop nb: ").count(), 2);
        assert!(output.contains("loop nb: 100 ->"));
        assert!(output.contains("loop nb: 200 ->"));
    }

    #[test]
    fn test_no_timing_dump_by_default() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let (link, _control) = MockLink::new();
        tracing::subscriber::with_default(subscriber, || {
            run_scripted(link, &[1.0; 150], fast_config())
        });
        assert!(!String::from_utf8_lossy(&log.0.lock()).contains("loop nb: "));
    }

    #[test]
    fn test_publishes_snapshot_each_cycle() {
        let angles = AngleLengthSample::new(&[0.1, 0.2, 0.3, 0.4], 150.0);
        let pwm = PwmSample::new(&[1, 2, 3, 4]);
        let (link, _control) = MockLink::new();
        let link = link.with_samples(angles.clone(), pwm.clone());

        let terminate = Arc::new(AtomicBool::new(false));
        let (publisher, mut fetcher) = SharedHapticState::new().split();
        let inputs = ScriptedInputs::heights(&[1.0, 1.0, 1.0, 1.0], terminate.clone());
        device_loop(
            terminate,
            link,
            publisher,
            inputs,
            fast_config(),
            Arc::new(HapticContext::new()),
            Arc::new(HapticMetrics::new()),
        );

        let snap = fetcher.fetch();
        assert_eq!(snap.sequence, 4);
        assert!(snap.valid);
        assert_eq!(snap.angles_and_length, angles);
        assert_eq!(snap.motor_values, pwm);
    }

    #[test]
    fn test_copy_loop_forwards_fresh_snapshots() {
        let terminate = Arc::new(AtomicBool::new(false));
        let (mut publisher, fetcher) = SharedHapticState::new().split();
        let ctx = Arc::new(HapticContext::new());
        let metrics = Arc::new(HapticMetrics::new());

        let handle = {
            let terminate = terminate.clone();
            let ctx = ctx.clone();
            let metrics = metrics.clone();
            thread::spawn(move || copy_loop(terminate, fetcher, fast_config(), ctx, metrics))
        };

        let mut snapshot = HapticSnapshot {
            valid: true,
            ..Default::default()
        };
        for seq in 1..=20 {
            snapshot.sequence = seq;
            publisher.publish(&snapshot);
            thread::sleep(Duration::from_micros(300));
        }

        let deadline = Instant::now() + Duration::from_secs(2);
        while ctx.latest.load().sequence < 20 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        terminate.store(true, Ordering::Release);
        handle.join().unwrap();

        assert_eq!(ctx.latest.load().sequence, 20);
        let copied = metrics.snapshot().snapshots_copied;
        assert!((1..=20).contains(&copied), "copied {}", copied);
    }
}
