//! 生命周期管理
//!
//! 编排启动顺序（开接口 → 归位 → 抓握准备 → 存上下文 → 配置
//! 求解器 → 指尖重定位 → 预接触姿态）并保证关闭时恢复此前
//! 改写的控制器配置——无论模块以何种方式终止。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::Receiver;
use nalgebra::{Matrix3, Rotation3, Vector3};
use spin_sleep::SpinSleeper;
use tracing::{debug, info, warn};

use contour_hal::{
    AxisAngle, CartesianBoard, ControlModeKind, FingerKinematics, HalError, PositionBoard,
    SkinStream, TaxelSink,
};

use crate::command::{self, CommandRequest};
use crate::config::ModuleConfig;
use crate::context::ContextGuard;
use crate::control_loop::ControlLoop;
use crate::error::{ControlError, StartupStep};
use crate::frame;
use crate::poses;
use crate::sequencer::PoseSequencer;
use crate::skin::TactileAggregator;
use crate::strategy::ContourStrategy;

/// 构造期一次性获取的全部设备接口
pub struct Devices {
    pub right_arm: Box<dyn PositionBoard>,
    pub left_arm: Box<dyn PositionBoard>,
    pub head: Box<dyn PositionBoard>,
    pub torso: Box<dyn PositionBoard>,
    pub cartesian: Arc<dyn CartesianBoard>,
    pub finger: Box<dyn FingerKinematics>,
    pub skin: Box<dyn SkinStream>,
    pub taxel_out: Box<dyn TaxelSink>,
}

/// 预接触姿态的末端朝向
///
/// 基础旋转 diag(-1, 1, -1) 让末端笔直朝前，再复合绕 pitch 的
/// 倾斜，避免手指先于指尖触面。
pub fn approach_orientation() -> AxisAngle {
    let base = Rotation3::from_matrix_unchecked(Matrix3::new(
        -1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, -1.0,
    ));
    let tilt = Rotation3::from_euler_angles(0.0, poses::TILT_PITCH_DEG.to_radians(), 0.0);
    AxisAngle::from_rotation(&(tilt * base))
}

/// 轮廓跟随模块
///
/// 单协作控制线程：控制节拍、命令处理与所有姿态等待都在调用
/// `run` 的线程上执行；唯一的并发生产者是皮肤事件源，由传输层
/// 缓冲、每拍非阻塞读取一次。
pub struct ContourModule {
    config: ModuleConfig,
    sequencer: PoseSequencer,
    cartesian: Arc<dyn CartesianBoard>,
    finger: Box<dyn FingerKinematics>,
    control: ControlLoop,
    context: Option<ContextGuard>,
    overruns: u64,
    closed: bool,
}

impl ContourModule {
    /// 启动第 1 步：打开全部设备接口
    ///
    /// 任何接口打开失败都中止启动并指出失败设备，不做部分操作。
    pub fn open<F>(
        config: ModuleConfig,
        strategy: Box<dyn ContourStrategy>,
        open_devices: F,
    ) -> Result<Self, ControlError>
    where
        F: FnOnce(&ModuleConfig) -> Result<Devices, HalError>,
    {
        info!(robot = %config.robot, arm = %config.arm, "opening device interfaces");
        let devices = open_devices(&config)
            .map_err(|e| ControlError::startup(StartupStep::OpenInterfaces, e))?;

        let sequencer = PoseSequencer::new(
            devices.right_arm,
            devices.left_arm,
            devices.head,
            devices.torso,
            config.wait_poll,
            config.wait_timeout,
        )
        .map_err(|e| ControlError::startup(StartupStep::OpenInterfaces, e))?;

        let aggregator = TactileAggregator::new(devices.skin, devices.taxel_out);
        let control = ControlLoop::new(aggregator, strategy);

        Ok(Self {
            config,
            sequencer,
            cartesian: devices.cartesian,
            finger: devices.finger,
            control,
            context: None,
            overruns: 0,
            closed: false,
        })
    }

    /// 启动第 2–7 步；每步成功才进入下一步，首个失败即中止
    pub fn configure(&mut self) -> Result<(), ControlError> {
        // 2. 归位（超时 best-effort，硬件错误才中止）
        self.sequencer
            .home_all_segments()
            .map_err(|e| ControlError::startup(StartupStep::Home, e))?;

        // 3. 主动臂位置模式 + 两阶段合指
        let arm = self.config.arm.body_part();
        self.sequencer
            .board(arm)
            .set_control_mode(ControlModeKind::Position)
            .map_err(|e| ControlError::startup(StartupStep::GraspPrepare, e))?;
        self.sequencer
            .close_grasp(arm)
            .map_err(|e| ControlError::startup(StartupStep::GraspPrepare, e))?;

        // 4. 存储控制器上下文，关闭路径由守卫恢复
        let guard = ContextGuard::store(self.cartesian.clone())
            .map_err(|e| ControlError::startup(StartupStep::StoreContext, e))?;
        self.context = Some(guard);

        // 5. 轨迹响应时间 + 躯干 DOF 使能
        self.configure_solver()
            .map_err(|e| ControlError::startup(StartupStep::ConfigureSolver, e))?;

        // 6. 受控点重定位到指尖；之后的笛卡尔目标都相对新坐标系
        let offset = frame::finger_offset(self.finger.as_ref());
        frame::reanchor(self.cartesian.as_ref(), &offset)
            .map_err(|e| ControlError::startup(StartupStep::ReanchorFrame, e))?;

        // 7. 两个顺序位姿目标到达预接触姿态
        let orientation = approach_orientation();
        for target in [poses::PRE_CONTACT_0, poses::PRE_CONTACT_1] {
            let position = Vector3::from(target);
            self.cartesian
                .go_to_pose_sync(position, orientation, self.config.approach_time)
                .map_err(|e| ControlError::startup(StartupStep::PreContactPose, e))?;
            let done = self
                .cartesian
                .wait_motion_done(self.config.wait_poll, self.config.wait_timeout)
                .map_err(|e| ControlError::startup(StartupStep::PreContactPose, e))?;
            if !done {
                warn!(?position, "pre-contact goal not reached in time, continuing");
            }
        }

        info!("startup complete, pre-contact pose reached");
        Ok(())
    }

    fn configure_solver(&self) -> Result<(), HalError> {
        self.cartesian.set_traj_time(self.config.traj_time)?;

        let mut dof = self.cartesian.dof()?;
        if dof.len() < 3 {
            return Err(HalError::setup(
                "cartesian",
                "DOF vector shorter than the three torso axes",
            ));
        }
        let torso = self.config.torso;
        dof[0] = torso.pitch;
        dof[1] = torso.roll;
        dof[2] = torso.yaw;
        self.cartesian.set_dof(&dof)
    }

    /// 固定周期运行控制循环，直到关闭标志被置位
    ///
    /// 命令与节拍互斥：命令只在两拍之间被服务。节拍超出周期不是
    /// 本层的错误，但要可观测（计数 + debug 日志）。运行期错误
    /// 记日志后继续，不终止循环。
    pub fn run(&mut self, shutdown: &AtomicBool, commands: &Receiver<CommandRequest>) {
        let sleeper = SpinSleeper::default();
        info!(period = ?self.config.period, "entering control loop");

        while !shutdown.load(Ordering::Relaxed) {
            let tick_start = Instant::now();

            while let Ok(request) = commands.try_recv() {
                let reply = command::respond(&self.sequencer, &request.token);
                let _ = request.reply.try_send(reply);
            }

            match self.control.tick() {
                Ok((_, Some(goal))) => {
                    // 控制律的修正目标非阻塞下发
                    if let Err(e) = self.cartesian.go_to_pose_sync(
                        goal.position,
                        goal.orientation,
                        goal.traj_time,
                    ) {
                        warn!(error = %e, "failed to issue corrective pose goal");
                    }
                }
                Ok((_, None)) => {}
                Err(e) => warn!(error = %e, "control tick failed"),
            }

            let elapsed = tick_start.elapsed();
            if elapsed > self.config.period {
                self.overruns += 1;
                debug!(?elapsed, period = ?self.config.period, "tick overran its period");
            } else {
                sleeper.sleep(self.config.period - elapsed);
            }
        }

        info!("shutdown requested, leaving control loop");
    }

    /// 关闭序列：中断皮肤流、停止在途运动、恢复控制器上下文
    ///
    /// 幂等；`Drop` 兜底调用，保证启动失败或外部中断时同样执行。
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        info!("closing the module");
        self.control.interrupt();
        if let Err(e) = self.cartesian.stop_control() {
            warn!(error = %e, "failed to stop cartesian control");
        }
        if let Some(mut guard) = self.context.take() {
            guard.restore();
        }
        info!("module closed");
    }

    /// 已执行的节拍数
    pub fn ticks(&self) -> u64 {
        self.control.ticks()
    }

    /// 超出周期的节拍数
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }
}

impl Drop for ContourModule {
    fn drop(&mut self) {
        self.close();
    }
}
