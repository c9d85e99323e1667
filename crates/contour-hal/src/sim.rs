//! 进程内模拟后端
//!
//! 行为模型刻意简单：控制板在可配置的轮询次数后报告运动完成，
//! 笛卡尔控制器把上下文记录为带编号的 (DOF, 轨迹时间) 快照。
//! 所有句柄可 `Clone`，测试侧保留一份用于事后断言。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use nalgebra::{Matrix4, Rotation3, Vector3};
use parking_lot::Mutex;
use tracing::trace;

use crate::HalError;
use crate::board::{CartesianBoard, FingerKinematics, PositionBoard, SkinStream, TaxelSink};
use crate::types::{AxisAngle, BodyPart, ContextId, ControlModeKind, SkinContact, TaxelVector};

// ==================== 位置控制板 ====================

/// 一次已下发的位置运动
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedMove {
    /// `None` 表示全关节运动
    pub joints: Option<Vec<usize>>,
    pub targets: Vec<f64>,
}

#[derive(Debug)]
struct BoardState {
    part: BodyPart,
    mode: ControlModeKind,
    ref_speeds: Vec<f64>,
    moves: Vec<IssuedMove>,
    polls_until_done: u32,
    polls_left: u32,
}

/// 模拟关节位置控制板
#[derive(Debug, Clone)]
pub struct SimBoard {
    inner: Arc<Mutex<BoardState>>,
}

impl SimBoard {
    /// 创建立即完成运动的控制板
    pub fn new(part: BodyPart) -> Self {
        Self::with_polls(part, 0)
    }

    /// 创建在 `polls` 次完成查询之后才报告 done 的控制板
    pub fn with_polls(part: BodyPart, polls: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BoardState {
                part,
                mode: ControlModeKind::Idle,
                ref_speeds: vec![0.0; part.joint_count()],
                moves: Vec::new(),
                polls_until_done: polls,
                polls_left: 0,
            })),
        }
    }

    pub fn mode(&self) -> ControlModeKind {
        self.inner.lock().mode
    }

    pub fn ref_speeds(&self) -> Vec<f64> {
        self.inner.lock().ref_speeds.clone()
    }

    pub fn moves(&self) -> Vec<IssuedMove> {
        self.inner.lock().moves.clone()
    }
}

impl PositionBoard for SimBoard {
    fn joint_count(&self) -> usize {
        self.inner.lock().part.joint_count()
    }

    fn set_control_mode(&self, mode: ControlModeKind) -> Result<(), HalError> {
        self.inner.lock().mode = mode;
        Ok(())
    }

    fn set_ref_speeds(&self, speeds: &[f64]) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        if speeds.len() != state.part.joint_count() {
            return Err(HalError::JointCountMismatch {
                expected: state.part.joint_count(),
                actual: speeds.len(),
            });
        }
        state.ref_speeds.copy_from_slice(speeds);
        Ok(())
    }

    fn position_move(&self, targets: &[f64]) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        if targets.len() != state.part.joint_count() {
            return Err(HalError::JointCountMismatch {
                expected: state.part.joint_count(),
                actual: targets.len(),
            });
        }
        state.moves.push(IssuedMove {
            joints: None,
            targets: targets.to_vec(),
        });
        state.polls_left = state.polls_until_done;
        Ok(())
    }

    fn position_move_joints(&self, joints: &[usize], targets: &[f64]) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        if joints.len() != targets.len() {
            return Err(HalError::JointCountMismatch {
                expected: joints.len(),
                actual: targets.len(),
            });
        }
        let count = state.part.joint_count();
        if let Some(&index) = joints.iter().find(|&&j| j >= count) {
            return Err(HalError::JointIndexOutOfRange { index, count });
        }
        state.moves.push(IssuedMove {
            joints: Some(joints.to_vec()),
            targets: targets.to_vec(),
        });
        state.polls_left = state.polls_until_done;
        Ok(())
    }

    fn check_motion_done(&self) -> Result<bool, HalError> {
        let mut state = self.inner.lock();
        if state.polls_left > 0 {
            state.polls_left -= 1;
            Ok(false)
        } else {
            Ok(true)
        }
    }
}

// ==================== 笛卡尔控制器 ====================

/// 一次已下发的位姿目标
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedPose {
    pub position: Vector3<f64>,
    pub orientation: AxisAngle,
    pub traj_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct ContextSnapshot {
    dof: Vec<bool>,
    traj_time: f64,
}

#[derive(Debug)]
struct CartesianState {
    dof: Vec<bool>,
    traj_time: f64,
    contexts: HashMap<ContextId, ContextSnapshot>,
    next_context: ContextId,
    restored: Vec<ContextId>,
    tip_frames: Vec<(Vector3<f64>, AxisAngle)>,
    goals: Vec<IssuedPose>,
    stop_calls: u32,
    polls_until_done: u32,
    polls_left: u32,
}

/// 模拟笛卡尔控制器
///
/// DOF 向量布局与真实求解器一致：前 3 位为躯干
/// (pitch, roll, yaw)，其后为手臂关节。
#[derive(Debug, Clone)]
pub struct SimCartesian {
    inner: Arc<Mutex<CartesianState>>,
}

impl SimCartesian {
    pub fn new() -> Self {
        Self::with_polls(0)
    }

    /// 位姿目标在 `polls` 次完成查询之后才报告 done
    pub fn with_polls(polls: u32) -> Self {
        let mut dof = vec![false; 3];
        dof.extend(std::iter::repeat_n(true, 7));
        Self {
            inner: Arc::new(Mutex::new(CartesianState {
                dof,
                traj_time: 0.0,
                contexts: HashMap::new(),
                next_context: 0,
                restored: Vec::new(),
                tip_frames: Vec::new(),
                goals: Vec::new(),
                stop_calls: 0,
                polls_until_done: polls,
                polls_left: 0,
            })),
        }
    }

    pub fn traj_time(&self) -> f64 {
        self.inner.lock().traj_time
    }

    pub fn current_dof(&self) -> Vec<bool> {
        self.inner.lock().dof.clone()
    }

    /// 已恢复的上下文编号（按恢复顺序）
    pub fn restored_contexts(&self) -> Vec<ContextId> {
        self.inner.lock().restored.clone()
    }

    pub fn tip_frames(&self) -> Vec<(Vector3<f64>, AxisAngle)> {
        self.inner.lock().tip_frames.clone()
    }

    pub fn goals(&self) -> Vec<IssuedPose> {
        self.inner.lock().goals.clone()
    }

    pub fn stop_calls(&self) -> u32 {
        self.inner.lock().stop_calls
    }
}

impl Default for SimCartesian {
    fn default() -> Self {
        Self::new()
    }
}

impl CartesianBoard for SimCartesian {
    fn attach_tip_frame(
        &self,
        translation: Vector3<f64>,
        orientation: AxisAngle,
    ) -> Result<(), HalError> {
        trace!(?translation, "attaching tip frame");
        self.inner.lock().tip_frames.push((translation, orientation));
        Ok(())
    }

    fn store_context(&self) -> Result<ContextId, HalError> {
        let mut state = self.inner.lock();
        let id = state.next_context;
        state.next_context += 1;
        let snapshot = ContextSnapshot {
            dof: state.dof.clone(),
            traj_time: state.traj_time,
        };
        state.contexts.insert(id, snapshot);
        Ok(id)
    }

    fn restore_context(&self, id: ContextId) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        let snapshot = state
            .contexts
            .get(&id)
            .cloned()
            .ok_or(HalError::UnknownContext(id))?;
        state.dof = snapshot.dof;
        state.traj_time = snapshot.traj_time;
        state.restored.push(id);
        Ok(())
    }

    fn dof(&self) -> Result<Vec<bool>, HalError> {
        Ok(self.inner.lock().dof.clone())
    }

    fn set_dof(&self, dof: &[bool]) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        if dof.len() != state.dof.len() {
            return Err(HalError::JointCountMismatch {
                expected: state.dof.len(),
                actual: dof.len(),
            });
        }
        state.dof.copy_from_slice(dof);
        Ok(())
    }

    fn set_traj_time(&self, seconds: f64) -> Result<(), HalError> {
        self.inner.lock().traj_time = seconds;
        Ok(())
    }

    fn go_to_pose_sync(
        &self,
        position: Vector3<f64>,
        orientation: AxisAngle,
        traj_time: f64,
    ) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        state.goals.push(IssuedPose {
            position,
            orientation,
            traj_time,
        });
        state.polls_left = state.polls_until_done;
        Ok(())
    }

    fn wait_motion_done(&self, poll: Duration, timeout: Duration) -> Result<bool, HalError> {
        // 不真实睡眠：以轮询次数折算超时预算
        let mut state = self.inner.lock();
        let mut budget =
            (timeout.as_secs_f64() / poll.as_secs_f64().max(1e-9)).ceil() as u64;
        loop {
            if state.polls_left == 0 {
                return Ok(true);
            }
            if budget == 0 {
                return Ok(false);
            }
            state.polls_left -= 1;
            budget -= 1;
        }
    }

    fn stop_control(&self) -> Result<(), HalError> {
        self.inner.lock().stop_calls += 1;
        Ok(())
    }
}

// ==================== 指尖正运动学 ====================

const FINGER_LENGTH: f64 = 0.062;
const PALM_OFFSET: [f64; 3] = [0.02, 0.01, 0.0];

/// 模拟食指正运动学
///
/// 平面近似：第一个关节是绕 z 的外展角，其余关节角求和为屈曲角。
/// 足以给出确定且随参考构型变化的指尖平移。
#[derive(Debug, Clone, Default)]
pub struct SimFinger;

impl FingerKinematics for SimFinger {
    fn tip_pose(&self, joints: &[f64]) -> Matrix4<f64> {
        let abduction = joints.first().copied().unwrap_or(0.0);
        let flexion: f64 = joints.iter().skip(1).sum();
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), abduction);
        let local = Vector3::new(
            FINGER_LENGTH * flexion.cos(),
            0.0,
            -FINGER_LENGTH * flexion.sin(),
        );
        let translation = Vector3::from(PALM_OFFSET) + rotation * local;

        let mut pose = Matrix4::identity();
        pose.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation.matrix());
        pose.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        pose
    }
}

// ==================== 皮肤事件流 / 观测输出 ====================

/// 模拟皮肤事件流（channel 背书的 at-most-latest 读取）
pub struct SimSkin {
    rx: Receiver<Vec<SkinContact>>,
    interrupted: Arc<AtomicBool>,
}

impl SimSkin {
    /// 创建事件流与对应的生产者端
    pub fn channel(capacity: usize) -> (Sender<Vec<SkinContact>>, SimSkin) {
        let (tx, rx) = bounded(capacity);
        (
            tx,
            SimSkin {
                rx,
                interrupted: Arc::new(AtomicBool::new(false)),
            },
        )
    }
}

impl SkinStream for SimSkin {
    fn read_latest(&self) -> Result<Option<Vec<SkinContact>>, HalError> {
        if self.interrupted.load(Ordering::Relaxed) {
            return Ok(None);
        }
        // 只保留最近批次，更早的未读批次直接丢弃
        let mut latest = None;
        while let Ok(batch) = self.rx.try_recv() {
            latest = Some(batch);
        }
        Ok(latest)
    }

    fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Relaxed);
    }
}

/// 模拟压力向量输出（有损：队列满时丢弃本拍）
pub struct SimTaxelSink {
    tx: Sender<TaxelVector>,
}

impl SimTaxelSink {
    pub fn channel(capacity: usize) -> (SimTaxelSink, Receiver<TaxelVector>) {
        let (tx, rx) = bounded(capacity);
        (SimTaxelSink { tx }, rx)
    }
}

impl TaxelSink for SimTaxelSink {
    fn publish(&self, taxels: &TaxelVector) {
        let _ = self.tx.try_send(*taxels);
    }
}
