//! 姿态序列器
//!
//! 持有四块身体段控制板，提供回初始姿态与两阶段合指序列，
//! 以及通用的"下发 + 等待"原语。所有等待都有界，超时按
//! best-effort 处理：记录警告、继续执行，因为中途放弃会把
//! 机器人留在不确定的中间姿态。

use std::time::Duration;

use contour_hal::{BodyPart, ControlModeKind, HalError, PositionBoard};
use tracing::{debug, info, warn};

use crate::poses;
use crate::watchdog::{self, WaitOutcome};

/// 姿态序列器
pub struct PoseSequencer {
    right_arm: Box<dyn PositionBoard>,
    left_arm: Box<dyn PositionBoard>,
    head: Box<dyn PositionBoard>,
    torso: Box<dyn PositionBoard>,
    wait_poll: Duration,
    wait_timeout: Duration,
}

impl PoseSequencer {
    /// 构造序列器，构造期一次性校验各控制板自由度
    pub fn new(
        right_arm: Box<dyn PositionBoard>,
        left_arm: Box<dyn PositionBoard>,
        head: Box<dyn PositionBoard>,
        torso: Box<dyn PositionBoard>,
        wait_poll: Duration,
        wait_timeout: Duration,
    ) -> Result<Self, HalError> {
        expect_joints(BodyPart::RightArm, right_arm.as_ref())?;
        expect_joints(BodyPart::LeftArm, left_arm.as_ref())?;
        expect_joints(BodyPart::Head, head.as_ref())?;
        expect_joints(BodyPart::Torso, torso.as_ref())?;
        Ok(Self {
            right_arm,
            left_arm,
            head,
            torso,
            wait_poll,
            wait_timeout,
        })
    }

    pub fn board(&self, part: BodyPart) -> &dyn PositionBoard {
        match part {
            BodyPart::RightArm => self.right_arm.as_ref(),
            BodyPart::LeftArm => self.left_arm.as_ref(),
            BodyPart::Head => self.head.as_ref(),
            BodyPart::Torso => self.torso.as_ref(),
        }
    }

    /// 通用原语：设置参考速度并下发全关节目标，非阻塞
    pub fn move_group(
        &self,
        part: BodyPart,
        targets: &[f64],
        ref_speed: f64,
    ) -> Result<(), HalError> {
        let board = self.board(part);
        board.set_ref_speeds(&vec![ref_speed; board.joint_count()])?;
        board.position_move(targets)
    }

    /// 等待一组身体段的在途运动完成（委托给看门狗）
    pub fn wait(&self, parts: &[BodyPart]) -> Result<WaitOutcome, HalError> {
        let boards: Vec<&dyn PositionBoard> = parts.iter().map(|p| self.board(*p)).collect();
        watchdog::wait_all(&boards, self.wait_poll, self.wait_timeout)
    }

    /// 所有身体段回到中立姿态
    ///
    /// 先把每块控制板切到位置模式，再下发中立姿态目标，最后
    /// 有界等待全部完成。超时不是调用方的错误。
    pub fn home_all_segments(&self) -> Result<WaitOutcome, HalError> {
        info!("homing all segments");
        for part in BodyPart::ALL {
            self.board(part).set_control_mode(ControlModeKind::Position)?;
        }
        self.move_group(BodyPart::RightArm, &poses::ARM_HOME, poses::ARM_REF_SPEED)?;
        self.move_group(BodyPart::LeftArm, &poses::ARM_HOME, poses::ARM_REF_SPEED)?;
        self.move_group(BodyPart::Head, &poses::HEAD_HOME, poses::ARM_REF_SPEED)?;
        self.move_group(BodyPart::Torso, &poses::TORSO_HOME, poses::TORSO_REF_SPEED)?;

        let outcome = self.wait(&BodyPart::ALL)?;
        if !outcome.is_completed() {
            warn!(timeout = ?self.wait_timeout, "homing did not complete in time, continuing");
        }
        Ok(outcome)
    }

    /// 两阶段合指
    ///
    /// 先合非拇指手指并等待，再合拇指并等待；拇指依赖第一阶段
    /// 让出的几何空间，两阶段必须串行。
    pub fn close_grasp(&self, part: BodyPart) -> Result<WaitOutcome, HalError> {
        debug!(%part, "closing grasp");
        let board = self.board(part);
        board.set_ref_speeds(&vec![poses::ARM_REF_SPEED; board.joint_count()])?;

        board.position_move_joints(&poses::FINGER_JOINTS, &poses::FINGER_CLOSED)?;
        let fingers = watchdog::wait_all(&[board], self.wait_poll, self.wait_timeout)?;
        if !fingers.is_completed() {
            warn!("finger phase did not complete in time, continuing with thumb");
        }

        board.position_move_joints(&poses::THUMB_JOINTS, &poses::THUMB_CLOSED)?;
        let thumb = watchdog::wait_all(&[board], self.wait_poll, self.wait_timeout)?;
        if !thumb.is_completed() {
            warn!("thumb phase did not complete in time");
        }

        Ok(fingers & thumb)
    }
}

fn expect_joints(part: BodyPart, board: &dyn PositionBoard) -> Result<(), HalError> {
    let actual = board.joint_count();
    if actual != part.joint_count() {
        return Err(HalError::setup(
            part.as_str(),
            format!("expected {} joints, got {}", part.joint_count(), actual),
        ));
    }
    Ok(())
}
