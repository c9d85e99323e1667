//! 运动完成看门狗
//!
//! 阻塞式 sleep-and-poll：调用方让出唯一的控制线程，直到所有
//! 控制板报告运动完成或超时。下发运动与等待完成是分离的职责，
//! 看门狗不做任何重试。

use std::time::{Duration, Instant};

use contour_hal::{HalError, PositionBoard};
use tracing::trace;

/// 一次有界等待的结果
///
/// 超时只表示放弃等待，不表示运动成功。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// 所有控制板都报告完成
    Completed,
    /// 超时放弃，至少一块控制板仍在运动
    TimedOut,
}

impl WaitOutcome {
    pub fn is_completed(self) -> bool {
        matches!(self, WaitOutcome::Completed)
    }

    fn and(self, other: WaitOutcome) -> WaitOutcome {
        if self.is_completed() && other.is_completed() {
            WaitOutcome::Completed
        } else {
            WaitOutcome::TimedOut
        }
    }
}

impl std::ops::BitAnd for WaitOutcome {
    type Output = WaitOutcome;

    fn bitand(self, rhs: WaitOutcome) -> WaitOutcome {
        self.and(rhs)
    }
}

/// 等待一组已下发运动的控制板全部完成
///
/// - 完成状态跨控制板做逻辑与聚合
/// - 空集合立即返回 [`WaitOutcome::Completed`]，不做任何轮询
/// - 每次睡眠被剩余预算截断：0.5s 完成的运动在 3s 超时下
///   只阻塞约 0.5s
pub fn wait_all(
    boards: &[&dyn PositionBoard],
    poll: Duration,
    timeout: Duration,
) -> Result<WaitOutcome, HalError> {
    if boards.is_empty() {
        return Ok(WaitOutcome::Completed);
    }

    let start = Instant::now();
    loop {
        let mut done = true;
        for board in boards {
            done &= board.check_motion_done()?;
        }
        if done {
            trace!(elapsed = ?start.elapsed(), "motion complete");
            return Ok(WaitOutcome::Completed);
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return Ok(WaitOutcome::TimedOut);
        }
        std::thread::sleep(poll.min(remaining));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_hal::BodyPart;
    use contour_hal::sim::SimBoard;

    /// 空集合：立即成功，零轮询耗时
    #[test]
    fn test_empty_set_completes_instantly() {
        let start = Instant::now();
        let outcome =
            wait_all(&[], Duration::from_millis(100), Duration::from_secs(3)).unwrap();
        assert!(outcome.is_completed());
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    /// 提前完成：0.5s 左右完成的运动在 3s 超时下只阻塞约 0.5s
    #[test]
    fn test_early_completion_does_not_wait_full_timeout() {
        let board = SimBoard::with_polls(BodyPart::Head, 5);
        board.position_move(&[0.0; 6]).unwrap();

        let start = Instant::now();
        let outcome = wait_all(
            &[&board],
            Duration::from_millis(100),
            Duration::from_secs(3),
        )
        .unwrap();
        let elapsed = start.elapsed();

        assert!(outcome.is_completed());
        assert!(elapsed >= Duration::from_millis(400), "elapsed: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(1), "elapsed: {:?}", elapsed);
    }

    /// 超时是放弃，不是成功
    #[test]
    fn test_timeout_reports_give_up() {
        let board = SimBoard::with_polls(BodyPart::Head, u32::MAX);
        board.position_move(&[0.0; 6]).unwrap();

        let outcome = wait_all(
            &[&board],
            Duration::from_millis(10),
            Duration::from_millis(60),
        )
        .unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    /// 复合运动：任一控制板未完成则整体未完成
    #[test]
    fn test_compound_wait_aggregates_with_and() {
        let fast = SimBoard::new(BodyPart::Head);
        let slow = SimBoard::with_polls(BodyPart::Torso, u32::MAX);
        fast.position_move(&[0.0; 6]).unwrap();
        slow.position_move(&[0.0; 3]).unwrap();

        let outcome = wait_all(
            &[&fast as &dyn PositionBoard, &slow],
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
        .unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[test]
    fn test_outcome_bitand() {
        use WaitOutcome::*;
        assert_eq!(Completed & Completed, Completed);
        assert_eq!(Completed & TimedOut, TimedOut);
        assert_eq!(TimedOut & Completed, TimedOut);
    }
}
