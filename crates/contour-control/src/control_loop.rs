//! 控制循环
//!
//! 固定周期节拍：读皮肤事件 → 归约 → 发布 → （有新数据时）
//! 调用控制律。节拍状态是每拍的，不粘滞：REACTING 仅在本拍
//! 读到批次时成立，随本拍结果一起返回。

use contour_hal::HalError;
use tracing::trace;

use crate::skin::TactileAggregator;
use crate::strategy::{ContourStrategy, PoseGoal};

/// 节拍状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickState {
    /// 本拍没有读到新批次
    #[default]
    Idle,
    /// 本拍读到了批次
    Reacting,
}

/// 控制循环
pub struct ControlLoop {
    aggregator: TactileAggregator,
    strategy: Box<dyn ContourStrategy>,
    ticks: u64,
}

impl ControlLoop {
    pub fn new(aggregator: TactileAggregator, strategy: Box<dyn ContourStrategy>) -> Self {
        Self {
            aggregator,
            strategy,
            ticks: 0,
        }
    }

    /// 执行一个节拍，返回本拍状态与控制律给出的位姿目标（如有）
    ///
    /// 发布无条件发生：没有新数据也发布全零向量，维持占空信号。
    /// 状态是每拍的返回值，不跨拍保留。
    pub fn tick(&mut self) -> Result<(TickState, Option<PoseGoal>), HalError> {
        self.ticks += 1;
        let batch = self.aggregator.drain_latest()?;
        let vector = self.aggregator.reduce(batch.as_deref());
        self.aggregator.publish(&vector);

        match batch {
            Some(_) => {
                trace!(tick = self.ticks, "tactile batch drained, stepping strategy");
                let goal = self.strategy.step(&vector);
                Ok((TickState::Reacting, goal))
            }
            None => Ok((TickState::Idle, None)),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// 中断底层皮肤事件流
    pub fn interrupt(&self) {
        self.aggregator.interrupt();
    }
}
