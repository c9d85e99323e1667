//! 触觉事件聚合
//!
//! 每个控制节拍：非阻塞读取最近事件批次，归约为固定 12 通道的
//! 压力向量，并把向量发布到观测输出——无论是否有新数据，外部
//! 监视器依赖这条连续的占空信号。

use contour_hal::{HalError, SkinContact, SkinStream, TAXEL_CHANNELS, TaxelSink, TaxelVector};
use tracing::warn;

/// 越界丢弃计数达到该步长时输出一条警告（限速，而非逐事件刷屏）
const DROP_WARN_EVERY: u64 = 100;

/// 触觉事件聚合器
pub struct TactileAggregator {
    stream: Box<dyn SkinStream>,
    sink: Box<dyn TaxelSink>,
    dropped: u64,
}

impl TactileAggregator {
    pub fn new(stream: Box<dyn SkinStream>, sink: Box<dyn TaxelSink>) -> Self {
        Self {
            stream,
            sink,
            dropped: 0,
        }
    }

    /// 非阻塞读取最近批次（更早的未读批次由传输层丢弃）
    pub fn drain_latest(&self) -> Result<Option<Vec<SkinContact>>, HalError> {
        self.stream.read_latest()
    }

    /// 把一个批次归约为通道向量
    ///
    /// - 无批次 → 全零向量（"无新数据"，与"零接触"同等对待）
    /// - 批次内同通道后写覆盖先写
    /// - 越界通道逐事件丢弃：传感器枚举的通道可能多于实际接线，
    ///   不是错误，但计数并限速告警
    pub fn reduce(&mut self, batch: Option<&[SkinContact]>) -> TaxelVector {
        let mut vector = TaxelVector::zeros();
        let Some(contacts) = batch else {
            return vector;
        };
        for contact in contacts {
            if contact.taxel < TAXEL_CHANNELS {
                vector[contact.taxel] = contact.pressure;
            } else {
                self.dropped += 1;
                if self.dropped % DROP_WARN_EVERY == 1 {
                    warn!(
                        taxel = contact.taxel,
                        dropped = self.dropped,
                        "dropping out-of-range taxel events"
                    );
                }
            }
        }
        vector
    }

    /// 发布向量到观测输出
    pub fn publish(&self, vector: &TaxelVector) {
        self.sink.publish(vector);
    }

    /// 累计丢弃的越界事件数
    pub fn dropped_events(&self) -> u64 {
        self.dropped
    }

    /// 中断底层事件流（关闭路径调用）
    pub fn interrupt(&self) {
        self.stream.interrupt();
    }
}
