//! 笛卡尔控制器上下文守卫
//!
//! DOF 使能与轨迹时间是跨进程共享的控制器状态：谁改了就必须
//! 还回去，否则后续使用同一硬件的程序拿到被污染的配置。守卫
//! 把 store/restore 约束为作用域配对——`Drop` 兜底恢复，
//! 覆盖正常返回、配置失败与外部中断所有退出路径。

use std::sync::Arc;

use contour_hal::{CartesianBoard, ContextId, HalError};
use tracing::{debug, warn};

/// 作用域化的上下文守卫
///
/// 恢复是幂等的：显式 `restore` 之后 `Drop` 不会恢复第二次；
/// 没有存储过上下文时恢复是空操作，绝不 panic。
pub struct ContextGuard {
    cartesian: Arc<dyn CartesianBoard>,
    stored: Option<ContextId>,
}

impl ContextGuard {
    /// 快照当前控制器配置并持有编号
    pub fn store(cartesian: Arc<dyn CartesianBoard>) -> Result<Self, HalError> {
        let id = cartesian.store_context()?;
        debug!(context = id, "stored cartesian controller context");
        Ok(Self {
            cartesian,
            stored: Some(id),
        })
    }

    /// 显式恢复（之后守卫变为空操作）
    ///
    /// 恢复失败只告警：关闭路径上没有比"尽力恢复"更好的选择。
    pub fn restore(&mut self) {
        if let Some(id) = self.stored.take() {
            match self.cartesian.restore_context(id) {
                Ok(()) => debug!(context = id, "restored cartesian controller context"),
                Err(e) => warn!(context = id, error = %e, "failed to restore context"),
            }
        }
    }

    /// 守卫当前是否仍持有未恢复的上下文
    pub fn is_armed(&self) -> bool {
        self.stored.is_some()
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_hal::sim::SimCartesian;

    #[test]
    fn test_drop_restores_exactly_once() {
        let cart = SimCartesian::new();
        cart.set_traj_time(1.0).unwrap();
        let handle: Arc<dyn CartesianBoard> = Arc::new(cart.clone());

        {
            let _guard = ContextGuard::store(handle).unwrap();
            cart.set_traj_time(9.0).unwrap();
        }

        assert_eq!(cart.traj_time(), 1.0);
        assert_eq!(cart.restored_contexts().len(), 1);
    }

    /// 显式 restore + Drop：仍然只恢复一次
    #[test]
    fn test_explicit_restore_then_drop_is_idempotent() {
        let cart = SimCartesian::new();
        let handle: Arc<dyn CartesianBoard> = Arc::new(cart.clone());

        let mut guard = ContextGuard::store(handle).unwrap();
        assert!(guard.is_armed());
        guard.restore();
        assert!(!guard.is_armed());
        guard.restore();
        drop(guard);

        assert_eq!(cart.restored_contexts().len(), 1);
    }
}
