//! 操作员命令接口
//!
//! 同步请求/应答：单个字符串令牌进，单个确认字符串出。命令与
//! 控制节拍运行在同一协作线程上，二者互斥——节拍进行中不处理
//! 命令，反之亦然；因此处理时长的上界就是姿态序列的有界超时。

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::warn;

use crate::sequencer::PoseSequencer;

/// 识别的命令令牌集合
pub const RECOGNIZED: &[&str] = &["home"];

/// 一条待应答的命令请求
pub struct CommandRequest {
    pub token: String,
    pub reply: Sender<String>,
}

impl CommandRequest {
    /// 构造请求与对应的应答接收端
    pub fn new(token: impl Into<String>) -> (Self, Receiver<String>) {
        let (reply, rx) = bounded(1);
        (
            Self {
                token: token.into(),
                reply,
            },
            rx,
        )
    }
}

/// 创建命令通道
pub fn command_channel(capacity: usize) -> (Sender<CommandRequest>, Receiver<CommandRequest>) {
    bounded(capacity)
}

/// 处理单个命令令牌
///
/// `home` → 回初始姿态并确认；未识别令牌 → 返回解释性消息，
/// 不改变任何状态。
pub fn respond(sequencer: &PoseSequencer, token: &str) -> String {
    match token {
        "home" => {
            let ack = "Going back home".to_string();
            if let Err(e) = sequencer.home_all_segments() {
                warn!(error = %e, "homing on operator command failed");
            }
            ack
        }
        _ => format!(
            "Command not recognized. Available commands: {}",
            RECOGNIZED.join(", ")
        ),
    }
}
