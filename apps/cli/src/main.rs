//! # Contour CLI
//!
//! 在模拟后端上运行接触式轮廓跟随模块。
//!
//! ```bash
//! contour-cli --robot icubSim --arm right_arm --period 0.01
//! ```
//!
//! 标准输入是命令面：每行一个令牌（当前识别 `home`），应答打印
//! 到标准输出。Ctrl-C 触发关闭序列，保证恢复控制器上下文后退出。
//! 生产部署用实现了 `contour-hal` 能力 trait 的真实后端替换
//! 这里的模拟设备装配。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use contour_control::{
    ActiveArm, CommandRequest, ContourModule, Devices, ModuleConfig, NoopStrategy, command_channel,
};
use contour_hal::sim::{SimBoard, SimCartesian, SimFinger, SimSkin, SimTaxelSink};
use contour_hal::{BodyPart, SkinContact};

/// 接触式轮廓跟随控制器（模拟后端）
#[derive(Parser, Debug)]
#[command(name = "contour-cli")]
#[command(about = "Tactile contour-following controller (simulated backend)", long_about = None)]
#[command(version)]
struct Cli {
    /// 目标机器人标识（网络命名空间）
    #[arg(long, default_value = "icubSim")]
    robot: String,

    /// 主动臂：right_arm 或 left_arm
    #[arg(long, default_value = "right_arm")]
    arm: ActiveArm,

    /// 控制节拍周期（秒）
    #[arg(long, default_value_t = 0.01)]
    period: f64,

    /// 模块名（观测通道前缀）
    #[arg(long, default_value = "/contour_following")]
    name: String,

    /// 产生合成接触事件，演示 REACTING 节拍
    #[arg(long)]
    sim_contacts: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("contour=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = ModuleConfig {
        name: cli.name,
        robot: cli.robot,
        arm: cli.arm,
        period: Duration::from_secs_f64(cli.period),
        ..ModuleConfig::default()
    };

    // 中断信号 → 关闭标志；run 在下一拍退出并走关闭序列
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal, shutting down...");
            shutdown.store(true, Ordering::Relaxed);
        })?;
    }

    // 模拟设备装配
    let (skin_tx, skin) = SimSkin::channel(32);
    let (sink, taxel_rx) = SimTaxelSink::channel(256);
    let devices = Devices {
        right_arm: Box::new(SimBoard::new(BodyPart::RightArm)),
        left_arm: Box::new(SimBoard::new(BodyPart::LeftArm)),
        head: Box::new(SimBoard::new(BodyPart::Head)),
        torso: Box::new(SimBoard::new(BodyPart::Torso)),
        cartesian: Arc::new(SimCartesian::new()),
        finger: Box::new(SimFinger),
        skin: Box::new(skin),
        taxel_out: Box::new(sink),
    };
    // 观测输出在本进程内无人消费，后台排空避免撑满
    std::thread::spawn(move || while taxel_rx.recv().is_ok() {});

    if cli.sim_contacts {
        let shutdown = shutdown.clone();
        std::thread::spawn(move || {
            let mut taxel = 0usize;
            while !shutdown.load(Ordering::Relaxed) {
                let batch = vec![SkinContact::new(taxel, 0.5)];
                if skin_tx.send(batch).is_err() {
                    break;
                }
                taxel = (taxel + 1) % 12;
                std::thread::sleep(Duration::from_millis(50));
            }
        });
    }

    // 标准输入命令面
    let (cmd_tx, cmd_rx) = command_channel(8);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            let token = line.trim();
            if token.is_empty() {
                continue;
            }
            let (request, reply_rx) = CommandRequest::new(token);
            if cmd_tx.send(request).is_err() {
                break;
            }
            match reply_rx.recv_timeout(Duration::from_secs(10)) {
                Ok(reply) => println!("{reply}"),
                Err(_) => warn!("no reply from control loop"),
            }
        }
    });

    // 启动失败中止进程并指出失败步骤；close 由 Drop 兜底
    let mut module = ContourModule::open(config, Box::new(NoopStrategy), |_| {
        // 模拟后端的"打开"不会失败；真实后端在此连接远端控制板
        Ok(devices)
    })?;
    module.configure()?;

    module.run(&shutdown, &cmd_rx);
    module.close();

    info!(
        ticks = module.ticks(),
        overruns = module.overruns(),
        "done"
    );
    Ok(())
}
