//! 终端跳棋客户端
//!
//! 用数字记谱输入走法，如 `11-15` 或 `15x22`，输入 `quit` 退出。

use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkers_client::{ClientEvent, ConnectionStatus, NetworkClient};
use protocol::{NetworkConfig, Notation};

/// 服务器地址环境变量
const ENV_ADDR: &str = "CHECKERS_ADDR";
/// 渲染循环间隔
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("checkers_client=info".parse()?))
        .init();

    let config = match std::env::var(ENV_ADDR) {
        Ok(addr) => NetworkConfig::parse(&addr)
            .with_context(|| format!("{ENV_ADDR} 格式错误: {addr:?}"))?,
        Err(_) => NetworkConfig::default(),
    };
    println!("连接 {} ...", config.addr());

    let mut client = NetworkClient::connect(config)?;
    let mut input = spawn_stdin_reader();

    loop {
        for event in client.poll_events() {
            match event {
                ClientEvent::Connected { player, .. } => {
                    println!("对局开始，你是 {player}");
                    print_board(&client);
                }
                ClientEvent::MoveApplied { .. } => print_board(&client),
                ClientEvent::Rejected { code } => println!("走法被拒绝: {code}"),
                ClientEvent::GameOver { outcome } => {
                    let verdict = match client.mirror().is_player_win() {
                        Some(true) => "你赢了",
                        Some(false) => "你输了",
                        None => "和棋",
                    };
                    println!("对局结束 ({outcome:?}): {verdict}");
                }
                ClientEvent::Disconnected { reason } => println!("连接断开: {reason}"),
            }
        }

        if matches!(
            client.status(),
            ConnectionStatus::Finished | ConnectionStatus::Disconnected
        ) {
            break;
        }

        while let Ok(line) = input.try_recv() {
            let line = line.trim();
            if line == "quit" {
                client.shutdown();
                return Ok(());
            }
            let Some(size) = client
                .mirror()
                .game_state
                .as_ref()
                .map(|s| s.board.size())
            else {
                println!("等待对手加入...");
                continue;
            };
            match Notation::parse(size, line) {
                Some(mv) => {
                    if let Err(e) = client.attempt_move(mv.from, mv.to) {
                        println!("{e}");
                    }
                }
                None => println!("无法识别的走法: {line:?}"),
            }
        }

        std::thread::sleep(FRAME_INTERVAL);
    }

    client.shutdown();
    Ok(())
}

/// 后台读取标准输入，避免阻塞渲染循环
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("无法读取标准输入: {}", e);
    }
    rx
}

fn print_board(client: &NetworkClient) {
    let mirror = client.mirror();
    let Some(state) = &mirror.game_state else {
        return;
    };
    if let Some(last) = mirror.move_history.last() {
        println!("{}: {}", last.player, last.notation);
    }
    print!("{}", state.board);
    match (mirror.outcome, mirror.is_my_turn()) {
        (Some(_), _) => {}
        (None, true) => match state.chain {
            Some(sq) => println!("继续连跳 {sq}"),
            None => println!("轮到你走"),
        },
        (None, false) => println!("等待 {} 走子", state.turn),
    }
}
