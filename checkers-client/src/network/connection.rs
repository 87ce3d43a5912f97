//! 网络连接管理
//!
//! 使用 protocol 库的传输层抽象

use std::thread::JoinHandle;

use anyhow::{Context, Result};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use protocol::{
    ClientMessage, Connector, FrameReader, NetworkConfig, ProtocolError,
    RuleViolation, ServerMessage, Square, TcpConnector, PROTOCOL_VERSION,
};

use super::{ClientEvent, ConnectionStatus};
use crate::game::ClientGame;

/// 网络客户端
///
/// 用于在同步的渲染循环中管理异步网络连接：所有 socket 操作都在
/// 网络线程里完成，本结构体的方法均不阻塞。
pub struct NetworkClient {
    /// 发送队列
    outgoing: Option<mpsc::UnboundedSender<ClientMessage>>,
    /// 接收队列
    events: mpsc::UnboundedReceiver<ClientEvent>,
    /// 本地镜像
    mirror: ClientGame,
    status: ConnectionStatus,
    thread: Option<JoinHandle<()>>,
}

impl NetworkClient {
    /// 启动网络线程并连接服务器
    ///
    /// 连接在后台建立，结果通过 [`ClientEvent`] 返回。
    pub fn connect(config: NetworkConfig) -> Result<Self> {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let addr = config.addr();

        let thread = std::thread::Builder::new()
            .name("checkers-net".to_string())
            .spawn(move || run_network(addr, outgoing_rx, events_tx))
            .context("无法启动网络线程")?;

        Ok(Self {
            outgoing: Some(outgoing_tx),
            events: events_rx,
            mirror: ClientGame::default(),
            status: ConnectionStatus::Connecting,
            thread: Some(thread),
        })
    }

    /// 尝试走子
    ///
    /// 先在本地镜像上预检，通过后发送给服务端；最终结果以服务端的
    /// MoveApplied 或 Rejected 为准。
    pub fn attempt_move(&mut self, from: Square, to: Square) -> Result<(), RuleViolation> {
        self.mirror.pre_check(from, to)?;

        let sent = self
            .outgoing
            .as_ref()
            .is_some_and(|tx| tx.send(ClientMessage::MoveProposal { from, to }).is_ok());
        if !sent {
            warn!("Network thread is gone, move {} -> {} dropped", from, to);
            return Err(RuleViolation::GameAlreadyOver);
        }

        debug!("Proposed {} -> {}", from, to);
        self.mirror.clear_selection();
        Ok(())
    }

    /// 取出自上次调用以来收到的事件，并应用到本地镜像
    pub fn poll_events(&mut self) -> Vec<ClientEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            self.apply(&event);
            drained.push(event);
        }
        drained
    }

    fn apply(&mut self, event: &ClientEvent) {
        match event {
            ClientEvent::Connected { player, board_size } => {
                match self.mirror.start_game(*player, *board_size) {
                    Ok(()) => {
                        info!("Game started as {} on {}x{}", player, board_size, board_size);
                        self.status = ConnectionStatus::Connected;
                    }
                    Err(e) => {
                        warn!("Cannot start mirror: {}", e);
                        self.status = ConnectionStatus::Disconnected;
                    }
                }
            }
            ClientEvent::MoveApplied { mv, promoted, next } => {
                if let Err(e) = self.mirror.apply_remote(mv, *promoted, *next) {
                    warn!("Mirror out of sync with server on {}: {}", mv, e);
                }
            }
            ClientEvent::Rejected { code } => {
                debug!("Server rejected move: {}", code);
            }
            ClientEvent::GameOver { outcome } => {
                info!("Game over: {:?}", outcome);
                self.mirror.set_outcome(*outcome);
                self.status = ConnectionStatus::Finished;
            }
            ClientEvent::Disconnected { reason } => {
                // GameOver 之后的断开是正常收尾
                if self.status != ConnectionStatus::Finished {
                    warn!("Disconnected: {}", reason);
                    self.status = ConnectionStatus::Disconnected;
                }
            }
        }
    }

    /// 本地镜像
    pub fn mirror(&self) -> &ClientGame {
        &self.mirror
    }

    /// 本地镜像（可变，用于选子等界面状态）
    pub fn mirror_mut(&mut self) -> &mut ClientGame {
        &mut self.mirror
    }

    /// 连接状态
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// 断开连接并等待网络线程退出
    pub fn shutdown(mut self) {
        self.outgoing = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Network thread panicked");
            }
        }
    }
}

/// 网络线程入口
fn run_network(
    addr: String,
    outgoing: mpsc::UnboundedReceiver<ClientMessage>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = events.send(ClientEvent::Disconnected {
                reason: format!("failed to start runtime: {e}"),
            });
            return;
        }
    };

    runtime.block_on(network_loop(addr, outgoing, events));
}

async fn network_loop(
    addr: String,
    mut outgoing: mpsc::UnboundedReceiver<ClientMessage>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let conn = match TcpConnector.connect(&addr).await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Failed to connect to {}: {}", addr, e);
            let _ = events.send(ClientEvent::Disconnected {
                reason: e.to_string(),
            });
            return;
        }
    };
    info!("Connected to server: {}", addr);

    let (reader, mut writer) = conn.split();
    // 读取放在独立任务中，避免 select! 在读到半帧时取消
    let mut read_task = tokio::spawn(read_loop(reader, events.clone()));

    loop {
        tokio::select! {
            msg = outgoing.recv() => match msg {
                Some(msg) => {
                    if let Err(e) = writer.write_frame(&msg).await {
                        let _ = events.send(ClientEvent::Disconnected {
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
                None => {
                    debug!("Client closed, leaving");
                    break;
                }
            },
            _ = &mut read_task => break,
        }
    }

    read_task.abort();
    let _ = writer.shutdown().await;
}

/// 读取任务：把服务端消息翻译为事件，GameOver 或出错后结束
async fn read_loop(mut reader: FrameReader<OwnedReadHalf>, events: mpsc::UnboundedSender<ClientEvent>) {
    loop {
        let msg = match reader.read_frame::<ServerMessage>().await {
            Ok(msg) => msg,
            Err(e) => {
                let _ = events.send(ClientEvent::Disconnected {
                    reason: e.to_string(),
                });
                return;
            }
        };

        let (event, last) = match msg {
            ServerMessage::Hello {
                version,
                assigned_player,
                board_size,
            } => {
                if version != PROTOCOL_VERSION {
                    let e = ProtocolError::VersionMismatch {
                        expected: PROTOCOL_VERSION,
                        actual: version,
                    };
                    warn!("{}", e);
                    (ClientEvent::Disconnected { reason: e.to_string() }, true)
                } else {
                    (
                        ClientEvent::Connected {
                            player: assigned_player,
                            board_size,
                        },
                        false,
                    )
                }
            }
            ServerMessage::MoveApplied { mv, promoted, next } => {
                (ClientEvent::MoveApplied { mv, promoted, next }, false)
            }
            ServerMessage::Error { code } => (ClientEvent::Rejected { code }, false),
            ServerMessage::GameOver { outcome } => (ClientEvent::GameOver { outcome }, true),
        };

        if events.send(event).is_err() || last {
            return;
        }
    }
}
