//! 服务器主逻辑
//!
//! 接收器按到达顺序两两配对连接，每场对局由一个独立的对局任务驱动：
//! 该任务独占 [`GameSession`]，通过 mpsc 通道串行接收读写任务上报的事件。

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use protocol::{
    ClientMessage, Connection, ErrorCode, FrameReader, FrameWriter, GameOutcome, Listener, Player,
    ProtocolError, ServerMessage, Square, TcpConnection, TcpListener, PROTOCOL_VERSION,
};

use crate::config::ServerConfig;
use crate::session::{seat, ConnId, GameSession, SessionConfig, SessionState};
use crate::storage::StorageManager;

/// 对局事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 64;
/// 每个连接的发送队列容量
const OUTBOX_CAPACITY: usize = 32;

/// 新到达的连接
struct Arrival {
    conn_id: ConnId,
    conn: TcpConnection,
}

/// 对局任务接收的事件
enum MatchEvent {
    /// 走子提议
    Proposal {
        player: Player,
        from: Square,
        to: Square,
    },
    /// 读取失败（断线或协议错误）
    ReadFailed { player: Player, error: ProtocolError },
    /// 写入失败
    WriteFailed { player: Player, error: ProtocolError },
}

/// 对战服务器
pub struct Server {
    listener: TcpListener,
    session_config: SessionConfig,
    storage: Option<Arc<StorageManager>>,
}

impl Server {
    /// 绑定监听地址
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        // 棋盘大小在启动时校验，避免每场对局创建时才失败
        GameSession::new(config.session()).context("无效的对局配置")?;

        let addr = config.network.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听 {addr}"))?;

        let storage = match &config.save_dir {
            Some(dir) => match StorageManager::new(dir) {
                Ok(storage) => {
                    info!("棋谱保存目录: {:?}", storage.records_directory());
                    Some(Arc::new(storage))
                }
                Err(e) => {
                    warn!("棋谱存储不可用，对局将不被保存: {:#}", e);
                    None
                }
            },
            None => None,
        };

        info!(
            "服务器监听 {} (棋盘 {}x{})",
            listener.local_addr().unwrap_or(addr),
            config.board_size,
            config.board_size
        );

        Ok(Self {
            listener,
            session_config: config.session(),
            storage,
        })
    }

    /// 实际监听地址
    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    /// 运行接收循环（不会主动返回）
    pub async fn run(mut self) -> Result<()> {
        let (requeue_tx, mut requeue_rx) = mpsc::unbounded_channel::<Arrival>();
        let mut waiting: Option<mpsc::Sender<Arrival>> = None;
        let mut next_conn: ConnId = 0;
        let mut next_match: u64 = 0;

        loop {
            let arrival = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => {
                        next_conn += 1;
                        info!(
                            "新连接 #{} 来自 {}",
                            next_conn,
                            conn.peer_addr().unwrap_or_else(|| "unknown".to_string())
                        );
                        Arrival { conn_id: next_conn, conn }
                    }
                    Err(e) => {
                        warn!("接受连接失败: {}", e);
                        continue;
                    }
                },
                Some(arrival) = requeue_rx.recv() => arrival,
            };

            // 优先补进正在等人的对局；该对局已结束时连接会被退回
            let mut arrival = arrival;
            if let Some(tx) = waiting.take() {
                match tx.send(arrival).await {
                    Ok(()) => continue,
                    Err(mpsc::error::SendError(returned)) => arrival = returned,
                }
            }

            next_match += 1;
            let (actor, joins_tx) = MatchActor::new(
                next_match,
                self.session_config,
                requeue_tx.clone(),
                self.storage.clone(),
            )?;
            waiting = Some(joins_tx);
            tokio::spawn(actor.run(arrival));
        }
    }
}

/// 对局任务
struct MatchActor {
    id: u64,
    session: GameSession,
    joins: mpsc::Receiver<Arrival>,
    events_tx: mpsc::Sender<MatchEvent>,
    events: mpsc::Receiver<MatchEvent>,
    /// 玩家 -> 发送队列
    outboxes: [Option<mpsc::Sender<ServerMessage>>; 2],
    writers: [Option<JoinHandle<()>>; 2],
    readers: Vec<JoinHandle<()>>,
    requeue: mpsc::UnboundedSender<Arrival>,
    storage: Option<Arc<StorageManager>>,
}

impl MatchActor {
    fn new(
        id: u64,
        config: SessionConfig,
        requeue: mpsc::UnboundedSender<Arrival>,
        storage: Option<Arc<StorageManager>>,
    ) -> Result<(Self, mpsc::Sender<Arrival>)> {
        let (joins_tx, joins) = mpsc::channel(2);
        let (events_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let actor = Self {
            id,
            session: GameSession::new(config)?,
            joins,
            events_tx,
            events,
            outboxes: [None, None],
            writers: [None, None],
            readers: Vec::new(),
            requeue,
            storage,
        };
        Ok((actor, joins_tx))
    }

    async fn run(mut self, first: Arrival) {
        self.handle_join(first);

        while !self.session.state().is_terminal() {
            let event = tokio::select! {
                Some(arrival) = self.joins.recv() => {
                    self.handle_join(arrival);
                    continue;
                }
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            match event {
                MatchEvent::Proposal { player, from, to } => self.handle_proposal(player, from, to),
                MatchEvent::ReadFailed { player, error } | MatchEvent::WriteFailed { player, error } => {
                    self.handle_failure(player, error)
                }
            }
        }

        self.finish();
    }

    /// 发送消息给玩家
    ///
    /// 对局任务从不等待发送队列；队列已满说明对端不再读取，按断线处理。
    fn send_to_player(&mut self, player: Player, msg: ServerMessage) {
        let Some(tx) = &self.outboxes[seat(player)] else {
            return;
        };
        match tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let error = ProtocolError::Io(std::io::Error::new(
                    std::io::ErrorKind::WouldBlock,
                    "send queue full",
                ));
                self.handle_failure(player, error);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("对局 #{} {} 的发送队列已关闭", self.id, player);
            }
        }
    }

    /// 广播消息给双方
    fn broadcast(&mut self, msg: ServerMessage) {
        self.send_to_player(Player::PlayerOne, msg.clone());
        self.send_to_player(Player::PlayerTwo, msg);
    }

    fn handle_join(&mut self, arrival: Arrival) {
        let name = arrival
            .conn
            .peer_addr()
            .unwrap_or_else(|| format!("conn-{}", arrival.conn_id));

        let player = match self.session.register_named(arrival.conn_id, name) {
            Ok(player) => player,
            Err(e) => {
                warn!("对局 #{} 拒绝连接 #{}: {}", self.id, arrival.conn_id, e);
                let _ = self.requeue.send(arrival);
                return;
            }
        };
        info!("对局 #{}: 连接 #{} 成为 {}", self.id, arrival.conn_id, player);

        let (reader, writer) = arrival.conn.split();
        let (outbox_tx, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);
        self.outboxes[seat(player)] = Some(outbox_tx);
        self.readers
            .push(spawn_reader(player, reader, self.events_tx.clone()));
        self.writers[seat(player)] = Some(spawn_writer(
            player,
            writer,
            outbox_rx,
            self.events_tx.clone(),
        ));

        if self.session.state() == SessionState::InProgress {
            info!("对局 #{} 开始", self.id);
            let board_size = self.session.config().board_size;
            for player in [Player::PlayerOne, Player::PlayerTwo] {
                self.send_to_player(
                    player,
                    ServerMessage::Hello {
                        version: PROTOCOL_VERSION,
                        assigned_player: player,
                        board_size,
                    },
                );
            }
        }
    }

    fn handle_proposal(&mut self, player: Player, from: Square, to: Square) {
        match self.session.apply_move(player, from, to) {
            Ok(resolution) => {
                debug!(
                    "对局 #{}: {} 走 {} -> {:?}",
                    self.id, player, resolution.applied.mv, resolution.next
                );
                self.broadcast(ServerMessage::MoveApplied {
                    mv: resolution.applied.mv,
                    promoted: resolution.applied.promoted,
                    next: resolution.next,
                });

                if let Some(outcome) = resolution.outcome {
                    info!("对局 #{} 结束: {:?}", self.id, outcome);
                    self.broadcast(ServerMessage::GameOver { outcome });
                }
            }
            Err(violation) => {
                debug!("对局 #{}: 拒绝 {} 的走法: {}", self.id, player, violation);
                self.send_to_player(
                    player,
                    ServerMessage::Error {
                        code: ErrorCode::from(&violation),
                    },
                );
            }
        }
    }

    fn handle_failure(&mut self, player: Player, error: ProtocolError) {
        if error.is_transport() {
            info!("对局 #{}: {} 断开连接: {}", self.id, player, error);
        } else {
            warn!("对局 #{}: {} 协议错误: {}", self.id, player, error);
        }

        // 关闭该玩家的发送队列，未发出的消息直接丢弃
        self.outboxes[seat(player)] = None;
        if let Some(writer) = self.writers[seat(player)].take() {
            writer.abort();
        }

        if let Some(outcome @ GameOutcome::OpponentLeft(survivor)) = self.session.disconnect(player) {
            self.send_to_player(survivor, ServerMessage::GameOver { outcome });
        }
    }

    fn finish(mut self) {
        // 对局已结束但尚未处理的加入请求交还接收器
        self.joins.close();
        while let Ok(arrival) = self.joins.try_recv() {
            let _ = self.requeue.send(arrival);
        }

        for reader in self.readers.drain(..) {
            reader.abort();
        }

        let state = self.session.state();
        info!("对局 #{} 关闭: {:?}", self.id, state);

        let played = !self.session.record().moves.is_empty();
        if let (Some(storage), true) = (self.storage.clone(), played) {
            let record = self.session.record().clone();
            let id = self.id;
            tokio::task::spawn_blocking(move || match storage.save_record(&record) {
                Ok(record_id) => info!("对局 #{} 棋谱已保存: {}", id, record_id),
                Err(e) => error!("对局 #{} 棋谱保存失败: {:#}", id, e),
            });
        }
        // outboxes 随 self 释放，写任务发完剩余消息后关闭连接
    }
}

/// 读取任务：解码客户端消息并转交对局任务
fn spawn_reader(
    player: Player,
    mut reader: FrameReader<OwnedReadHalf>,
    events: mpsc::Sender<MatchEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match reader.read_frame::<ClientMessage>().await {
                Ok(ClientMessage::MoveProposal { from, to }) => {
                    MatchEvent::Proposal { player, from, to }
                }
                Err(error) => {
                    let _ = events.send(MatchEvent::ReadFailed { player, error }).await;
                    break;
                }
            };
            if events.send(event).await.is_err() {
                break;
            }
        }
    })
}

/// 写入任务：按顺序发送队列中的消息
fn spawn_writer(
    player: Player,
    mut writer: FrameWriter<OwnedWriteHalf>,
    mut outbox: mpsc::Receiver<ServerMessage>,
    events: mpsc::Sender<MatchEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            if let Err(error) = writer.write_frame(&msg).await {
                let _ = events.send(MatchEvent::WriteFailed { player, error }).await;
                return;
            }
        }
        let _ = writer.shutdown().await;
    })
}
