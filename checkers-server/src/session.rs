//! 对局会话
//!
//! 一个会话对应一场两人对局，持有权威棋盘状态。会话本身不做任何 I/O，
//! 由对局任务（见 [`crate::server`]）独占并串行调用。

use protocol::{
    AppliedMove, BoardState, GameOutcome, GameRecord, Move, MoveRecord, NextTurn, Player,
    RuleEngine, RuleViolation, Square, DEFAULT_BOARD_SIZE,
};
use thiserror::Error;
use tracing::debug;

/// 连接 ID（由服务端分配）
pub type ConnId = u64;

/// 会话配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// 棋盘大小
    pub board_size: u8,
    /// 连续多少个无吃子回合判和，None 表示不启用
    pub quiet_move_limit: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            quiet_move_limit: None,
        }
    }
}

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 等待玩家加入
    AwaitingPlayers,
    /// 对局进行中
    InProgress,
    /// 已分胜负
    Won { winner: Player },
    /// 和棋
    Drawn,
    /// 中止（有玩家离开）；survivor 为留下的一方
    Aborted { survivor: Option<Player> },
}

impl SessionState {
    /// 是否为终局状态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::AwaitingPlayers | SessionState::InProgress)
    }
}

/// 会话错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session already has two players")]
    SessionFull,

    #[error("Connection {0} is already registered")]
    AlreadyRegistered(ConnId),
}

/// 一次成功走子的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResolution {
    /// 走子方
    pub player: Player,
    /// 通过校验并已生效的走法
    pub applied: AppliedMove,
    /// 接下来轮到谁
    pub next: NextTurn,
    /// 若本步结束了对局，给出结果
    pub outcome: Option<GameOutcome>,
}

/// 对局会话
pub struct GameSession {
    config: SessionConfig,
    state: SessionState,
    board: BoardState,
    /// 座位：下标 0 为 PlayerOne，1 为 PlayerTwo
    seats: [Option<ConnId>; 2],
    record: GameRecord,
}

pub(crate) fn seat(player: Player) -> usize {
    match player {
        Player::PlayerOne => 0,
        Player::PlayerTwo => 1,
    }
}

impl GameSession {
    /// 创建新会话
    pub fn new(config: SessionConfig) -> Result<Self, RuleViolation> {
        let board = BoardState::initial(config.board_size)?;
        let record = GameRecord::new(String::new(), String::new(), &board);
        Ok(Self {
            config,
            state: SessionState::AwaitingPlayers,
            board,
            seats: [None, None],
            record,
        })
    }

    /// 从指定局面创建会话（用于残局测试）
    pub fn from_state(config: SessionConfig, board: BoardState) -> Self {
        let record = GameRecord::new(String::new(), String::new(), &board);
        Self {
            config: SessionConfig {
                board_size: board.board.size(),
                ..config
            },
            state: SessionState::AwaitingPlayers,
            board,
            seats: [None, None],
            record,
        }
    }

    /// 注册连接，返回分配的身份
    pub fn register(&mut self, conn_id: ConnId) -> Result<Player, SessionError> {
        self.register_named(conn_id, format!("conn-{conn_id}"))
    }

    /// 注册连接并记录玩家名称（写入棋谱）
    ///
    /// 第一个注册的是 PlayerOne，第二个是 PlayerTwo，第二个注册时对局开始。
    pub fn register_named(
        &mut self,
        conn_id: ConnId,
        name: impl Into<String>,
    ) -> Result<Player, SessionError> {
        if self.seats.contains(&Some(conn_id)) {
            return Err(SessionError::AlreadyRegistered(conn_id));
        }
        if self.state != SessionState::AwaitingPlayers {
            return Err(SessionError::SessionFull);
        }

        let player = match self.seats {
            [None, _] => Player::PlayerOne,
            [Some(_), None] => Player::PlayerTwo,
            [Some(_), Some(_)] => return Err(SessionError::SessionFull),
        };
        self.seats[seat(player)] = Some(conn_id);
        match player {
            Player::PlayerOne => self.record.metadata.player_one = name.into(),
            Player::PlayerTwo => self.record.metadata.player_two = name.into(),
        }

        if self.seats.iter().all(Option::is_some) {
            self.state = SessionState::InProgress;
            debug!("Session started, {} to move", self.board.turn);
        }
        Ok(player)
    }

    /// 处理一次走子提议
    ///
    /// 被拒绝时会话保持原样；成功时原子地应用、记录，并判定胜负/和棋。
    pub fn apply_move(
        &mut self,
        player: Player,
        from: Square,
        to: Square,
    ) -> Result<MoveResolution, RuleViolation> {
        match self.state {
            SessionState::AwaitingPlayers => return Err(RuleViolation::GameNotStarted),
            SessionState::InProgress => {}
            _ => return Err(RuleViolation::GameAlreadyOver),
        }
        if player != self.board.turn {
            return Err(RuleViolation::NotYourTurn);
        }

        let mv = Move::new(from, to);
        let applied = match self.board.chain {
            Some(chain) => RuleEngine::validate_continuation(&self.board.board, player, &mv, chain)?,
            None => RuleEngine::validate(&self.board.board, player, &mv)?,
        };
        applied.apply(&mut self.board.board);

        let size = self.board.board.size();
        self.record
            .add_move(MoveRecord::new(size, player, &applied).stamped());

        let mut outcome = None;
        let next = if applied.more_jumps {
            self.board.chain = Some(to);
            NextTurn::ContinueJump(player)
        } else {
            self.board.quiet_moves = if applied.is_jump() {
                0
            } else {
                self.board.quiet_moves + 1
            };

            if let Some(winner) = RuleEngine::winner_after(&self.board.board, player) {
                self.state = SessionState::Won { winner };
                outcome = Some(GameOutcome::Won(winner));
            } else if self
                .config
                .quiet_move_limit
                .is_some_and(|limit| self.board.quiet_moves >= limit)
            {
                self.state = SessionState::Drawn;
                outcome = Some(GameOutcome::Drawn);
            }

            if outcome.is_some() {
                self.board.chain = None;
                NextTurn::Finished
            } else {
                self.board.switch_turn();
                NextTurn::Turn(self.board.turn)
            }
        };

        if let Some(result) = outcome {
            self.record.set_result(result);
        }

        Ok(MoveResolution {
            player,
            applied,
            next,
            outcome,
        })
    }

    /// 玩家断线或离开
    ///
    /// 未结束的会话转为 Aborted；若另一方在场，返回通知留下一方的结果。
    /// 终局状态不受影响。
    pub fn disconnect(&mut self, player: Player) -> Option<GameOutcome> {
        if self.state.is_terminal() {
            return None;
        }

        let survivor = player.opponent();
        let present = self.seats[seat(survivor)].is_some();
        self.seats[seat(player)] = None;

        if present {
            self.state = SessionState::Aborted {
                survivor: Some(survivor),
            };
            let outcome = GameOutcome::OpponentLeft(survivor);
            self.record.set_result(outcome);
            Some(outcome)
        } else {
            self.state = SessionState::Aborted { survivor: None };
            None
        }
    }

    /// 当前状态
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 当前棋盘状态
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// 会话配置
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// 某个连接对应的玩家
    pub fn player_of(&self, conn_id: ConnId) -> Option<Player> {
        [Player::PlayerOne, Player::PlayerTwo]
            .into_iter()
            .find(|&p| self.seats[seat(p)] == Some(conn_id))
    }

    /// 对局棋谱
    pub fn record(&self) -> &GameRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Board, Fen, Piece};

    fn sq(col: u8, row: u8) -> Square {
        Square::new(col, row)
    }

    fn started(config: SessionConfig) -> GameSession {
        let mut session = GameSession::new(config).unwrap();
        assert_eq!(session.register(1), Ok(Player::PlayerOne));
        assert_eq!(session.register(2), Ok(Player::PlayerTwo));
        session
    }

    fn started_from(fen: &str) -> GameSession {
        let state = Fen::parse(8, fen).unwrap();
        let mut session = GameSession::from_state(SessionConfig::default(), state);
        session.register(1).unwrap();
        session.register(2).unwrap();
        session
    }

    #[test]
    fn test_register_and_full() {
        let mut session = GameSession::new(SessionConfig::default()).unwrap();
        assert_eq!(session.state(), SessionState::AwaitingPlayers);

        assert_eq!(session.register(10), Ok(Player::PlayerOne));
        assert_eq!(session.register(10), Err(SessionError::AlreadyRegistered(10)));
        assert_eq!(session.register(11), Ok(Player::PlayerTwo));
        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.register(12), Err(SessionError::SessionFull));

        assert_eq!(session.player_of(11), Some(Player::PlayerTwo));
        assert_eq!(session.player_of(12), None);
        assert_eq!(session.record().metadata.player_one, "conn-10");
    }

    #[test]
    fn test_move_before_start() {
        let mut session = GameSession::new(SessionConfig::default()).unwrap();
        session.register(1).unwrap();
        assert_eq!(
            session.apply_move(Player::PlayerOne, sq(2, 1), sq(3, 2)),
            Err(RuleViolation::GameNotStarted)
        );
    }

    #[test]
    fn test_scripted_opening() {
        let mut session = started(SessionConfig::default());

        let res = session
            .apply_move(Player::PlayerOne, sq(2, 1), sq(3, 2))
            .unwrap();
        assert_eq!(res.next, NextTurn::Turn(Player::PlayerTwo));
        assert!(res.outcome.is_none());

        // 轮到 PlayerTwo，PlayerOne 再走被拒绝
        let before = session.board().clone();
        assert_eq!(
            session.apply_move(Player::PlayerOne, sq(3, 2), sq(4, 3)),
            Err(RuleViolation::NotYourTurn)
        );
        assert_eq!(session.board(), &before);

        let res = session
            .apply_move(Player::PlayerTwo, sq(3, 6), sq(2, 5))
            .unwrap();
        assert_eq!(res.next, NextTurn::Turn(Player::PlayerOne));
        assert_eq!(session.record().moves.len(), 2);
        session.board().board.assert_invariants();
    }

    #[test]
    fn test_rejected_move_leaves_state_unchanged() {
        let mut session = started(SessionConfig::default());
        let before = session.board().clone();

        // 兵不能后退 / 横走
        assert!(matches!(
            session.apply_move(Player::PlayerOne, sq(2, 1), sq(2, 2)),
            Err(RuleViolation::IllegalGeometry { .. })
        ));
        assert_eq!(
            session.apply_move(Player::PlayerOne, sq(9, 9), sq(8, 8)),
            Err(RuleViolation::OutOfBounds { col: 9, row: 9 })
        );
        assert_eq!(
            session.apply_move(Player::PlayerOne, sq(0, 7), sq(1, 6)),
            Err(RuleViolation::WrongOwner { col: 0, row: 7 })
        );

        assert_eq!(session.board(), &before);
        assert_eq!(session.state(), SessionState::InProgress);
        assert!(session.record().moves.is_empty());
    }

    #[test]
    fn test_capture_wins_game() {
        // PlayerOne (2,3) 吃掉 PlayerTwo 唯一的 (3,4)
        let mut session = started_from("B:W18:B14");
        assert_eq!(session.board().board.piece_at(sq(3, 4)), Some(Piece::man(Player::PlayerTwo)));

        let res = session
            .apply_move(Player::PlayerOne, sq(2, 3), sq(4, 5))
            .unwrap();
        assert_eq!(res.applied.mv.captured, vec![sq(3, 4)]);
        assert_eq!(res.next, NextTurn::Finished);
        assert_eq!(res.outcome, Some(GameOutcome::Won(Player::PlayerOne)));
        assert_eq!(
            session.state(),
            SessionState::Won {
                winner: Player::PlayerOne
            }
        );

        // 终局后不再接受走子，也不受断线影响
        assert_eq!(
            session.apply_move(Player::PlayerTwo, sq(0, 5), sq(1, 4)),
            Err(RuleViolation::GameAlreadyOver)
        );
        assert_eq!(session.disconnect(Player::PlayerTwo), None);
        assert_eq!(
            session.record().metadata.result,
            Some(GameOutcome::Won(Player::PlayerOne))
        );
    }

    #[test]
    fn test_mandatory_capture() {
        let mut session = started_from("B:W18,32:B14,1");
        assert_eq!(
            session.apply_move(Player::PlayerOne, sq(1, 0), sq(2, 1)),
            Err(RuleViolation::MustCapture)
        );
    }

    #[test]
    fn test_chain_keeps_turn() {
        // (2,1) 跳 (3,2) 到 (4,3)，再跳 (5,4) 到 (6,5)
        let mut board = Board::empty(8).unwrap();
        board.set(sq(2, 1), Some(Piece::man(Player::PlayerOne))).unwrap();
        board.set(sq(3, 2), Some(Piece::man(Player::PlayerTwo))).unwrap();
        board.set(sq(5, 4), Some(Piece::man(Player::PlayerTwo))).unwrap();
        board.set(sq(1, 6), Some(Piece::man(Player::PlayerTwo))).unwrap();
        let state = BoardState::from_board(board, Player::PlayerOne);
        let mut session = GameSession::from_state(SessionConfig::default(), state);
        session.register(1).unwrap();
        session.register(2).unwrap();

        let res = session
            .apply_move(Player::PlayerOne, sq(2, 1), sq(4, 3))
            .unwrap();
        assert!(res.applied.more_jumps);
        assert_eq!(res.next, NextTurn::ContinueJump(Player::PlayerOne));
        assert_eq!(session.board().chain, Some(sq(4, 3)));

        // 对方不能插手
        assert_eq!(
            session.apply_move(Player::PlayerTwo, sq(1, 6), sq(0, 5)),
            Err(RuleViolation::NotYourTurn)
        );

        let res = session
            .apply_move(Player::PlayerOne, sq(4, 3), sq(6, 5))
            .unwrap();
        assert!(!res.applied.more_jumps);
        assert_eq!(res.next, NextTurn::Turn(Player::PlayerTwo));
        assert_eq!(session.board().chain, None);
        assert_eq!(session.board().board.piece_count(Player::PlayerTwo), 1);
    }

    #[test]
    fn test_disconnect_mid_game() {
        let mut session = started(SessionConfig::default());
        assert_eq!(
            session.disconnect(Player::PlayerOne),
            Some(GameOutcome::OpponentLeft(Player::PlayerTwo))
        );
        assert_eq!(
            session.state(),
            SessionState::Aborted {
                survivor: Some(Player::PlayerTwo)
            }
        );
        assert_eq!(
            session.apply_move(Player::PlayerTwo, sq(3, 6), sq(2, 5)),
            Err(RuleViolation::GameAlreadyOver)
        );
    }

    #[test]
    fn test_disconnect_while_waiting() {
        let mut session = GameSession::new(SessionConfig::default()).unwrap();
        session.register(1).unwrap();
        assert_eq!(session.disconnect(Player::PlayerOne), None);
        assert_eq!(session.state(), SessionState::Aborted { survivor: None });
        assert_eq!(session.register(2), Err(SessionError::SessionFull));
    }

    #[test]
    fn test_quiet_move_draw() {
        let config = SessionConfig {
            board_size: 8,
            quiet_move_limit: Some(2),
        };
        let mut session = started(config);

        session
            .apply_move(Player::PlayerOne, sq(2, 1), sq(3, 2))
            .unwrap();
        let res = session
            .apply_move(Player::PlayerTwo, sq(5, 6), sq(6, 5))
            .unwrap();

        assert_eq!(res.outcome, Some(GameOutcome::Drawn));
        assert_eq!(res.next, NextTurn::Finished);
        assert_eq!(session.state(), SessionState::Drawn);
    }

    #[test]
    fn test_invalid_board_size() {
        let config = SessionConfig {
            board_size: 3,
            quiet_move_limit: None,
        };
        assert!(matches!(
            GameSession::new(config),
            Err(RuleViolation::InvalidBoardSize { size: 3 })
        ));
    }
}
