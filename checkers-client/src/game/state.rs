//! 客户端对局镜像
//!
//! 服务端是权威状态，客户端只按收到的 MoveApplied 推进本地副本，
//! 用于渲染和走子前的本地预检。

use protocol::{
    AppliedMove, BoardState, GameOutcome, Move, NextTurn, Notation, Player, RuleEngine,
    RuleViolation, Square,
};

/// 走法记录
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRecord {
    pub player: Player,
    pub notation: String,
    pub from: Square,
    pub to: Square,
}

/// 客户端游戏状态
#[derive(Debug, Default)]
pub struct ClientGame {
    /// 当前局面（握手前为 None）
    pub game_state: Option<BoardState>,
    /// 本方身份
    pub player: Option<Player>,
    /// 选中的棋子
    pub selected: Option<Square>,
    /// 选中棋子的合法落点
    pub valid_moves: Vec<Square>,
    /// 最后一步走法
    pub last_move: Option<Move>,
    /// 棋谱
    pub move_history: Vec<MoveRecord>,
    /// 游戏结果
    pub outcome: Option<GameOutcome>,
}

impl ClientGame {
    /// 重置游戏状态
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 握手完成，开始新对局
    pub fn start_game(&mut self, player: Player, board_size: u8) -> Result<(), RuleViolation> {
        self.reset();
        self.game_state = Some(BoardState::initial(board_size)?);
        self.player = Some(player);
        Ok(())
    }

    /// 当前走子方
    pub fn current_turn(&self) -> Option<Player> {
        self.game_state.as_ref().map(|s| s.turn)
    }

    /// 是否轮到本方
    pub fn is_my_turn(&self) -> bool {
        self.outcome.is_none() && self.player.is_some() && self.current_turn() == self.player
    }

    /// 连跳中必须继续跳的格子
    pub fn chain(&self) -> Option<Square> {
        self.game_state.as_ref().and_then(|s| s.chain)
    }

    /// 走子前的本地预检
    ///
    /// 与服务端使用相同的规则引擎，通过不代表服务端一定接受。
    pub fn pre_check(&self, from: Square, to: Square) -> Result<AppliedMove, RuleViolation> {
        let (Some(state), Some(player)) = (&self.game_state, self.player) else {
            return Err(RuleViolation::GameNotStarted);
        };
        if self.outcome.is_some() {
            return Err(RuleViolation::GameAlreadyOver);
        }
        if state.turn != player {
            return Err(RuleViolation::NotYourTurn);
        }

        let mv = Move::new(from, to);
        match state.chain {
            Some(chain) => RuleEngine::validate_continuation(&state.board, player, &mv, chain),
            None => RuleEngine::validate(&state.board, player, &mv),
        }
    }

    /// 选择棋子，返回其合法落点
    pub fn select(&mut self, sq: Square) -> &[Square] {
        self.clear_selection();

        let Some(state) = &self.game_state else {
            return &self.valid_moves;
        };
        if !self.is_my_turn() {
            return &self.valid_moves;
        }
        if state.chain.is_some_and(|chain| chain != sq) {
            return &self.valid_moves;
        }

        let player = state.turn;
        let targets: Vec<Square> = RuleEngine::legal_moves(&state.board, player)
            .into_iter()
            .filter(|m| m.from == sq)
            .map(|m| m.to)
            .collect();
        if !targets.is_empty() {
            self.selected = Some(sq);
            self.valid_moves = targets;
        }
        &self.valid_moves
    }

    /// 清除选择
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.valid_moves.clear();
    }

    /// 应用服务端广播的走法
    ///
    /// 走法由引擎在镜像上重新校验；校验失败说明镜像与服务端不同步。
    pub fn apply_remote(
        &mut self,
        mv: &Move,
        promoted: bool,
        next: NextTurn,
    ) -> Result<(), RuleViolation> {
        let Some(state) = self.game_state.as_mut() else {
            return Err(RuleViolation::GameNotStarted);
        };
        let mover = state.turn;

        let applied = match state.chain {
            Some(chain) => RuleEngine::validate_continuation(&state.board, mover, mv, chain)?,
            None => RuleEngine::validate(&state.board, mover, mv)?,
        };
        if applied.mv.captured != mv.captured || applied.promoted != promoted {
            tracing::warn!("Mirror resolved {} differently from server", mv);
        }
        applied.apply(&mut state.board);

        match next {
            NextTurn::ContinueJump(_) => state.chain = Some(mv.to),
            NextTurn::Turn(player) => {
                state.quiet_moves = if applied.is_jump() { 0 } else { state.quiet_moves + 1 };
                state.switch_turn();
                if state.turn != player {
                    tracing::warn!("Server says {} to move, mirror says {}", player, state.turn);
                    state.turn = player;
                }
            }
            NextTurn::Finished => state.chain = None,
        }

        let size = state.board.size();
        self.move_history.push(MoveRecord {
            player: mover,
            notation: Notation::to_standard(size, &applied.mv).unwrap_or_else(|| mv.to_string()),
            from: mv.from,
            to: mv.to,
        });
        self.last_move = Some(applied.mv);
        self.clear_selection();
        Ok(())
    }

    /// 设置游戏结果
    pub fn set_outcome(&mut self, outcome: GameOutcome) {
        self.outcome = Some(outcome);
        self.clear_selection();
    }

    /// 本方是否获胜（未结束或和棋返回 None）
    pub fn is_player_win(&self) -> Option<bool> {
        match (self.outcome, self.player) {
            (Some(GameOutcome::Won(winner)), Some(me)) => Some(winner == me),
            (Some(GameOutcome::OpponentLeft(survivor)), Some(me)) => Some(survivor == me),
            _ => None,
        }
    }

    /// 获取总步数
    pub fn total_moves(&self) -> usize {
        self.move_history.len()
    }
}
