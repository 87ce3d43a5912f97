//! 棋谱记录格式
//!
//! 支持 JSON 格式的棋谱存储，可重放校验

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::board::BoardState;
use crate::error::RuleViolation;
use crate::fen::Fen;
use crate::message::GameOutcome;
use crate::moves::{AppliedMove, Move};
use crate::notation::Notation;
use crate::piece::{Player, Square};
use crate::rules::RuleEngine;

/// 棋谱版本
pub const RECORD_VERSION: &str = "1.0";

/// 游戏元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    /// 先手玩家（通常为远端地址）
    pub player_one: String,
    /// 后手玩家
    pub player_two: String,
    /// 棋盘大小
    pub board_size: u8,
    /// 游戏日期
    pub date: String,
    /// 游戏结果
    pub result: Option<GameOutcome>,
}

/// 走法记录（一跳或一步）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    /// 走子方
    pub player: Player,
    /// 起始格 [col, row]
    pub from: [u8; 2],
    /// 目标格 [col, row]
    pub to: [u8; 2],
    /// 被吃格
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captured: Vec<[u8; 2]>,
    /// 是否升变
    #[serde(default)]
    pub promoted: bool,
    /// 数字记谱
    pub notation: String,
    /// 走棋时的 Unix 时间戳（毫秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl MoveRecord {
    /// 由通过校验的走法创建
    pub fn new(size: u8, player: Player, applied: &AppliedMove) -> Self {
        let mv = &applied.mv;
        Self {
            player,
            from: [mv.from.col, mv.from.row],
            to: [mv.to.col, mv.to.row],
            captured: mv.captured.iter().map(|sq| [sq.col, sq.row]).collect(),
            promoted: applied.promoted,
            notation: Notation::to_standard(size, mv).unwrap_or_else(|| mv.to_string()),
            timestamp: None,
        }
    }

    /// 附带当前时间戳
    pub fn stamped(mut self) -> Self {
        self.timestamp = Some(Utc::now().timestamp_millis());
        self
    }

    /// 还原为走法（被吃格由规则引擎重新计算）
    pub fn to_move(&self) -> Move {
        Move::new(
            Square::new(self.from[0], self.from[1]),
            Square::new(self.to[0], self.to[1]),
        )
    }
}

/// 完整的棋谱记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// 版本号
    pub version: String,
    /// 元数据
    pub metadata: GameMetadata,
    /// 初始局面 FEN
    pub initial_fen: String,
    /// 走法列表
    pub moves: Vec<MoveRecord>,
}

impl GameRecord {
    /// 从初始局面创建棋谱记录
    pub fn new(player_one: String, player_two: String, initial: &BoardState) -> Self {
        Self {
            version: RECORD_VERSION.to_string(),
            metadata: GameMetadata {
                player_one,
                player_two,
                board_size: initial.board.size(),
                date: Utc::now().format("%Y-%m-%d").to_string(),
                result: None,
            },
            initial_fen: Fen::format(initial),
            moves: Vec::new(),
        }
    }

    /// 添加走法
    pub fn add_move(&mut self, mv: MoveRecord) {
        self.moves.push(mv);
    }

    /// 设置游戏结果
    pub fn set_result(&mut self, result: GameOutcome) {
        self.metadata.result = Some(result);
    }

    /// 转换为 JSON 字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// 从初始局面重放全部走法，返回最终状态
    ///
    /// 每一步都经过规则引擎校验，任何一步非法即返回错误。
    pub fn replay(&self) -> Result<BoardState, RuleViolation> {
        let mut state = Fen::parse(self.metadata.board_size, &self.initial_fen)?;

        for record in &self.moves {
            if record.player != state.turn {
                return Err(RuleViolation::NotYourTurn);
            }
            let mv = record.to_move();
            let applied = match state.chain {
                Some(chain) => RuleEngine::validate_continuation(&state.board, state.turn, &mv, chain)?,
                None => RuleEngine::validate(&state.board, state.turn, &mv)?,
            };
            applied.apply(&mut state.board);

            if applied.more_jumps {
                state.chain = Some(mv.to);
            } else {
                state.quiet_moves = if applied.is_jump() { 0 } else { state.quiet_moves + 1 };
                state.switch_turn();
            }
        }

        Ok(state)
    }

    /// 生成可读的文本格式
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("PlayerOne: {}\n", self.metadata.player_one));
        output.push_str(&format!("PlayerTwo: {}\n", self.metadata.player_two));
        output.push_str(&format!("Board: {}x{}\n", self.metadata.board_size, self.metadata.board_size));
        output.push_str(&format!("Start: {}\n", self.initial_fen));

        if !self.moves.is_empty() {
            output.push('\n');
            // 同一玩家的连跳合并为一行
            let mut line = String::new();
            let mut last: Option<Player> = None;
            for mv in &self.moves {
                if last == Some(mv.player) && !line.is_empty() {
                    line.push(' ');
                } else {
                    if !line.is_empty() {
                        output.push_str(&line);
                        output.push('\n');
                        line.clear();
                    }
                    line.push_str(&format!("{}: ", mv.player));
                }
                line.push_str(&mv.notation);
                last = Some(mv.player);
            }
            output.push_str(&line);
            output.push('\n');
        }

        if let Some(ref result) = self.metadata.result {
            output.push_str(&format!("\nResult: {:?}\n", result));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Piece;

    fn record_opening() -> GameRecord {
        let initial = BoardState::initial(8).unwrap();
        let mut record = GameRecord::new("alice".to_string(), "bob".to_string(), &initial);

        let mut board = initial.board.clone();
        for (player, from, to) in [
            (Player::PlayerOne, Square::new(2, 1), Square::new(3, 2)),
            (Player::PlayerTwo, Square::new(5, 6), Square::new(4, 5)),
        ] {
            let applied = RuleEngine::validate(&board, player, &Move::new(from, to)).unwrap();
            applied.apply(&mut board);
            record.add_move(MoveRecord::new(8, player, &applied));
        }
        record
    }

    #[test]
    fn test_game_record_json() {
        let mut record = record_opening();
        record.set_result(GameOutcome::Won(Player::PlayerOne));

        let json = record.to_json().unwrap();
        let parsed = GameRecord::from_json(&json).unwrap();

        assert_eq!(parsed.metadata.player_one, "alice");
        assert_eq!(parsed.metadata.board_size, 8);
        assert_eq!(parsed.moves.len(), 2);
        assert_eq!(parsed.metadata.result, Some(GameOutcome::Won(Player::PlayerOne)));
        assert_eq!(parsed.moves[0].notation, "6-10");
    }

    #[test]
    fn test_replay() {
        let record = record_opening();
        let state = record.replay().unwrap();

        assert_eq!(state.turn, Player::PlayerOne);
        assert_eq!(
            state.board.piece_at(Square::new(3, 2)),
            Some(Piece::man(Player::PlayerOne))
        );
        assert_eq!(
            state.board.piece_at(Square::new(4, 5)),
            Some(Piece::man(Player::PlayerTwo))
        );
        assert_eq!(state.quiet_moves, 2);
    }

    #[test]
    fn test_replay_rejects_illegal_move() {
        let mut record = record_opening();
        // 兵不能后退
        record.moves.push(MoveRecord {
            player: Player::PlayerOne,
            from: [3, 2],
            to: [2, 1],
            captured: Vec::new(),
            promoted: false,
            notation: "10-6".to_string(),
            timestamp: None,
        });
        assert!(matches!(
            record.replay(),
            Err(RuleViolation::IllegalGeometry { .. })
        ));
    }

    #[test]
    fn test_text_format() {
        let record = record_opening();
        let text = record.to_text();

        assert!(text.contains("PlayerOne: 6-10"));
        assert!(text.contains("PlayerTwo: 27-23"));
    }

    #[test]
    fn test_stamped() {
        let record = record_opening();
        let mv = record.moves[0].clone().stamped();
        assert!(mv.timestamp.is_some());
        assert_eq!(mv.to_move(), Move::new(Square::new(2, 1), Square::new(3, 2)));
    }
}
