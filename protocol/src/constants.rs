//! 协议常量定义

use std::time::Duration;

/// 协议版本号（在 Hello 握手消息中携带）
pub const PROTOCOL_VERSION: u8 = 1;

/// 默认棋盘边长
pub const DEFAULT_BOARD_SIZE: u8 = 8;

/// 支持的最小棋盘边长
pub const MIN_BOARD_SIZE: u8 = 4;

/// 支持的最大棋盘边长
pub const MAX_BOARD_SIZE: u8 = 16;

/// 消息帧负载最大大小
pub const MAX_FRAME_SIZE: usize = 1024;

/// 帧头大小: 1 字节类型 + 4 字节长度
pub const FRAME_HEADER_SIZE: usize = 5;

/// 默认服务端端口
pub const DEFAULT_PORT: u16 = 9527;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
