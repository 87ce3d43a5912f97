//! 游戏逻辑模块
//!
//! 客户端只持有服务端权威状态的镜像

mod state;

pub use state::*;
