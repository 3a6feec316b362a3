//! 证书处理上下文
//!
//! 封装"我正在处理第几个证书、用的是哪个浏览器会话"这一信息，只用于日志

use std::fmt::Display;

/// 证书处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 证书在输入表中的序号（从1开始）
    pub item_index: usize,

    /// 证书总数
    pub total: usize,

    /// 证书ID
    pub item_id: String,

    /// 浏览器会话编号（从1开始）
    pub session: usize,
}

impl ItemCtx {
    /// 创建新的证书上下文
    pub fn new(
        item_index: usize,
        total: usize,
        item_id: impl Into<String>,
        session: usize,
    ) -> Self {
        Self {
            item_index,
            total,
            item_id: item_id.into(),
            session,
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[证书 {}/{} ID#{} 会话#{}]",
            self.item_index, self.total, self.item_id, self.session
        )
    }
}
