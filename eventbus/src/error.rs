//! 事件总线统一错误定义
//!
//! 只覆盖需要同步返回给调用方的错误：
//! - 配置错误：注册/发现阶段发现订阅方法声明不合法；
//! - 一致性错误：注销时索引与监听器记录不一致（重复注销等生命周期误用）；
//! - 执行器错误：执行策略无法构建。
//!
//! 订阅方法内部返回的失败不会出现在这里，它们只会被路由到
//! [`SubscriberExceptionHandler`](crate::SubscriberExceptionHandler)。
//!
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BusError {
    // --- 配置 ---
    #[error("invalid subscriber: listener={listener}, method={method}, reason={reason}")]
    InvalidSubscriber {
        listener: &'static str,
        method: &'static str,
        reason: String,
    },

    // --- 一致性 ---
    #[error("listener is not registered: {listener} (unregistered twice?)")]
    NotRegistered { listener: &'static str },
    #[error(
        "missing event subscriber: listener={listener}, method={method}, event={event}. Is the listener registered?"
    )]
    MissingSubscriber {
        listener: &'static str,
        method: &'static str,
        event: &'static str,
    },

    // --- 执行器 ---
    #[error("executor error: {reason}")]
    Executor { reason: String },
}

/// 统一 Result 类型别名
pub type BusResult<T> = Result<T, BusError>;

impl BusError {
    /// 是否为一致性错误（注销路径上的生命周期误用）
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            BusError::NotRegistered { .. } | BusError::MissingSubscriber { .. }
        )
    }
}
