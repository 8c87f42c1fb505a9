//! 订阅者异常路由
//!
//! 处理器返回的失败不会传回 `post` 的调用方，而是连同上下文交给总线上
//! 可替换的 [`SubscriberExceptionHandler`]。默认实现只记录日志。
//!
use crate::bus::EventBus;
use crate::method::{AnyObject, SubscribeMethod};
use std::any::Any;
use tracing::error;

/// 一次订阅者失败的上下文
pub struct SubscriberExceptionContext<'a> {
    bus: &'a EventBus,
    event: &'a AnyObject,
    listener: &'a AnyObject,
    method: &'a SubscribeMethod,
    cause: &'a anyhow::Error,
}

impl<'a> SubscriberExceptionContext<'a> {
    pub(crate) fn new(
        bus: &'a EventBus,
        event: &'a AnyObject,
        listener: &'a AnyObject,
        method: &'a SubscribeMethod,
        cause: &'a anyhow::Error,
    ) -> Self {
        Self {
            bus,
            event,
            listener,
            method,
            cause,
        }
    }

    /// 处理该事件的总线，可用于基于失败再发布新事件
    pub fn event_bus(&self) -> &EventBus {
        self.bus
    }

    pub fn event(&self) -> &AnyObject {
        self.event
    }

    pub fn event_as<E: Any>(&self) -> Option<&E> {
        self.event.downcast_ref::<E>()
    }

    pub fn event_type(&self) -> &'static str {
        self.method.event_type()
    }

    /// 处理器所在的监听器实例
    pub fn listener(&self) -> &AnyObject {
        self.listener
    }

    pub fn listener_as<L: Any>(&self) -> Option<&L> {
        self.listener.downcast_ref::<L>()
    }

    pub fn subscribe_method(&self) -> &SubscribeMethod {
        self.method
    }

    pub fn cause(&self) -> &anyhow::Error {
        self.cause
    }
}

/// 订阅者异常处理器
pub trait SubscriberExceptionHandler: Send + Sync {
    fn handle_exception(&self, ctx: &SubscriberExceptionContext<'_>);
}

impl<F> SubscriberExceptionHandler for F
where
    F: Fn(&SubscriberExceptionContext<'_>) + Send + Sync,
{
    fn handle_exception(&self, ctx: &SubscriberExceptionContext<'_>) {
        self(ctx)
    }
}

/// 默认处理器：记录一条结构化错误日志后继续
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExceptionHandler;

impl SubscriberExceptionHandler for LoggingExceptionHandler {
    fn handle_exception(&self, ctx: &SubscriberExceptionContext<'_>) {
        let method = ctx.subscribe_method();
        error!(
            bus = %ctx.event_bus().identifier(),
            listener = method.listener_type(),
            method = method.name(),
            label = method.label().unwrap_or_default(),
            event = ctx.event_type(),
            error = %ctx.cause(),
            "exception thrown by subscriber method"
        );
    }
}
