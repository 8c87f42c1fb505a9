//! 事件总线（EventBus）
//!
//! 对外门面：持有订阅者注册表、执行策略与异常处理器，提供注册、注销与发布。
//!
//! - 事件只分发给订阅了其**精确运行时类型**的订阅者，不会沿类型层次向上匹配；
//! - 订阅者按优先级降序被调度，同优先级按注册先后；
//! - 发布是“调度即返回”：同步策略下调度即完成，池化策略下只保证提交顺序；
//! - 处理器失败只会交给异常处理器，不会传回发布方，也不会中断其余订阅者。
//!
//! 发布与单个处理器调用均没有取消或超时：同步总线上卡住的处理器会一直阻塞发布方，
//! 池化总线上则一直占用一个工作线程。
//!
use crate::discovery::MethodCache;
use crate::error::BusResult;
use crate::exception::{
    LoggingExceptionHandler, SubscriberExceptionContext, SubscriberExceptionHandler,
};
use crate::executor::{DirectExecutor, Executor, panic_message};
use crate::listener::Listener;
use crate::method::AnyObject;
use crate::registry::{SubscriberRegistry, Subscribers};
use crate::subscriber::ListenerId;
use bon::Builder;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, trace};

/// 默认总线标识
pub const DEFAULT_IDENTIFIER: &str = "default";

/// 总线配置
///
/// ```
/// use eventbus::{EventBus, EventBusConfig, SingleThreadExecutor};
/// use std::sync::Arc;
///
/// let config = EventBusConfig::builder()
///     .identifier("orders")
///     .executor(Arc::new(SingleThreadExecutor::new("orders-bus").unwrap()))
///     .build();
/// let bus = EventBus::with_config(config);
/// assert_eq!(bus.identifier(), "orders");
/// ```
#[derive(Builder)]
pub struct EventBusConfig {
    #[builder(into, default = DEFAULT_IDENTIFIER.to_string())]
    identifier: String,
    #[builder(default = Arc::new(DirectExecutor) as Arc<dyn Executor>)]
    executor: Arc<dyn Executor>,
    #[builder(default = Arc::new(LoggingExceptionHandler) as Arc<dyn SubscriberExceptionHandler>)]
    exception_handler: Arc<dyn SubscriberExceptionHandler>,
    /// 可在多条总线之间共享的订阅方法缓存
    #[builder(default)]
    method_cache: Arc<MethodCache>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

struct BusInner {
    identifier: String,
    executor: Arc<dyn Executor>,
    exception_handler: Arc<dyn SubscriberExceptionHandler>,
    method_cache: Arc<MethodCache>,
    registry: SubscriberRegistry,
}

/// 进程内事件总线，克隆后共享同一份注册表
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// 同步总线，标识为 `"default"`
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// 同步总线
    pub fn with_identifier(identifier: impl Into<String>) -> Self {
        Self::with_config(EventBusConfig::builder().identifier(identifier).build())
    }

    /// 通过执行策略异步分发的总线
    pub fn asynchronous(identifier: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        Self::with_config(
            EventBusConfig::builder()
                .identifier(identifier)
                .executor(executor)
                .build(),
        )
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let registry = SubscriberRegistry::new(Arc::clone(&config.method_cache));
        Self {
            inner: Arc::new(BusInner {
                identifier: config.identifier,
                executor: config.executor,
                exception_handler: config.exception_handler,
                method_cache: config.method_cache,
                registry,
            }),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.inner.identifier
    }

    pub fn method_cache(&self) -> &Arc<MethodCache> {
        &self.inner.method_cache
    }

    /// 注册监听器上的全部订阅方法
    ///
    /// 同一实例重复注册是空操作；订阅方法声明有误时返回配置错误。
    ///
    /// 总线在注销前一直持有监听器。监听器若保存了总线的克隆，会形成
    /// 总线 -> 订阅者 -> 监听器 -> 总线 的引用环，需要显式 `unregister` 才能释放。
    pub fn register<L: Listener>(&self, listener: Arc<L>) -> BusResult<()> {
        self.inner.registry.register(self, listener)
    }

    /// 注销监听器上的全部订阅者
    ///
    /// 从未注册过的监听器静默忽略；同一实例注销两次返回
    /// [`BusError::NotRegistered`](crate::BusError::NotRegistered)。
    pub fn unregister<L: Listener>(&self, listener: &Arc<L>) -> BusResult<()> {
        self.inner.registry.unregister(self, listener)
    }

    pub fn is_registered<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.inner.registry.is_registered(ListenerId::of(listener))
    }

    /// 事件类型 `E` 当前订阅者的快照（按调度顺序）
    pub fn subscribers_of<E: Any>(&self) -> Subscribers {
        self.inner.registry.subscribers_for(TypeId::of::<E>())
    }

    /// 发布事件
    ///
    /// 没有订阅者的事件被静默丢弃。
    pub fn post<E: Any + Send + Sync>(&self, event: E) {
        let subscribers = self.inner.registry.subscribers_for(TypeId::of::<E>());
        self.dispatch(subscribers, type_name::<E>(), || {
            Arc::new(event) as Arc<AnyObject>
        });
    }

    /// 发布已共享的事件，按其运行时类型分发
    pub fn post_shared(&self, event: Arc<AnyObject>) {
        // 先转为 &dyn Any，取到的才是值本身的类型，而不是 Arc 或 trait 对象的
        let value: &dyn Any = event.as_ref();
        let subscribers = self.inner.registry.subscribers_for(value.type_id());
        self.dispatch(subscribers, "<shared>", move || event);
    }

    fn dispatch(
        &self,
        subscribers: Subscribers,
        event_type: &'static str,
        event: impl FnOnce() -> Arc<AnyObject>,
    ) {
        if subscribers.is_empty() {
            trace!(
                bus = %self.identifier(),
                event = event_type,
                "no subscribers, event dropped"
            );
            return;
        }

        let event = event();
        trace!(
            bus = %self.identifier(),
            event = subscribers[0].method().event_type(),
            subscribers = subscribers.len(),
            "dispatch event"
        );
        for subscriber in subscribers.iter() {
            subscriber.dispatch(self, Arc::clone(&event));
        }
    }

    /// 把订阅者失败交给异常处理器；处理器自身 panic 只记录日志
    pub(crate) fn handle_subscriber_exception(&self, ctx: &SubscriberExceptionContext<'_>) {
        let handler = &self.inner.exception_handler;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle_exception(ctx)));
        if let Err(payload) = outcome {
            error!(
                bus = %self.identifier(),
                method = %ctx.subscribe_method(),
                error = %ctx.cause(),
                panic = panic_message(payload.as_ref()),
                "exception handler panicked while handling subscriber exception"
            );
        }
    }

    pub(crate) fn executor(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.inner.executor)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("identifier", &self.inner.identifier)
            .field("listeners", &self.inner.registry.listener_count())
            .finish()
    }
}
