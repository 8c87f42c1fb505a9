//! 订阅方法描述（SubscribeMethod）
//!
//! 描述一个订阅处理器：方法名、所属监听器类型、订阅的事件类型、优先级、可选标签、
//! 是否允许并发进入，以及类型擦除后的调用入口。
//!
//! 描述对象构建后不可变，可在线程间自由共享；它只依赖类型的静态信息，
//! 因此可以按监听器类型缓存（见 [`MethodCache`](crate::MethodCache)）。
//!
use crate::error::{BusError, BusResult};
use crate::listener::Listener;
use crate::priority::Priority;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

/// 类型擦除后的监听器/事件对象
pub type AnyObject = dyn Any + Send + Sync;

type InvokeFn = dyn Fn(&AnyObject, &AnyObject) -> Result<(), Fault> + Send + Sync;

/// 一次调用的失败原因
pub(crate) enum Fault {
    /// 处理器自身返回的失败（可恢复，路由到异常处理器）
    Handler(anyhow::Error),
    /// 调用机制失败：监听器或事件与描述声明的类型不符
    TypeMismatch {
        role: &'static str,
        expected: &'static str,
    },
}

/// 处理器返回值到 `anyhow::Result<()>` 的转换
///
/// 处理器可以不返回任何值，也可以返回 `Result<(), E>`（`E: Into<anyhow::Error>`）。
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> anyhow::Result<()>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

/// 订阅方法的身份：声明所在的监听器类型 + 方法名 + 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodKey {
    declared_in: TypeId,
    name: &'static str,
    event: TypeId,
}

/// 订阅方法描述
#[derive(Clone)]
pub struct SubscribeMethod {
    name: &'static str,
    // 调用入口接受的监听器类型
    listener_type: TypeId,
    listener_type_name: &'static str,
    // 方法实际声明所在的类型（继承时与 listener_type 不同）
    declared_in: TypeId,
    declared_in_name: &'static str,
    event_type: TypeId,
    event_type_name: &'static str,
    priority: Priority,
    label: Option<Arc<str>>,
    concurrent: bool,
    invoke: Arc<InvokeFn>,
}

impl SubscribeMethod {
    /// 以强类型处理器构建描述，默认优先级 [`Priority::NORMAL`]、互斥调用
    ///
    /// ```
    /// use eventbus::{Priority, SubscribeMethod};
    ///
    /// struct Audit;
    /// impl Audit {
    ///     fn on_login(&self, user: &String) {
    ///         let _ = user;
    ///     }
    /// }
    ///
    /// let method = SubscribeMethod::new("on_login", Audit::on_login)
    ///     .with_priority(Priority::HIGH)
    ///     .with_label("audit");
    /// assert_eq!(method.name(), "on_login");
    /// assert_eq!(method.priority(), Priority::HIGH);
    /// assert_eq!(method.label(), Some("audit"));
    /// ```
    pub fn new<L, E, F, R>(name: &'static str, handler: F) -> Self
    where
        L: Any + Send + Sync,
        E: Any + Send + Sync,
        F: Fn(&L, &E) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        let invoke: Arc<InvokeFn> = Arc::new(move |listener: &AnyObject, event: &AnyObject| {
            let listener = downcast::<L>(listener, "listener")?;
            let event = downcast::<E>(event, "event")?;
            handler(listener, event)
                .into_handler_result()
                .map_err(Fault::Handler)
        });

        Self {
            name,
            listener_type: TypeId::of::<L>(),
            listener_type_name: type_name::<L>(),
            declared_in: TypeId::of::<L>(),
            declared_in_name: type_name::<L>(),
            event_type: TypeId::of::<E>(),
            event_type_name: type_name::<E>(),
            priority: Priority::default(),
            label: None,
            concurrent: false,
            invoke,
        }
    }

    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Arc::from(label.into()));
        self
    }

    /// 标记处理器可被多个线程同时进入
    pub fn concurrent(mut self) -> Self {
        self.concurrent = true;
        self
    }

    /// 将监听器类型 `P` 的全部订阅方法转接到内嵌了 `P` 的监听器类型 `L` 上
    ///
    /// 调用时先通过 `project` 取得内嵌的 `P`，再执行 `P` 的处理器。
    /// 方法身份仍然记为在 `P` 上声明。
    pub fn inherit<L, P, F>(project: F) -> BusResult<Vec<SubscribeMethod>>
    where
        L: Any + Send + Sync,
        P: Listener,
        F: Fn(&L) -> &P + Send + Sync + 'static,
    {
        let project = Arc::new(project);

        P::subscribe_methods()?
            .into_iter()
            .map(|parent| {
                if parent.listener_type != TypeId::of::<P>() {
                    return Err(BusError::InvalidSubscriber {
                        listener: type_name::<P>(),
                        method: parent.name,
                        reason: format!("declared for listener `{}`", parent.listener_type_name),
                    });
                }

                let project = Arc::clone(&project);
                let parent_invoke = Arc::clone(&parent.invoke);
                let invoke: Arc<InvokeFn> =
                    Arc::new(move |listener: &AnyObject, event: &AnyObject| {
                        let listener = downcast::<L>(listener, "listener")?;
                        let base: &AnyObject = (*project)(listener);
                        parent_invoke(base, event)
                    });

                Ok(SubscribeMethod {
                    listener_type: TypeId::of::<L>(),
                    listener_type_name: type_name::<L>(),
                    invoke,
                    ..parent
                })
            })
            .collect()
    }

    pub(crate) fn invoke(&self, listener: &AnyObject, event: &AnyObject) -> Result<(), Fault> {
        (self.invoke)(listener, event)
    }

    pub fn key(&self) -> MethodKey {
        MethodKey {
            declared_in: self.declared_in,
            name: self.name,
            event: self.event_type,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn listener_type_id(&self) -> TypeId {
        self.listener_type
    }

    pub fn listener_type(&self) -> &'static str {
        self.listener_type_name
    }

    pub fn declared_in(&self) -> &'static str {
        self.declared_in_name
    }

    pub fn event_type_id(&self) -> TypeId {
        self.event_type
    }

    pub fn event_type(&self) -> &'static str {
        self.event_type_name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_concurrent(&self) -> bool {
        self.concurrent
    }
}

fn downcast<'a, T: Any>(value: &'a AnyObject, role: &'static str) -> Result<&'a T, Fault> {
    value.downcast_ref::<T>().ok_or(Fault::TypeMismatch {
        role,
        expected: type_name::<T>(),
    })
}

impl fmt::Debug for SubscribeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeMethod")
            .field("name", &self.name)
            .field("listener", &self.listener_type_name)
            .field("declared_in", &self.declared_in_name)
            .field("event", &self.event_type_name)
            .field("priority", &self.priority)
            .field("label", &self.label)
            .field("concurrent", &self.concurrent)
            .finish()
    }
}

impl fmt::Display for SubscribeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}({})",
            self.declared_in_name, self.name, self.event_type_name
        )
    }
}
