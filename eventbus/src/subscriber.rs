//! 订阅者（Subscriber）
//!
//! 把一个订阅方法绑定到具体的监听器实例与执行策略上，负责实际调用与失败隔离。
//!
//! 两个订阅者相等，当且仅当它们引用同一个监听器实例（按地址，不按值）上的同一个
//! 订阅方法。这样同一对象不会被重复注册，而同一类型的不同实例都能收到事件。
//!
use crate::bus::EventBus;
use crate::exception::SubscriberExceptionContext;
use crate::executor::Executor;
use crate::method::{AnyObject, Fault, SubscribeMethod};
use crate::priority::Priority;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

thread_local! {
    // 当前线程正持有互斥锁的订阅者；处理器内同步重入发布时不再重复加锁
    static HELD: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

struct Reentry(usize);

impl Reentry {
    fn enter(key: usize) -> Option<Self> {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if held.contains(&key) {
                return None;
            }
            held.push(key);
            Some(Self(key))
        })
    }
}

impl Drop for Reentry {
    fn drop(&mut self) {
        HELD.with(|held| held.borrow_mut().retain(|k| *k != self.0));
    }
}

/// 监听器实例的身份（`Arc` 指向的地址）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self {
        Self(Arc::as_ptr(listener) as *const () as usize)
    }
}

pub struct Subscriber {
    listener: Arc<AnyObject>,
    listener_id: ListenerId,
    method: SubscribeMethod,
    executor: Arc<dyn Executor>,
    // 非并发订阅者在此串行化，跨事件类型也只允许一个线程进入（同一线程可重入）
    exclusive: Option<Mutex<()>>,
}

impl Subscriber {
    pub(crate) fn create(
        bus: &EventBus,
        listener: Arc<AnyObject>,
        listener_id: ListenerId,
        method: SubscribeMethod,
    ) -> Arc<Self> {
        let exclusive = (!method.is_concurrent()).then(|| Mutex::new(()));
        Arc::new(Self {
            listener,
            listener_id,
            method,
            executor: bus.executor(),
            exclusive,
        })
    }

    /// 通过执行策略调度一次调用
    ///
    /// 任务持有总线的强引用直到执行完毕：发布方随后释放总线，
    /// 排队中的失败仍会交给该总线的异常处理器。
    pub(crate) fn dispatch(self: &Arc<Self>, bus: &EventBus, event: Arc<AnyObject>) {
        let subscriber = Arc::clone(self);
        let bus = bus.clone();
        self.executor
            .execute(Box::new(move || subscriber.invoke(&bus, event.as_ref())));
    }

    fn invoke(&self, bus: &EventBus, event: &AnyObject) {
        trace!(
            listener = self.method.listener_type(),
            method = self.method.name(),
            "invoke subscriber"
        );

        let outcome = match &self.exclusive {
            Some(lock) => match Reentry::enter(self as *const Self as usize) {
                Some(reentry) => {
                    let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
                    let outcome = self.method.invoke(self.listener.as_ref(), event);
                    drop(guard);
                    drop(reentry);
                    outcome
                }
                None => self.method.invoke(self.listener.as_ref(), event),
            },
            None => self.method.invoke(self.listener.as_ref(), event),
        };

        match outcome {
            Ok(()) => {}
            Err(Fault::Handler(cause)) => self.handle_failure(bus, event, cause),
            Err(Fault::TypeMismatch { role, expected }) => {
                panic!("subscriber {} rejected {role}: expected `{expected}`", self.method)
            }
        }
    }

    fn handle_failure(&self, bus: &EventBus, event: &AnyObject, cause: anyhow::Error) {
        let ctx = SubscriberExceptionContext::new(
            bus,
            event,
            self.listener.as_ref(),
            &self.method,
            &cause,
        );
        bus.handle_subscriber_exception(&ctx);
    }

    pub fn method(&self) -> &SubscribeMethod {
        &self.method
    }

    pub fn priority(&self) -> Priority {
        self.method.priority()
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener_id
    }

    pub fn listener(&self) -> &AnyObject {
        self.listener.as_ref()
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive.is_some()
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.listener_id == other.listener_id && self.method.key() == other.method.key()
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("listener_id", &self.listener_id)
            .field("method", &self.method)
            .field("exclusive", &self.is_exclusive())
            .finish()
    }
}
