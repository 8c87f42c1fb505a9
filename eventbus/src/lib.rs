//! 进程内事件总线（eventbus）
//!
//! 监听器对象以静态方法表声明订阅处理器，每个处理器订阅一种事件类型；
//! 总线把发布的事件分发给所有匹配的订阅者：
//! - 按事件的精确运行时类型匹配，不沿类型层次向上查找；
//! - 按优先级降序调度，同优先级保持注册先后；
//! - 同步执行，或交给单线程/线程池等执行策略；
//! - 处理器失败路由到可替换的异常处理器，不影响发布方与其余订阅者。
//!
//! 典型用法：
//! 1. 在监听器的 `impl` 块上标注 `#[subscribers]`，处理器方法上标注 `#[subscribe(..)]`；
//! 2. 构建 `EventBus`（同步、`asynchronous` 或 `with_config`）；
//! 3. `register` 监听器实例，`post` 事件，不再需要时 `unregister`。
//!
//! ```
//! use eventbus::{EventBus, subscribers};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Greeter {
//!     seen: Mutex<Vec<String>>,
//! }
//!
//! #[subscribers]
//! impl Greeter {
//!     #[subscribe(priority = eventbus::Priority::HIGH)]
//!     fn greet(&self, name: &String) {
//!         self.seen.lock().unwrap().push(format!("hello {name}"));
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let greeter = Arc::new(Greeter::default());
//! bus.register(greeter.clone()).unwrap();
//! bus.post(String::from("world"));
//! assert_eq!(*greeter.seen.lock().unwrap(), vec!["hello world".to_string()]);
//! ```
//!
pub mod bus;
pub mod discovery;
pub mod error;
pub mod exception;
pub mod executor;
pub mod listener;
pub mod method;
pub mod priority;
mod registry;
pub mod subscriber;

pub use bus::{DEFAULT_IDENTIFIER, EventBus, EventBusConfig};
pub use discovery::MethodCache;
pub use error::{BusError, BusResult};
pub use exception::{
    LoggingExceptionHandler, SubscriberExceptionContext, SubscriberExceptionHandler,
};
#[cfg(feature = "tokio")]
pub use executor::TokioExecutor;
pub use executor::{DirectExecutor, Executor, SingleThreadExecutor, Task};
pub use listener::Listener;
pub use method::{AnyObject, IntoHandlerResult, MethodKey, SubscribeMethod};
pub use priority::Priority;
pub use registry::Subscribers;
pub use subscriber::{ListenerId, Subscriber};

pub use eventbus_macros::subscribers;

// 允许在本 crate 内部通过 ::eventbus 进行自引用，
// 以便过程宏在本 crate 的测试与文档示例中也能解析到 ::eventbus 路径。
extern crate self as eventbus;
