//! 监听器（Listener）
//!
//! 监听器类型静态地声明自己的订阅方法表。通常由 `#[subscribers]` 宏生成，
//! 也可以手写：
//!
//! ```
//! use eventbus::{BusResult, Listener, Priority, SubscribeMethod};
//!
//! struct Mailer;
//!
//! impl Mailer {
//!     fn on_signup(&self, email: &String) -> anyhow::Result<()> {
//!         let _ = email;
//!         Ok(())
//!     }
//! }
//!
//! impl Listener for Mailer {
//!     fn subscribe_methods() -> BusResult<Vec<SubscribeMethod>> {
//!         Ok(vec![
//!             SubscribeMethod::new("on_signup", Mailer::on_signup).with_priority(Priority::HIGH),
//!         ])
//!     }
//! }
//! ```
//!
use crate::error::BusResult;
use crate::method::SubscribeMethod;
use std::any::Any;

/// 可注册到事件总线的监听器
pub trait Listener: Any + Send + Sync {
    /// 返回该类型声明的全部订阅方法（含通过内嵌字段继承来的方法）
    ///
    /// 必须是类型的纯函数：结果会按类型缓存，不会针对实例重复调用。
    fn subscribe_methods() -> BusResult<Vec<SubscribeMethod>>;
}
