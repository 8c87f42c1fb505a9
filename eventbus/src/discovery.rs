//! 订阅方法发现缓存（MethodCache）
//!
//! 以监听器 `TypeId` 为键缓存 [`Listener::subscribe_methods`] 的结果：
//! 首次使用时填充，之后不再淘汰。缓存由调用方显式持有，可通过 `Arc`
//! 在多个总线之间共享。
//!
use crate::error::{BusError, BusResult};
use crate::listener::Listener;
use crate::method::SubscribeMethod;
use dashmap::DashMap;
use std::any::{TypeId, type_name};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

#[derive(Default)]
pub struct MethodCache {
    methods: DashMap<TypeId, Arc<[SubscribeMethod]>>,
}

impl MethodCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得监听器类型 `L` 的订阅方法（已去重、已校验）
    pub fn discover<L: Listener>(&self) -> BusResult<Arc<[SubscribeMethod]>> {
        let key = TypeId::of::<L>();
        if let Some(found) = self.methods.get(&key).map(|m| Arc::clone(m.value())) {
            return Ok(found);
        }

        let discovered = discover_uncached::<L>()?;

        // 并发首次发现时以先写入者为准，两份结果内容一致
        let entry = self.methods.entry(key).or_insert(discovered);
        Ok(Arc::clone(entry.value()))
    }

    pub fn contains<L: Listener>(&self) -> bool {
        self.methods.contains_key(&TypeId::of::<L>())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

fn discover_uncached<L: Listener>() -> BusResult<Arc<[SubscribeMethod]>> {
    let mut seen = HashSet::new();
    let mut methods = Vec::new();

    for method in L::subscribe_methods()? {
        if method.listener_type_id() != TypeId::of::<L>() {
            return Err(BusError::InvalidSubscriber {
                listener: type_name::<L>(),
                method: method.name(),
                reason: format!("declared for listener `{}`", method.listener_type()),
            });
        }
        if method.name().is_empty() {
            return Err(BusError::InvalidSubscriber {
                listener: type_name::<L>(),
                method: method.name(),
                reason: "empty method name".to_string(),
            });
        }

        // 同名同事件类型只保留第一个：自身声明覆盖继承来的方法
        if seen.insert((method.name(), method.event_type_id())) {
            methods.push(method);
        } else {
            trace!(
                listener = type_name::<L>(),
                method = %method,
                "shadowed subscribe method skipped"
            );
        }
    }

    Ok(methods.into())
}
