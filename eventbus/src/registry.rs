//! 订阅者注册表（SubscriberRegistry）
//!
//! 维护两份始终同步更新的索引：
//! - 事件类型 -> 按优先级降序排列的订阅者列表（同优先级保持注册先后）；
//! - 监听器实例 -> 该实例注册产生的订阅者（用于注销与重复注册判断）。
//!
//! 读路径（[`SubscriberRegistry::subscribers_for`]）只克隆一份 `Arc<[_]>` 快照，
//! 不会被写路径阻塞，也不会看到修改到一半的列表：写路径总是整体替换列表，
//! 从不原地修改暴露给读者的数据。写路径（注册/注销）在同一总线内互斥。
//!
use crate::bus::EventBus;
use crate::discovery::MethodCache;
use crate::error::{BusError, BusResult};
use crate::listener::Listener;
use crate::method::AnyObject;
use crate::subscriber::{ListenerId, Subscriber};
use dashmap::DashMap;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, trace};

/// 某一事件类型在某一时刻的订阅者快照（已按优先级排序）
pub type Subscribers = Arc<[Arc<Subscriber>]>;

pub(crate) struct SubscriberRegistry {
    by_event: DashMap<TypeId, Subscribers>,
    by_listener: DashMap<ListenerId, Vec<Arc<Subscriber>>>,
    // 已注销的监听器；弱引用保住地址不被复用，用于识别重复注销。
    // 条目数以“已注销且仍存活的实例数”为上界：实例释放后，其值立即析构，
    // 仅剩的 Arc 分配在下一次 register/unregister 时清理。
    retired: DashMap<ListenerId, Weak<AnyObject>>,
    methods: Arc<MethodCache>,
    write_lock: Mutex<()>,
}

impl SubscriberRegistry {
    pub(crate) fn new(methods: Arc<MethodCache>) -> Self {
        Self {
            by_event: DashMap::new(),
            by_listener: DashMap::new(),
            retired: DashMap::new(),
            methods,
            write_lock: Mutex::new(()),
        }
    }

    /// 注册监听器上的全部订阅方法
    pub(crate) fn register<L: Listener>(&self, bus: &EventBus, listener: Arc<L>) -> BusResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.purge_retired();

        let id = ListenerId::of(&listener);
        if self.by_listener.contains_key(&id) {
            debug!(
                bus = %bus.identifier(),
                listener = type_name::<L>(),
                "listener already registered, ignore this register"
            );
            return Ok(());
        }

        let methods = self.methods.discover::<L>()?;
        if methods.is_empty() {
            debug!(
                bus = %bus.identifier(),
                listener = type_name::<L>(),
                "listener has no subscribe methods, ignore this register"
            );
            return Ok(());
        }

        let target: Arc<AnyObject> = listener;
        let mut added = Vec::with_capacity(methods.len());

        for method in methods.iter() {
            let event = method.event_type_id();
            let subscriber = Subscriber::create(bus, Arc::clone(&target), id, method.clone());

            let current = self.subscribers_for(event);
            if current.iter().any(|s| **s == *subscriber) {
                continue;
            }

            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&subscriber));
            // sort_by 是稳定排序：同优先级保持注册先后
            next.sort_by(|a, b| b.priority().cmp(&a.priority()));
            self.by_event.insert(event, next.into());

            added.push(subscriber);
        }

        if added.is_empty() {
            return Ok(());
        }

        debug!(
            bus = %bus.identifier(),
            listener = type_name::<L>(),
            subscribers = added.len(),
            "listener registered"
        );
        self.retired.remove(&id);
        self.by_listener.insert(id, added);
        Ok(())
    }

    /// 注销监听器的全部订阅者
    ///
    /// 从未注册过的监听器静默忽略；已注销的监听器再次注销返回一致性错误。
    pub(crate) fn unregister<L: Listener>(&self, bus: &EventBus, listener: &Arc<L>) -> BusResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.purge_retired();

        let id = ListenerId::of(listener);
        let Some(subscribers) = self.by_listener.get(&id).map(|e| e.value().clone()) else {
            if self.retired.contains_key(&id) {
                return Err(BusError::NotRegistered {
                    listener: type_name::<L>(),
                });
            }
            trace!(
                bus = %bus.identifier(),
                listener = type_name::<L>(),
                "listener was never registered, ignore this unregister"
            );
            return Ok(());
        };

        // 先在副本上完成全部移除，校验通过后再整体替换
        let mut pending: HashMap<TypeId, Vec<Arc<Subscriber>>> = HashMap::new();
        for subscriber in &subscribers {
            let method = subscriber.method();
            let event = method.event_type_id();
            let list = pending
                .entry(event)
                .or_insert_with(|| self.subscribers_for(event).to_vec());

            let Some(pos) = list.iter().position(|s| Arc::ptr_eq(s, subscriber)) else {
                return Err(BusError::MissingSubscriber {
                    listener: type_name::<L>(),
                    method: method.name(),
                    event: method.event_type(),
                });
            };
            list.remove(pos);
        }

        for (event, remaining) in pending {
            if remaining.is_empty() {
                self.by_event.remove(&event);
            } else {
                self.by_event.insert(event, remaining.into());
            }
        }

        self.by_listener.remove(&id);
        let retired = Arc::downgrade(listener);
        let retired: Weak<AnyObject> = retired;
        self.retired.insert(id, retired);

        debug!(
            bus = %bus.identifier(),
            listener = type_name::<L>(),
            subscribers = subscribers.len(),
            "listener unregistered"
        );
        Ok(())
    }

    /// 事件类型的订阅者快照；无订阅者时返回空列表
    pub(crate) fn subscribers_for(&self, event: TypeId) -> Subscribers {
        self.by_event
            .get(&event)
            .map(|list| Arc::clone(list.value()))
            .unwrap_or_else(|| Vec::new().into())
    }

    pub(crate) fn is_registered(&self, id: ListenerId) -> bool {
        self.by_listener.contains_key(&id)
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.by_listener.len()
    }

    // 实例已被释放的注销记录可以丢弃，其地址之后可能被新对象复用
    fn purge_retired(&self) {
        self.retired.retain(|_, listener| listener.strong_count() > 0);
    }
}
