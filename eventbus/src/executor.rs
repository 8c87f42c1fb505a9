//! 执行策略（Executor）
//!
//! 订阅者把每次调用包装成一个任务交给执行策略：
//! - [`DirectExecutor`]：在调用线程上立即执行（同步总线）；
//! - [`SingleThreadExecutor`]：单个专用工作线程，先进先出；
//! - [`TokioExecutor`]：提交到 tokio 运行时的阻塞线程池（需开启 `tokio` 特性）。
//!
//! 任意 `Fn(Task) + Send + Sync` 闭包也可直接作为执行策略。
//!
//! 执行策略不提供取消与超时：卡住的处理器会一直占用调用线程或工作线程。
//!
use crate::error::{BusError, BusResult};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread;
use tracing::{debug, error, warn};

/// 待执行的任务
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// 执行策略：只负责提交，不返回结果
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

impl<F> Executor for F
where
    F: Fn(Task) + Send + Sync,
{
    fn execute(&self, task: Task) {
        self(task)
    }
}

/// 在调用线程上立即执行
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectExecutor;

impl Executor for DirectExecutor {
    fn execute(&self, task: Task) {
        task()
    }
}

/// 单个专用工作线程 + 有界队列
///
/// 队列满时任务被拒绝并记录日志；任务 panic 会被捕获记录，工作线程继续服务。
/// 执行器被丢弃后队列关闭，工作线程处理完已入队的任务后退出。
pub struct SingleThreadExecutor {
    name: String,
    capacity: usize,
    sender: SyncSender<Task>,
}

impl SingleThreadExecutor {
    pub const DEFAULT_CAPACITY: usize = 65535;

    pub fn new(name: impl Into<String>) -> BusResult<Self> {
        Self::with_capacity(name, Self::DEFAULT_CAPACITY)
    }

    /// 队列容量至少为 1；容量为 0 的同步通道只能交接，几乎所有任务都会被拒绝
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> BusResult<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(BusError::Executor {
                reason: format!("executor `{name}` needs a queue capacity of at least 1"),
            });
        }
        let (sender, receiver) = mpsc::sync_channel::<Task>(capacity);

        let worker_name = name.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                        error!(
                            executor = %worker_name,
                            panic = panic_message(payload.as_ref()),
                            "task panicked"
                        );
                    }
                }
                debug!(executor = %worker_name, "executor worker stopped");
            })
            .map_err(|e| BusError::Executor {
                reason: format!("spawn worker `{name}`: {e}"),
            })?;

        Ok(Self {
            name,
            capacity,
            sender,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Executor for SingleThreadExecutor {
    fn execute(&self, task: Task) {
        match self.sender.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    executor = %self.name,
                    capacity = self.capacity,
                    "task rejected: queue full"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(executor = %self.name, "task rejected: worker stopped");
            }
        }
    }
}

/// 提交到 tokio 运行时的阻塞线程池
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio")]
impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// 绑定到当前所在的 tokio 运行时
    pub fn current() -> BusResult<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| BusError::Executor {
                reason: e.to_string(),
            })
    }
}

#[cfg(feature = "tokio")]
impl Executor for TokioExecutor {
    fn execute(&self, task: Task) {
        // JoinHandle 不会被等待，panic 在这里记录后交回 tokio
        drop(self.handle.spawn_blocking(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                error!(panic = panic_message(payload.as_ref()), "task panicked");
                panic::resume_unwind(payload);
            }
        }));
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
