use eventbus::{
    EventBus, Priority, SingleThreadExecutor, SubscriberExceptionContext, TokioExecutor,
    subscribers,
};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("empty message rejected by {0}")]
    EmptyMessage(&'static str),
}

struct Runner;

#[subscribers]
impl Runner {
    #[subscribe(priority = Priority::LOWEST)]
    fn run(&self, s: &String) {
        println!("[{}]{}", Priority::LOWEST, s);
    }
}

struct ContinueRunner;

#[subscribers]
impl ContinueRunner {
    #[subscribe(priority = Priority::HIGH, label = "员工模块")]
    fn run(&self, _: &String) {
        println!("[{}]ContinueRunner Running", Priority::HIGH);
    }

    #[subscribe]
    fn run2(&self, _: &String) {
        println!("[{}]ContinueRunner Running2", Priority::NORMAL);
    }
}

// 内嵌 Runner 继承其订阅方法，自身的 run 遮蔽继承来的 run
struct Runner2 {
    base: Runner,
    runner: Runner,
    number: i32,
}

impl Runner2 {
    fn new(number: i32) -> Self {
        Self {
            base: Runner,
            runner: Runner,
            number,
        }
    }
}

#[subscribers(extends(base))]
impl Runner2 {
    #[subscribe(priority = Priority::LOWEST)]
    fn run(&self, s: &String) {
        self.runner.run(&format!("Son{s}"));
    }

    #[subscribe(priority = Priority::HIGHEST)]
    fn run3(&self, _: &String) {
        println!("[{}]{}2 Running", Priority::HIGHEST, self.number);
    }
}

struct Auditor {
    done: Mutex<mpsc::Sender<String>>,
}

#[subscribers]
impl Auditor {
    #[subscribe(label = "审计模块", concurrent)]
    fn audit(&self, s: &String) -> Result<(), DemoError> {
        if s.is_empty() {
            return Err(DemoError::EmptyMessage("auditor"));
        }
        let _ = self.done.lock().map(|tx| tx.send(format!("audited: {s}")));
        Ok(())
    }
}

fn synchronous() -> anyhow::Result<()> {
    let bus = EventBus::new();
    bus.register(Arc::new(ContinueRunner))?;
    bus.register(Arc::new(Runner2::new(2)))?;
    bus.post(String::from("Hello World"));
    Ok(())
}

fn single_thread() -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel();
    let failures = Mutex::new(tx.clone());
    let bus = EventBus::with_config(
        eventbus::EventBusConfig::builder()
            .identifier("single-thread")
            .executor(Arc::new(SingleThreadExecutor::new("eventbus-demo")?))
            .exception_handler(Arc::new(move |ctx: &SubscriberExceptionContext<'_>| {
                let line = format!(
                    "[{}] {} failed: {}",
                    ctx.event_bus().identifier(),
                    ctx.subscribe_method(),
                    ctx.cause()
                );
                let _ = failures.lock().map(|tx| tx.send(line));
            }))
            .build(),
    );

    bus.register(Arc::new(Auditor {
        done: Mutex::new(tx),
    }))?;
    bus.post(String::from("Hello World"));
    bus.post(String::new());
    // 排队中的任务持有总线，释放最后一个句柄后空消息的失败仍会上报
    drop(bus);

    for _ in 0..2 {
        let line = rx.recv_timeout(Duration::from_secs(1))?;
        println!("{line}");
    }
    Ok(())
}

async fn pooled() -> anyhow::Result<()> {
    let bus = EventBus::with_config(
        eventbus::EventBusConfig::builder()
            .identifier("pooled")
            .executor(Arc::new(TokioExecutor::current()?))
            .exception_handler(Arc::new(|ctx: &SubscriberExceptionContext<'_>| {
                println!(
                    "[{}] {} failed: {}",
                    ctx.event_bus().identifier(),
                    ctx.subscribe_method(),
                    ctx.cause()
                );
            }))
            .build(),
    );

    let (tx, rx) = mpsc::channel();
    let auditor = Arc::new(Auditor {
        done: Mutex::new(tx),
    });
    bus.register(auditor.clone())?;
    bus.post(String::from("Hello Pool"));
    bus.post(String::new());

    let line = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(1)))
        .await??;
    println!("{line}");
    // 等待空消息的失败被异常处理器输出
    tokio::time::sleep(Duration::from_millis(50)).await;

    bus.unregister(&auditor)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    synchronous()?;
    single_thread()?;
    pooled().await?;
    tracing::info!("demo finished");
    Ok(())
}
