use eventbus::{EventBus, Priority, SubscriberExceptionContext, TokioExecutor, subscribers};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug)]
struct UserCreated {
    name: String,
}

#[derive(Default)]
struct Welcome {
    sent: AtomicUsize,
}

#[subscribers]
impl Welcome {
    #[subscribe(priority = Priority::HIGH, label = "welcome", concurrent)]
    fn send(&self, event: &UserCreated) {
        println!("welcome mail to {}", event.name);
        self.sent.fetch_add(1, Ordering::SeqCst);
    }

    #[subscribe]
    fn audit(&self, event: &UserCreated) -> anyhow::Result<()> {
        anyhow::ensure!(!event.name.is_empty(), "user without name");
        println!("audit: {event:?}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let executor = TokioExecutor::current()?;
    let bus = EventBus::with_config(
        eventbus::EventBusConfig::builder()
            .identifier("users")
            .executor(Arc::new(executor))
            .exception_handler(Arc::new(|ctx: &SubscriberExceptionContext<'_>| {
                println!("{} failed: {}", ctx.subscribe_method(), ctx.cause());
            }))
            .build(),
    );

    let welcome = Arc::new(Welcome::default());
    bus.register(welcome.clone())?;

    bus.post(UserCreated {
        name: "Alice".into(),
    });
    bus.post(UserCreated {
        name: String::new(),
    });

    // 池化分发只保证提交顺序，这里等待处理完成
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("welcome mails sent: {}", welcome.sent.load(Ordering::SeqCst));

    bus.unregister(&welcome)?;
    Ok(())
}
