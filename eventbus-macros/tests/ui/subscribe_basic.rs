use eventbus::{EventBus, Listener, Priority, subscribers};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Signup {
    email: String,
}

#[derive(Default)]
struct Mailer {
    sent: AtomicUsize,
}

#[subscribers]
impl Mailer {
    #[subscribe]
    fn welcome(&self, event: &Signup) {
        assert!(!event.email.is_empty());
        self.sent.fetch_add(1, Ordering::SeqCst);
    }

    #[subscribe(priority = Priority::HIGHEST, label = "邮件模块")]
    fn verify(&self, event: &Signup) -> anyhow::Result<()> {
        anyhow::ensure!(event.email.contains('@'), "invalid email");
        Ok(())
    }

    #[subscribe(priority = 0, concurrent)]
    fn count(&self, _: &u64) {}

    // 未标注的方法不是订阅者
    fn helper(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

fn main() {
    let methods = Mailer::subscribe_methods().unwrap();
    assert_eq!(methods.len(), 3);
    assert_eq!(methods[1].priority(), Priority::HIGHEST);
    assert_eq!(methods[1].label(), Some("邮件模块"));
    assert!(methods[2].is_concurrent());

    let bus = EventBus::new();
    let mailer = Arc::new(Mailer::default());
    bus.register(mailer.clone()).unwrap();
    bus.post(Signup {
        email: "a@b.c".to_string(),
    });
    assert_eq!(mailer.helper(), 1);
}
