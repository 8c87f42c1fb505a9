use eventbus::{
    BusError, BusResult, EventBus, EventBusConfig, Listener, Priority, SubscribeMethod,
    SubscriberExceptionContext, subscribers,
};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Journal {
    lines: Arc<Mutex<Vec<String>>>,
}
impl Journal {
    fn push(&self, line: impl Into<String>) {
        self.lines.lock().unwrap().push(line.into());
    }
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap())
    }
}

struct Runner {
    journal: Journal,
}

#[subscribers]
impl Runner {
    #[subscribe(priority = Priority::LOWEST)]
    fn run(&self, msg: &String) {
        self.journal.push(format!("Runner.run:{msg}"));
    }
}

struct ContinueRunner {
    journal: Journal,
}

#[subscribers]
impl ContinueRunner {
    #[subscribe(priority = Priority::HIGH, label = "员工模块")]
    fn run(&self, msg: &String) {
        self.journal.push(format!("ContinueRunner.run:{msg}"));
    }

    #[subscribe]
    fn run2(&self, msg: &String) {
        self.journal.push(format!("ContinueRunner.run2:{msg}"));
    }
}

struct Runner2 {
    runner: Runner,
}

#[subscribers(extends(runner))]
impl Runner2 {
    #[subscribe(priority = Priority::HIGHEST)]
    fn run3(&self, msg: &String) {
        self.runner.journal.push(format!("Runner2.run3:{msg}"));
    }
}

#[test]
fn handlers_run_in_descending_priority() {
    let journal = Journal::default();
    let bus = EventBus::new();

    bus.register(Arc::new(Runner {
        journal: journal.clone(),
    }))
    .unwrap();
    bus.register(Arc::new(ContinueRunner {
        journal: journal.clone(),
    }))
    .unwrap();
    bus.register(Arc::new(Runner2 {
        runner: Runner {
            journal: journal.clone(),
        },
    }))
    .unwrap();

    bus.post(String::from("Hello World"));

    assert_eq!(
        journal.take(),
        vec![
            "Runner2.run3:Hello World",
            "ContinueRunner.run:Hello World",
            "ContinueRunner.run2:Hello World",
            "Runner.run:Hello World",
            "Runner.run:Hello World",
        ]
    );

    let priorities: Vec<i32> = bus
        .subscribers_of::<String>()
        .iter()
        .map(|s| s.priority().value())
        .collect();
    assert_eq!(priorities, vec![400, 200, 100, 0, 0]);
}

#[test]
fn ties_follow_registration_order() {
    struct Tagged {
        tag: &'static str,
        journal: Journal,
    }

    #[subscribers]
    impl Tagged {
        #[subscribe]
        fn on_text(&self, _: &String) {
            self.journal.push(self.tag);
        }
    }

    let journal = Journal::default();
    let bus = EventBus::new();
    for tag in ["a", "b", "c", "d"] {
        bus.register(Arc::new(Tagged {
            tag,
            journal: journal.clone(),
        }))
        .unwrap();
    }

    bus.post(String::new());
    assert_eq!(journal.take(), vec!["a", "b", "c", "d"]);
}

#[test]
fn listener_with_many_types_is_indexed_per_type() {
    struct Multi;

    #[subscribers]
    impl Multi {
        #[subscribe(priority = 10)]
        fn a(&self, _: &u8) {}
        #[subscribe(priority = 30)]
        fn b(&self, _: &u8) {}
        #[subscribe(priority = 20)]
        fn c(&self, _: &u8) {}
        #[subscribe]
        fn d(&self, _: &u16) {}
        #[subscribe]
        fn e(&self, _: &u32) {}
    }

    let bus = EventBus::new();
    bus.register(Arc::new(Multi)).unwrap();

    let names = |subs: eventbus::Subscribers| -> Vec<&'static str> {
        subs.iter().map(|s| s.method().name()).collect()
    };
    assert_eq!(names(bus.subscribers_of::<u8>()), vec!["b", "c", "a"]);
    assert_eq!(names(bus.subscribers_of::<u16>()), vec!["d"]);
    assert_eq!(names(bus.subscribers_of::<u32>()), vec!["e"]);
    assert!(bus.subscribers_of::<u64>().is_empty());
}

// 事件只按精确运行时类型匹配
#[derive(Debug, Clone)]
struct Event {
    name: String,
}

#[derive(Debug, Clone)]
struct PayEvent {
    base: Event,
    amount: u64,
}

#[test]
fn subtype_events_do_not_reach_supertype_subscribers() {
    struct Accounting {
        journal: Journal,
    }

    #[subscribers]
    impl Accounting {
        #[subscribe]
        fn on_event(&self, event: &Event) {
            self.journal.push(format!("event:{}", event.name));
        }
    }

    let journal = Journal::default();
    let bus = EventBus::new();
    bus.register(Arc::new(Accounting {
        journal: journal.clone(),
    }))
    .unwrap();

    let pay = PayEvent {
        base: Event {
            name: "pay".to_string(),
        },
        amount: 42,
    };
    bus.post(pay.clone());
    assert!(journal.take().is_empty());

    bus.post(pay.base);
    assert_eq!(journal.take(), vec!["event:pay"]);
    assert_eq!(pay.amount, 42);
}

struct Flaky {
    journal: Journal,
}

impl Flaky {
    fn explode(&self, msg: &String) -> anyhow::Result<()> {
        self.journal.push("explode");
        anyhow::bail!("cannot handle {msg}")
    }

    fn after(&self, _: &String) {
        self.journal.push("after");
    }
}

impl Listener for Flaky {
    fn subscribe_methods() -> BusResult<Vec<SubscribeMethod>> {
        Ok(vec![
            SubscribeMethod::new("explode", Flaky::explode)
                .with_priority(Priority::HIGHEST)
                .with_label("fragile"),
            SubscribeMethod::new("after", Flaky::after).with_priority(Priority::LOWEST),
        ])
    }
}

#[test]
fn failing_handler_is_routed_and_does_not_stop_siblings() {
    let journal = Journal::default();
    let captured: Arc<Mutex<Vec<String>>> = Arc::default();

    let sink = captured.clone();
    let handler = move |ctx: &SubscriberExceptionContext<'_>| {
        let method = ctx.subscribe_method();
        let flaky = ctx.listener_as::<Flaky>().is_some();
        sink.lock().unwrap().push(format!(
            "{}|{}|{}|{:?}|{}|{}|{}",
            ctx.event_bus().identifier(),
            method.name(),
            ctx.event_as::<String>().cloned().unwrap_or_default(),
            method.label(),
            ctx.event_type(),
            flaky,
            ctx.cause()
        ));
    };

    let bus = EventBus::with_config(
        EventBusConfig::builder()
            .identifier("flaky")
            .exception_handler(Arc::new(handler))
            .build(),
    );
    bus.register(Arc::new(Flaky {
        journal: journal.clone(),
    }))
    .unwrap();

    bus.post(String::from("order-1"));

    assert_eq!(journal.take(), vec!["explode", "after"]);
    assert_eq!(
        *captured.lock().unwrap(),
        vec![format!(
            "flaky|explode|order-1|Some(\"fragile\")|{}|true|cannot handle order-1",
            std::any::type_name::<String>()
        )]
    );
}

#[test]
fn typed_errors_convert_into_handler_failures() {
    #[derive(Debug, thiserror::Error)]
    #[error("quota exceeded: {0}")]
    struct QuotaExceeded(u32);

    struct Quota;

    #[subscribers]
    impl Quota {
        #[subscribe]
        fn check(&self, used: &u32) -> Result<(), QuotaExceeded> {
            if *used > 10 {
                return Err(QuotaExceeded(*used));
            }
            Ok(())
        }
    }

    let causes: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = causes.clone();
    let bus = EventBus::with_config(
        EventBusConfig::builder()
            .exception_handler(Arc::new(move |ctx: &SubscriberExceptionContext<'_>| {
                sink.lock().unwrap().push(ctx.cause().to_string());
            }))
            .build(),
    );
    bus.register(Arc::new(Quota)).unwrap();

    bus.post(3u32);
    bus.post(11u32);
    assert_eq!(*causes.lock().unwrap(), vec!["quota exceeded: 11"]);
}

#[test]
fn mislabeled_descriptor_is_a_configuration_error() {
    struct Other;
    impl Other {
        fn on(&self, _: &u8) {}
    }

    struct Mislabeled;
    impl Listener for Mislabeled {
        fn subscribe_methods() -> BusResult<Vec<SubscribeMethod>> {
            Ok(vec![SubscribeMethod::new("on", Other::on)])
        }
    }

    let bus = EventBus::new();
    let listener = Arc::new(Mislabeled);
    let err = bus.register(listener.clone()).unwrap_err();
    assert!(matches!(err, BusError::InvalidSubscriber { method: "on", .. }));
    assert!(!bus.is_registered(&listener));
}
