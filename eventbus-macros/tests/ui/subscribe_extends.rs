use eventbus::{Listener, Priority, subscribers};

struct Runner;

#[subscribers]
impl Runner {
    #[subscribe(priority = Priority::LOWEST)]
    fn run(&self, _: &String) {}

    #[subscribe]
    fn stop(&self, _: &u8) {}
}

struct Sprinter {
    runner: Runner,
}

#[subscribers(extends(runner))]
impl Sprinter {
    #[subscribe(priority = Priority::HIGHEST)]
    fn sprint(&self, _: &String) {}
}

struct Wrapper(Sprinter);

#[subscribers(extends(0))]
impl Wrapper {}

fn main() {
    let methods = Sprinter::subscribe_methods().unwrap();
    let names: Vec<&str> = methods.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["sprint", "run", "stop"]);

    let wrapped = Wrapper::subscribe_methods().unwrap();
    assert_eq!(wrapped.len(), 3);

    let _ = Wrapper(Sprinter { runner: Runner });
}
