use eventbus::subscribers;

struct Sink;

#[subscribers]
impl Sink {
    #[subscribe]
    fn on_nothing(&self) {}
}

fn main() {
    let _ = Sink;
}
