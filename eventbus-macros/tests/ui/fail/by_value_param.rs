use eventbus::subscribers;

struct Sink;

#[subscribers]
impl Sink {
    #[subscribe]
    fn on_text(&self, event: String) {}
}

fn main() {
    let _ = Sink;
}
