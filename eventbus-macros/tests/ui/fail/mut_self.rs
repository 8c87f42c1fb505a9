use eventbus::subscribers;

struct Sink;

#[subscribers]
impl Sink {
    #[subscribe]
    fn on_tick(&mut self, _: &u32) {}
}

fn main() {
    let _ = Sink;
}
