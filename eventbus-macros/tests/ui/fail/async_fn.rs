use eventbus::subscribers;

struct Sink;

#[subscribers]
impl Sink {
    #[subscribe]
    async fn on_tick(&self, _: &u32) {}
}

fn main() {
    let _ = Sink;
}
