use eventbus::subscribers;

struct Sink;

#[subscribers]
impl Sink {
    #[subscribe]
    fn on_pair(&self, left: &u32, right: &u32) {}
}

fn main() {
    let _ = Sink;
}
