#[tokio::main]
async fn main() {
    ideaboard::start_server().await;
}
