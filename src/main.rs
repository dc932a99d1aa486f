#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quizcomp_rust::run().await {
        eprintln!("quizcomp-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
