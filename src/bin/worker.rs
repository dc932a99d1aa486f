#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quizcomp_rust::run_worker().await {
        eprintln!("quizcomp-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
