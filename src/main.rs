#[tokio::main]
async fn main() -> anyhow::Result<()> {
  otp_view_lib::run().await
}
