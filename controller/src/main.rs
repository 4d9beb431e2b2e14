mod device;
mod host;
mod ir;
mod led;
mod sensor;
mod session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
