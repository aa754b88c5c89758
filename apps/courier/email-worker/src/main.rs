//! Email Worker Service - Entry Point
//!
//! Background worker that processes notification jobs from the durable
//! queue.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    courier_email_worker::run().await
}
