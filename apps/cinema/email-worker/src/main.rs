//! Cinema Email Worker - Entry Point
//!
//! Background worker that mails tickets and account links read from Redis streams.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    cinema_email_worker::run().await
}
