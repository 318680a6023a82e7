//! Redis Streams source against a real Redis (requires Docker).

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use stream_worker::{MessageSource, RedisStreamConsumer, WorkerConfig, PAYLOAD_FIELD};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

async fn start_redis() -> (ContainerAsync<Redis>, redis::Client) {
    let container = Redis::default()
        .with_tag("8-alpine")
        .start()
        .await
        .expect("Failed to start Redis container");
    let port = container
        .get_host_port_ipv4(6379)
        .await
        .expect("Failed to get Redis port");
    let client = redis::Client::open(format!("redis://127.0.0.1:{port}"))
        .expect("Failed to create Redis client");
    (container, client)
}

async fn consumer(client: &redis::Client, config: WorkerConfig) -> RedisStreamConsumer {
    let manager = ConnectionManager::new(client.clone())
        .await
        .expect("Failed to connect to Redis");
    RedisStreamConsumer::new(manager, config)
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_fetch_commit_and_pending_list() {
    let (_container, client) = start_redis().await;
    let config = WorkerConfig::new(["order_created"], "email_service_orders")
        .with_block_timeout_ms(200);
    let mut source = consumer(&client, config).await;
    source.prepare().await.unwrap();
    // second prepare hits BUSYGROUP and is fine
    source.prepare().await.unwrap();

    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let id: String = conn
        .xadd("order_created", "*", &[(PAYLOAD_FIELD, r#"{"email":"a@b.com"}"#)])
        .await
        .unwrap();

    let message = source.fetch().await.unwrap().expect("message delivered");
    assert_eq!(message.id(), id);
    assert_eq!(message.stream(), "order_created");
    assert_eq!(message.payload(), br#"{"email":"a@b.com"}"#);

    let pending: (i64, Option<String>, Option<String>, Option<Vec<(String, String)>>) = redis::cmd("XPENDING")
        .arg("order_created")
        .arg("email_service_orders")
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(pending.0, 1);

    source.commit(message.into_commit_token()).await.unwrap();

    let pending: (i64, Option<String>, Option<String>, Option<Vec<(String, String)>>) = redis::cmd("XPENDING")
        .arg("order_created")
        .arg("email_service_orders")
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(pending.0, 0);

    // nothing left: the block times out empty
    assert!(source.fetch().await.unwrap().is_none());
    source.close().await;
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_uncommitted_message_is_reclaimed_by_another_consumer() {
    let (_container, client) = start_redis().await;
    let streams = [
        "email_verification_delivery_request",
        "password_change_delivery_request",
    ];

    let first_config = WorkerConfig::new(streams, "email_service_tokens")
        .with_consumer_id("worker-a")
        .with_block_timeout_ms(200);
    let mut first = consumer(&client, first_config).await;
    first.prepare().await.unwrap();

    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let _: String = conn
        .xadd("password_change_delivery_request", "*", &[(PAYLOAD_FIELD, "{}")])
        .await
        .unwrap();

    let message = first.fetch().await.unwrap().expect("message delivered");
    assert_eq!(message.stream(), "password_change_delivery_request");
    // simulate a crash: never commit
    drop(message);
    first.close().await;

    let second_config = WorkerConfig::new(streams, "email_service_tokens")
        .with_consumer_id("worker-b")
        .with_block_timeout_ms(200)
        .with_claim_idle_ms(1);
    let mut second = consumer(&client, second_config).await;
    second.prepare().await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let reclaimed = second.fetch().await.unwrap().expect("message reclaimed");
    assert!(reclaimed.is_redelivered());
    assert_eq!(reclaimed.stream(), "password_change_delivery_request");
    second.commit(reclaimed.into_commit_token()).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_fetch_after_close_fails() {
    let (_container, client) = start_redis().await;
    let mut source = consumer(&client, WorkerConfig::new(["order_created"], "g")).await;
    source.close().await;
    assert!(source.fetch().await.is_err());
}
