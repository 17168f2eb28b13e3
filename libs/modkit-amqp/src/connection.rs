use lapin::{
    options::QueueDeclareOptions, types::FieldTable, Channel, Connection, ConnectionProperties,
    Queue,
};
use tracing::info;

use crate::Result;

/// Open a broker connection.
pub async fn connect(url: &str) -> Result<Connection> {
    let conn = Connection::connect(url, ConnectionProperties::default()).await?;
    info!(broker = %describe_url(url), "connected to AMQP broker");
    Ok(conn)
}

/// Declare `name` as a durable, non-exclusive queue (idempotent).
pub async fn declare_durable_queue(channel: &Channel, name: &str) -> Result<Queue> {
    let queue = channel
        .queue_declare(
            name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(queue)
}

/// `host:port/vhost` of an AMQP URL, without credentials.
pub fn describe_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(u) => format!(
            "{}:{}{}",
            u.host_str().unwrap_or("?"),
            u.port().unwrap_or(5672),
            u.path()
        ),
        Err(_) => "<invalid url>".to_string(),
    }
}
