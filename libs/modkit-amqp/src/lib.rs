//! ModKit AMQP plumbing (RabbitMQ via lapin).
//!
//! Services build one [`lapin::Connection`] at startup and derive from it a
//! confirmed [`AmqpPublisher`] and/or a manual-ack consumer whose deliveries
//! are exposed through the [`InboundMessage`] abstraction, so message
//! handling can be tested without a broker.

mod connection;
mod consumer;
mod publisher;

pub use connection::{connect, declare_durable_queue, describe_url};
pub use consumer::{deliveries, open_consumer, AmqpDelivery, InboundMessage};
pub use publisher::{message_properties, AmqpPublisher};

pub use lapin::Connection;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmqpError {
    #[error("AMQP error: {0}")]
    Lapin(#[from] lapin::Error),

    #[error("broker did not confirm publish to queue '{queue}'")]
    NotConfirmed { queue: String },
}

pub type Result<T> = std::result::Result<T, AmqpError>;
