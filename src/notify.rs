//! Post-commit order notifications.
//!
//! Listeners run after the placing transaction has committed. They are not
//! part of it: a failing listener is logged and never undoes the order.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::events::OrderCreated;

#[async_trait]
pub trait OrderListener: Send + Sync {
    fn name(&self) -> &str;

    async fn order_created(&self, event: &OrderCreated) -> anyhow::Result<()>;
}

/// Registered listeners for [`OrderCreated`].
#[derive(Clone, Default)]
pub struct OrderHooks {
    listeners: Vec<Arc<dyn OrderListener>>,
}

impl OrderHooks {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, listener: impl OrderListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn len(&self) -> usize { self.listeners.len() }
    pub fn is_empty(&self) -> bool { self.listeners.is_empty() }

    /// Fires every listener on its own task and returns immediately.
    pub fn dispatch(&self, event: OrderCreated) {
        let event = Arc::new(event);
        for listener in &self.listeners {
            let listener = Arc::clone(listener);
            let event = Arc::clone(&event);
            tokio::spawn(async move {
                if let Err(e) = listener.order_created(&event).await {
                    tracing::warn!(listener = listener.name(), order_id = event.order_id, error = %e, "Order listener failed");
                }
            });
        }
    }
}

impl fmt::Debug for OrderHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.listeners.iter().map(|l| l.name()).collect();
        f.debug_struct("OrderHooks").field("listeners", &names).finish()
    }
}

/// Writes each placed order to the log.
#[derive(Debug, Default)]
pub struct LogListener;

#[async_trait]
impl OrderListener for LogListener {
    fn name(&self) -> &str { "log" }

    async fn order_created(&self, event: &OrderCreated) -> anyhow::Result<()> {
        tracing::info!(
            order_id = event.order_id,
            customer_id = event.customer_id,
            items = event.item_count,
            total = %event.total,
            "Order created"
        );
        Ok(())
    }
}

/// Publishes each placed order as JSON on a NATS subject.
#[derive(Debug, Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
    subject: String,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client, subject: impl Into<String>) -> Self {
        Self { client, subject: subject.into() }
    }

    pub async fn connect(url: &str, subject: impl Into<String>) -> anyhow::Result<Self> {
        let client = async_nats::connect(url).await?;
        Ok(Self::new(client, subject))
    }
}

#[async_trait]
impl OrderListener for NatsPublisher {
    fn name(&self) -> &str { "nats" }

    async fn order_created(&self, event: &OrderCreated) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(event)?;
        self.client.publish(self.subject.clone(), payload.into()).await?;
        Ok(())
    }
}
