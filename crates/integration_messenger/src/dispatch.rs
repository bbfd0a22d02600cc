//! Event dispatch
//!
//! Routes each messaging event of a webhook batch to the handler registered
//! for its payload variant. Handlers run as independent tokio tasks; the
//! caller decides whether to wait for them through [`Dispatched`].

use std::{fmt, future::Future, sync::Arc};

use futures::future::{BoxFuture, FutureExt};
use tokio::{sync::Semaphore, task::JoinHandle};
use tracing::{Instrument, debug, info_span, trace, warn};

use crate::{
    client::Messenger,
    types::{
        Delivery, EventPayload, InboundRequest, MessagingEvent, Optin, Postback, Read,
        ReceivedMessage,
    },
};

type Handler<T> = Arc<dyn Fn(Messenger, i64, T) -> BoxFuture<'static, ()> + Send + Sync>;

fn boxed<T, F, Fut>(handler: F) -> Handler<T>
where
    T: 'static,
    F: Fn(Messenger, i64, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |messenger, sender, payload| handler(messenger, sender, payload).boxed())
}

/// Optional callbacks, one per event variant
///
/// Every handler receives the adapter (to reply), the sender id and the
/// typed payload.
#[derive(Clone, Default)]
pub struct EventHandlers {
    message: Option<Handler<ReceivedMessage>>,
    delivery: Option<Handler<Delivery>>,
    postback: Option<Handler<Postback>>,
    optin: Option<Handler<Optin>>,
    read: Option<Handler<Read>>,
}

impl EventHandlers {
    /// Create an empty handler set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle messages sent by users
    #[must_use]
    pub fn on_message<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Messenger, i64, ReceivedMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.message = Some(boxed(handler));
        self
    }

    /// Handle delivery receipts
    #[must_use]
    pub fn on_delivery<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Messenger, i64, Delivery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.delivery = Some(boxed(handler));
        self
    }

    /// Handle button postbacks
    #[must_use]
    pub fn on_postback<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Messenger, i64, Postback) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.postback = Some(boxed(handler));
        self
    }

    /// Handle plugin opt-ins
    #[must_use]
    pub fn on_optin<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Messenger, i64, Optin) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.optin = Some(boxed(handler));
        self
    }

    /// Handle read receipts
    #[must_use]
    pub fn on_read<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Messenger, i64, Read) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.read = Some(boxed(handler));
        self
    }

    /// Build the handler call for an event, `None` when nobody listens
    fn invocation(
        &self,
        messenger: &Messenger,
        event: MessagingEvent,
    ) -> Option<BoxFuture<'static, ()>> {
        let sender = event.sender;
        let messenger = messenger.clone();
        match event.payload {
            EventPayload::Message(p) => self.message.as_ref().map(|h| h(messenger, sender, p)),
            EventPayload::Delivery(p) => self.delivery.as_ref().map(|h| h(messenger, sender, p)),
            EventPayload::Postback(p) => self.postback.as_ref().map(|h| h(messenger, sender, p)),
            EventPayload::Optin(p) => self.optin.as_ref().map(|h| h(messenger, sender, p)),
            EventPayload::Read(p) => self.read.as_ref().map(|h| h(messenger, sender, p)),
            EventPayload::Unsupported => None,
        }
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("message", &self.message.is_some())
            .field("delivery", &self.delivery.is_some())
            .field("postback", &self.postback.is_some())
            .field("optin", &self.optin.is_some())
            .field("read", &self.read.is_some())
            .finish()
    }
}

/// Spawns handler tasks for webhook batches
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handlers: Arc<EventHandlers>,
    limit: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    /// Dispatcher without a bound on in-flight handlers
    #[must_use]
    pub fn new(handlers: EventHandlers) -> Self {
        Self {
            handlers: Arc::new(handlers),
            limit: None,
        }
    }

    /// Dispatcher running at most `max` handlers at once (`0` = unbounded)
    ///
    /// When the limit is reached, [`Dispatcher::dispatch`] waits for a
    /// running handler to finish before spawning the next one.
    #[must_use]
    pub fn with_max_concurrency(handlers: EventHandlers, max: usize) -> Self {
        Self {
            handlers: Arc::new(handlers),
            limit: (max > 0).then(|| Arc::new(Semaphore::new(max))),
        }
    }

    /// Registered handlers
    #[must_use]
    pub fn handlers(&self) -> &EventHandlers {
        &self.handlers
    }

    /// Spawn one task per event that has a registered handler
    ///
    /// Events are visited entry by entry in array order. Events without a
    /// handler, and `Unsupported` events, are dropped.
    pub async fn dispatch(&self, messenger: &Messenger, request: InboundRequest) -> Dispatched {
        let mut tasks = Vec::new();

        for event in request.entry.into_iter().flat_map(|entry| entry.messaging) {
            let kind = event.payload.kind();
            let sender = event.sender;

            let Some(call) = self.handlers.invocation(messenger, event) else {
                trace!(kind, sender, "No handler registered, dropping event");
                continue;
            };

            let permit = match &self.limit {
                Some(limit) => Arc::clone(limit).acquire_owned().await.ok(),
                None => None,
            };

            let span = info_span!("messenger_event", kind, sender);
            tasks.push(tokio::spawn(
                async move {
                    call.await;
                    drop(permit);
                }
                .instrument(span),
            ));
        }

        debug!(spawned = tasks.len(), "Dispatched webhook events");
        Dispatched { tasks }
    }
}

/// Handles of the tasks spawned for one batch
///
/// Dropping it lets the handlers run to completion in the background.
#[derive(Debug, Default)]
pub struct Dispatched {
    tasks: Vec<JoinHandle<()>>,
}

impl Dispatched {
    /// Number of spawned handler tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no handler was spawned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every handler, returning how many finished without panicking
    pub async fn join(self) -> usize {
        let mut completed = 0;
        for task in self.tasks {
            match task.await {
                Ok(()) => completed += 1,
                Err(e) => warn!(error = %e, "Event handler task failed"),
            }
        }
        completed
    }

    /// Stop tracking the handlers and let them finish on their own
    pub fn detach(self) {}
}
