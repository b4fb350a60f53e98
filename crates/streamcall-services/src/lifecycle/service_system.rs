use crate::blog_service::{Blog, BlogServer, ResourceDocument, ResourceRepository};
use crate::calculator_service::{Calculator, CalculatorServer};
use crate::clients::{BlogClient, CalculatorClient, GreetClient};
use crate::greet_service::{GreetServer, Greeter};
use crate::model::Message;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use streamcall::store::StoreActor;
use streamcall::{DispatchConfig, DispatchError, Dispatcher};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Settings for a [`ServiceSystem`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub dispatch: DispatchConfig,
    /// Pending requests the store actor queues.
    pub store_buffer: usize,
    /// Documents a `find_all` cursor prefetches.
    pub cursor_buffer: usize,
    /// Pause between paced greet replies.
    pub greet_interval_ms: u64,
    /// Replies sent by `GreetManyTimes`.
    pub greet_repeat: u32,
}

impl SystemConfig {
    pub fn greet_interval(&self) -> Duration {
        Duration::from_millis(self.greet_interval_ms)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            store_buffer: 32,
            cursor_buffer: 16,
            greet_interval_ms: 1000,
            greet_repeat: 10,
        }
    }
}

/// A running process: the store actor, the dispatcher and one client per
/// service.
pub struct ServiceSystem {
    pub blog_client: BlogClient,
    pub calculator_client: CalculatorClient,
    pub greet_client: GreetClient,
    dispatcher: Arc<Dispatcher<Message>>,
    store_handle: JoinHandle<()>,
}

impl ServiceSystem {
    /// Starts the store actor and registers every service.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: SystemConfig) -> Result<Self, DispatchError> {
        let (store_actor, store_client) =
            StoreActor::<ResourceDocument>::new(config.store_buffer, config.cursor_buffer);
        let store_handle = tokio::spawn(store_actor.run());

        let repository = ResourceRepository::new(Arc::new(store_client));
        let greeter = Greeter::new(config.greet_interval(), config.greet_repeat);

        let dispatcher = Dispatcher::builder(config.dispatch.clone())
            .add_service(BlogServer::new(Blog::new(repository)))?
            .add_service(CalculatorServer::new(Calculator))?
            .add_service(GreetServer::new(greeter))?
            .build();
        let dispatcher = Arc::new(dispatcher);
        info!(methods = dispatcher.methods().len(), "Service system started");

        Ok(Self {
            blog_client: BlogClient::new(dispatcher.clone()),
            calculator_client: CalculatorClient::new(dispatcher.clone()),
            greet_client: GreetClient::new(dispatcher.clone()),
            dispatcher,
            store_handle,
        })
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<Message>> {
        &self.dispatcher
    }

    /// Releases every client and waits for the store actor to stop.
    ///
    /// Clones of the clients or the dispatcher held elsewhere keep the store
    /// alive, so drop them first.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down service system");
        let ServiceSystem {
            blog_client,
            calculator_client,
            greet_client,
            dispatcher,
            store_handle,
        } = self;
        drop(blog_client);
        drop(calculator_client);
        drop(greet_client);
        drop(dispatcher);

        if let Err(e) = store_handle.await {
            error!(error = %e, "Store actor failed");
            return Err(format!("store actor failed: {}", e));
        }
        info!("Service system stopped");
        Ok(())
    }
}
