use super::{ResponseStream, ServiceClient};
use crate::greet_service::{
    GREET, GREET_EVERYONE, GREET_MANY_TIMES, GREET_WITH_DEADLINE, LONG_GREET,
};
use crate::model::*;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use streamcall::{Dispatcher, Status};

#[derive(Clone)]
pub struct GreetClient {
    dispatcher: Arc<Dispatcher<Message>>,
    timeout: Option<Duration>,
}

impl GreetClient {
    pub fn new(dispatcher: Arc<Dispatcher<Message>>) -> Self {
        Self {
            dispatcher,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn greet(&self, greeting: Greeting) -> Result<String, Status> {
        let response: GreetResponse = self.unary(GREET, GreetRequest::from(greeting)).await?;
        Ok(response.result)
    }

    pub fn greet_many_times(&self, greeting: Greeting) -> ResponseStream<String> {
        self.server_streaming(GREET_MANY_TIMES, GreetRequest::from(greeting))
            .map(|item: Result<GreetResponse, Status>| item.map(|r| r.result))
            .boxed()
    }

    pub async fn long_greet(&self, greetings: Vec<Greeting>) -> Result<String, Status> {
        let requests = greetings.into_iter().map(GreetRequest::from);
        let response: GreetResponse = self.client_streaming(LONG_GREET, requests).await?;
        Ok(response.result)
    }

    pub fn greet_everyone(&self, greetings: Vec<Greeting>) -> ResponseStream<String> {
        let requests = greetings.into_iter().map(GreetRequest::from);
        self.bidi_streaming(GREET_EVERYONE, requests)
            .map(|item: Result<GreetResponse, Status>| item.map(|r| r.result))
            .boxed()
    }

    /// Fails with `DeadlineExceeded` when the client timeout is shorter
    /// than the handler's pacing.
    pub async fn greet_with_deadline(&self, greeting: Greeting) -> Result<String, Status> {
        let response: GreetResponse = self
            .unary(GREET_WITH_DEADLINE, GreetRequest::from(greeting))
            .await?;
        Ok(response.result)
    }
}

impl ServiceClient for GreetClient {
    fn dispatcher(&self) -> &Dispatcher<Message> {
        &self.dispatcher
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
