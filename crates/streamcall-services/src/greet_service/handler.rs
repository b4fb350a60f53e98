use super::GreetService;
use crate::model::*;
use async_trait::async_trait;
use std::time::Duration;
use streamcall::{CallContext, Receiver, Sender, Status};
use tracing::{debug, info};

/// Pacing steps `GreetWithDeadline` waits before replying.
const DEADLINE_GREET_STEPS: u32 = 3;

/// The greet service.
#[derive(Debug, Clone)]
pub struct Greeter {
    interval: Duration,
    repeat: u32,
}

impl Greeter {
    /// * `interval` - pause between paced replies.
    /// * `repeat` - replies sent by `GreetManyTimes`.
    pub fn new(interval: Duration, repeat: u32) -> Self {
        Self { interval, repeat }
    }
}

impl Default for Greeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 10)
    }
}

#[async_trait]
impl GreetService for Greeter {
    async fn greet(
        &self,
        _ctx: &CallContext,
        request: GreetRequest,
    ) -> Result<GreetResponse, Status> {
        debug!(greeting = %request.greeting, "Greet");
        Ok(GreetResponse {
            result: format!("Hello {}", request.greeting),
        })
    }

    async fn greet_many_times(
        &self,
        ctx: &CallContext,
        request: GreetRequest,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        for i in 1..=self.repeat {
            if i > 1 {
                ctx.sleep(self.interval).await?;
            }
            let result = format!("Hello {}. You are number {}.", request.greeting, i);
            responses.send(GreetResponse { result }).await?;
        }
        Ok(())
    }

    async fn long_greet(
        &self,
        _ctx: &CallContext,
        requests: &mut Receiver<Message>,
    ) -> Result<GreetResponse, Status> {
        let mut result = String::new();
        let mut received = 0usize;
        while let Some(request) = requests.recv_as::<GreetRequest>().await? {
            result.push_str(&format!("Hi {}! ", request.greeting));
            received += 1;
        }
        info!(received, "LongGreet finished");
        Ok(GreetResponse { result })
    }

    async fn greet_everyone(
        &self,
        _ctx: &CallContext,
        requests: &mut Receiver<Message>,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        while let Some(request) = requests.recv_as::<GreetRequest>().await? {
            let result = format!("Hello {}! ", request.greeting);
            responses.send(GreetResponse { result }).await?;
        }
        Ok(())
    }

    async fn greet_with_deadline(
        &self,
        ctx: &CallContext,
        request: GreetRequest,
    ) -> Result<GreetResponse, Status> {
        for step in 1..=DEADLINE_GREET_STEPS {
            debug!(step, remaining = ?ctx.remaining(), "GreetWithDeadline waiting");
            ctx.sleep(self.interval).await?;
        }
        Ok(GreetResponse {
            result: format!("Hello {}", request.greeting),
        })
    }
}
