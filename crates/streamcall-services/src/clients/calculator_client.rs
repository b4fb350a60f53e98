use super::{ResponseStream, ServiceClient};
use crate::calculator_service::{
    COMPUTE_AVERAGE, COMPUTE_SQUARE_ROOT, COMPUTE_SUM, DECOMPOSE_INTO_PRIMES,
    TRACK_RUNNING_MAXIMUM,
};
use crate::model::*;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use streamcall::{Dispatcher, Status};

#[derive(Clone)]
pub struct CalculatorClient {
    dispatcher: Arc<Dispatcher<Message>>,
    timeout: Option<Duration>,
}

impl CalculatorClient {
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

    pub async fn sum(&self, first_number: i64, second_number: i64) -> Result<i64, Status> {
        let request = SumRequest {
            first_number,
            second_number,
        };
        let response: SumResponse = self.unary(COMPUTE_SUM, request).await?;
        Ok(response.sum_result)
    }

    pub async fn square_root(&self, number: f64) -> Result<f64, Status> {
        let response: SquareRootResponse = self
            .unary(COMPUTE_SQUARE_ROOT, SquareRootRequest { number })
            .await?;
        Ok(response.number_root)
    }

    /// Prime factors in non-decreasing order, repeated by multiplicity.
    pub fn decompose_into_primes(&self, number: u64) -> ResponseStream<u64> {
        self.server_streaming(DECOMPOSE_INTO_PRIMES, PrimeDecompositionRequest { number })
            .map(|item: Result<PrimeDecompositionResponse, Status>| item.map(|r| r.prime_factor))
            .boxed()
    }

    pub async fn compute_average(&self, numbers: Vec<i64>) -> Result<f64, Status> {
        let requests = numbers
            .into_iter()
            .map(|number| ComputeAverageRequest { number });
        let response: ComputeAverageResponse =
            self.client_streaming(COMPUTE_AVERAGE, requests).await?;
        Ok(response.average)
    }

    /// Each new maximum as it is observed.
    pub fn track_running_maximum(&self, numbers: Vec<f64>) -> ResponseStream<f64> {
        let requests = numbers
            .into_iter()
            .map(|number| FindMaximumRequest { number });
        self.bidi_streaming(TRACK_RUNNING_MAXIMUM, requests)
            .map(|item: Result<FindMaximumResponse, Status>| item.map(|r| r.maximum))
            .boxed()
    }
}

impl ServiceClient for CalculatorClient {
    fn dispatcher(&self) -> &Dispatcher<Message> {
        &self.dispatcher
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
