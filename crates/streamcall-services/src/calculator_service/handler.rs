use super::algorithms::{
    checked_sum, square_root, FactorStep, PrimeFactors, RunningAverage, RunningMaximum,
};
use super::CalculatorService;
use crate::model::*;
use async_trait::async_trait;
use streamcall::{CallContext, Receiver, Sender, Status};
use tracing::debug;

/// Divisors tried between cancellation checks while factoring.
const SEARCH_BUDGET: u64 = 100_000;

/// The calculator. Stateless; all state lives in the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculator;

#[async_trait]
impl CalculatorService for Calculator {
    async fn compute_sum(
        &self,
        _ctx: &CallContext,
        request: SumRequest,
    ) -> Result<SumResponse, Status> {
        debug!(?request, "ComputeSum");
        let sum_result = checked_sum(request.first_number, request.second_number)?;
        Ok(SumResponse { sum_result })
    }

    async fn compute_square_root(
        &self,
        _ctx: &CallContext,
        request: SquareRootRequest,
    ) -> Result<SquareRootResponse, Status> {
        debug!(?request, "ComputeSquareRoot");
        let number_root = square_root(request.number)?;
        Ok(SquareRootResponse { number_root })
    }

    async fn decompose_into_primes(
        &self,
        ctx: &CallContext,
        request: PrimeDecompositionRequest,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        debug!(number = request.number, "DecomposeIntoPrimes");
        let mut factors = PrimeFactors::new(request.number);
        loop {
            ctx.check()?;
            match factors.advance(SEARCH_BUDGET) {
                FactorStep::Factor(prime_factor) => {
                    responses
                        .send(PrimeDecompositionResponse { prime_factor })
                        .await?;
                }
                FactorStep::Searching => tokio::task::yield_now().await,
                FactorStep::Done => return Ok(()),
            }
        }
    }

    async fn compute_average(
        &self,
        _ctx: &CallContext,
        requests: &mut Receiver<Message>,
    ) -> Result<ComputeAverageResponse, Status> {
        let mut average = RunningAverage::new();
        while let Some(request) = requests.recv_as::<ComputeAverageRequest>().await? {
            average.push(request.number)?;
        }
        debug!(count = average.count(), "ComputeAverage");
        Ok(ComputeAverageResponse {
            average: average.finish()?,
        })
    }

    async fn track_running_maximum(
        &self,
        _ctx: &CallContext,
        requests: &mut Receiver<Message>,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        let mut maximum = RunningMaximum::new();
        while let Some(request) = requests.recv_as::<FindMaximumRequest>().await? {
            if let Some(new_max) = maximum.push(request.number)? {
                debug!(maximum = new_max, "New maximum");
                responses
                    .send(FindMaximumResponse { maximum: new_max })
                    .await?;
            }
        }
        Ok(())
    }
}
