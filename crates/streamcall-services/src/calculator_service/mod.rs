//! # Calculator Service
//!
//! One method per call mode, each backed by an incremental algorithm from
//! [`algorithms`]:
//!
//! | Method | Mode | Algorithm |
//! |--------|------|-----------|
//! | `ComputeSum` | unary | [`checked_sum`] |
//! | `ComputeSquareRoot` | unary | [`square_root`] |
//! | `DecomposeIntoPrimes` | server-stream | [`PrimeFactors`] |
//! | `ComputeAverage` | client-stream | [`RunningAverage`] |
//! | `TrackRunningMaximum` | bidi-stream | [`RunningMaximum`] |

pub mod algorithms;
pub mod handler;
pub mod server;

pub use algorithms::*;
pub use handler::Calculator;
pub use server::CalculatorServer;

use crate::model::*;
use async_trait::async_trait;
use streamcall::{unimplemented_method, CallContext, Receiver, Sender, Status};

pub const COMPUTE_SUM: &str = "ComputeSum";
pub const COMPUTE_SQUARE_ROOT: &str = "ComputeSquareRoot";
pub const DECOMPOSE_INTO_PRIMES: &str = "DecomposeIntoPrimes";
pub const COMPUTE_AVERAGE: &str = "ComputeAverage";
pub const TRACK_RUNNING_MAXIMUM: &str = "TrackRunningMaximum";

#[async_trait]
pub trait CalculatorService: Send + Sync + 'static {
    async fn compute_sum(&self, ctx: &CallContext, request: SumRequest)
        -> Result<SumResponse, Status>;

    async fn compute_square_root(
        &self,
        ctx: &CallContext,
        request: SquareRootRequest,
    ) -> Result<SquareRootResponse, Status>;

    async fn decompose_into_primes(
        &self,
        ctx: &CallContext,
        request: PrimeDecompositionRequest,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status>;

    async fn compute_average(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<Message>,
    ) -> Result<ComputeAverageResponse, Status>;

    async fn track_running_maximum(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<Message>,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status>;
}

/// A `CalculatorService` that implements nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedCalculatorService;

#[async_trait]
impl CalculatorService for UnimplementedCalculatorService {
    async fn compute_sum(
        &self,
        _ctx: &CallContext,
        _request: SumRequest,
    ) -> Result<SumResponse, Status> {
        Err(unimplemented_method(COMPUTE_SUM))
    }

    async fn compute_square_root(
        &self,
        _ctx: &CallContext,
        _request: SquareRootRequest,
    ) -> Result<SquareRootResponse, Status> {
        Err(unimplemented_method(COMPUTE_SQUARE_ROOT))
    }

    async fn decompose_into_primes(
        &self,
        _ctx: &CallContext,
        _request: PrimeDecompositionRequest,
        _responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        Err(unimplemented_method(DECOMPOSE_INTO_PRIMES))
    }

    async fn compute_average(
        &self,
        _ctx: &CallContext,
        _requests: &mut Receiver<Message>,
    ) -> Result<ComputeAverageResponse, Status> {
        Err(unimplemented_method(COMPUTE_AVERAGE))
    }

    async fn track_running_maximum(
        &self,
        _ctx: &CallContext,
        _requests: &mut Receiver<Message>,
        _responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        Err(unimplemented_method(TRACK_RUNNING_MAXIMUM))
    }
}
