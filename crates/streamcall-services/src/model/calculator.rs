use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumRequest {
    pub first_number: i64,
    pub second_number: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumResponse {
    pub sum_result: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquareRootRequest {
    pub number: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquareRootResponse {
    pub number_root: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeDecompositionRequest {
    pub number: u64,
}

/// One prime factor; a factor with multiplicity `k` is sent `k` times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeDecompositionResponse {
    pub prime_factor: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeAverageRequest {
    pub number: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeAverageResponse {
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindMaximumRequest {
    pub number: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindMaximumResponse {
    pub maximum: f64,
}
