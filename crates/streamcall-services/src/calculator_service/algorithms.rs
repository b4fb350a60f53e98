//! # Numeric Aggregation
//!
//! Pure, incremental building blocks for the calculator handlers. Each one
//! consumes input a value at a time so a handler can interleave it with
//! channel operations and cancellation checks.

use streamcall::Status;

/// Lazily yields the prime factors of `n` in non-decreasing order, each as
/// often as it divides `n`.
///
/// ```
/// use streamcall_services::calculator_service::PrimeFactors;
///
/// let factors: Vec<u64> = PrimeFactors::new(120).collect();
/// assert_eq!(factors, vec![2, 2, 2, 3, 5]);
/// ```
#[derive(Debug, Clone)]
pub struct PrimeFactors {
    remaining: u64,
    divisor: u64,
}

/// Outcome of one bounded round of trial division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorStep {
    Factor(u64),
    /// The budget ran out before the next factor was found.
    Searching,
    Done,
}

impl PrimeFactors {
    pub fn new(n: u64) -> Self {
        Self {
            remaining: n,
            divisor: 2,
        }
    }

    /// Tries at most `budget` divisors and reports where the search stands.
    pub fn advance(&mut self, budget: u64) -> FactorStep {
        if self.remaining <= 1 {
            return FactorStep::Done;
        }
        let mut tried = 0;
        while self.divisor.saturating_mul(self.divisor) <= self.remaining {
            if tried == budget {
                return FactorStep::Searching;
            }
            if self.remaining % self.divisor == 0 {
                self.remaining /= self.divisor;
                return FactorStep::Factor(self.divisor);
            }
            self.divisor += 1;
            tried += 1;
        }
        // No divisor up to the square root: what is left is prime.
        let prime = self.remaining;
        self.remaining = 1;
        FactorStep::Factor(prime)
    }
}

impl Iterator for PrimeFactors {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        match self.advance(u64::MAX) {
            FactorStep::Factor(factor) => Some(factor),
            FactorStep::Searching | FactorStep::Done => None,
        }
    }
}

/// Running mean over a stream of integers.
#[derive(Debug, Clone, Default)]
pub struct RunningAverage {
    sum: i64,
    count: u64,
}

impl RunningAverage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: i64) -> Result<(), Status> {
        self.sum = self
            .sum
            .checked_add(value)
            .ok_or_else(|| Status::invalid_argument("sum of inputs overflows"))?;
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// The mean of everything pushed; an empty input has no mean.
    pub fn finish(&self) -> Result<f64, Status> {
        if self.count == 0 {
            return Err(Status::invalid_argument(
                "cannot average an empty sequence",
            ));
        }
        Ok(self.sum as f64 / self.count as f64)
    }
}

/// Tracks the largest value seen so far.
///
/// The first value only sets the baseline; after that, every value strictly
/// above the current maximum becomes the new maximum and is reported.
#[derive(Debug, Clone, Default)]
pub struct RunningMaximum {
    current: Option<f64>,
}

impl RunningMaximum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new maximum when `value` raises it.
    pub fn push(&mut self, value: f64) -> Result<Option<f64>, Status> {
        if value.is_nan() {
            return Err(Status::invalid_argument("NaN has no ordering"));
        }
        match self.current {
            None => {
                self.current = Some(value);
                Ok(None)
            }
            Some(max) if value > max => {
                self.current = Some(value);
                Ok(Some(value))
            }
            Some(_) => Ok(None),
        }
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }
}

pub fn checked_sum(a: i64, b: i64) -> Result<i64, Status> {
    a.checked_add(b)
        .ok_or_else(|| Status::invalid_argument(format!("{} + {} overflows", a, b)))
}

pub fn square_root(number: f64) -> Result<f64, Status> {
    if number.is_nan() || number < 0.0 {
        return Err(Status::invalid_argument(format!(
            "received a negative number: {}",
            number
        )));
    }
    Ok(number.sqrt())
}
