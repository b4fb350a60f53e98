//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing_subscriber` formatter
//! filtered by `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Dispatch**: every call runs inside a `call` span carrying
//!   `call_id`, `method` and `mode`, so handler logs nest under it.
//! - **Call outcome**: completion at `debug`, cancellation at `info`,
//!   failures and rejections at `warn` with the status code.
//! - **Store**: startup, shutdown and each mutation, tagged with
//!   `document_type`.
//!
//! ```bash
//! RUST_LOG=info cargo run -p streamcall-services
//! RUST_LOG=streamcall=debug,streamcall_services=debug cargo run -p streamcall-services
//! ```
//!
//! A cancelled call looks like:
//!
//! ```text
//! INFO call: Call cancelled reason=Some(DeadlineExceeded) call_id=7 method=GreetWithDeadline mode=unary
//! ```

/// Initializes the global subscriber. Call once, at process start.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // spans and fields identify the call; module paths add noise
        .compact()
        .init();
}
