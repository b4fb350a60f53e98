use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use streamcall::{
    unimplemented_method, CallContext, CallMode, CallSpec, CallState, Code, DispatchConfig,
    DispatchError, Dispatcher, MethodDescriptor, Receiver, Sender, Service, Status,
};

// --- Test Service ---

struct Numbers;

#[async_trait]
impl Service<i64> for Numbers {
    fn name(&self) -> &'static str {
        "numbers"
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new("Double", CallMode::Unary),
            MethodDescriptor::new("Stall", CallMode::Unary),
            MethodDescriptor::new("Panic", CallMode::Unary),
            MethodDescriptor::new("Crunch", CallMode::Unary),
            MethodDescriptor::new("Count", CallMode::ServerStreaming),
            MethodDescriptor::new("Flood", CallMode::ServerStreaming),
            MethodDescriptor::new("Crash", CallMode::ServerStreaming),
            MethodDescriptor::new("Total", CallMode::ClientStreaming),
            MethodDescriptor::new("Echo", CallMode::BidiStreaming),
        ]
    }

    async fn unary(&self, ctx: &CallContext, request: i64) -> Result<i64, Status> {
        match ctx.method() {
            "Double" if request < 0 => Err(Status::invalid_argument("negative input")),
            "Double" => Ok(request * 2),
            "Stall" => {
                // Ignores the call context on purpose.
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(request)
            }
            "Panic" => panic!("handler bug"),
            "Crunch" => {
                // Holds its worker thread without yielding.
                std::thread::sleep(Duration::from_millis(300));
                Ok(request)
            }
            other => Err(unimplemented_method(other)),
        }
    }

    async fn server_streaming(
        &self,
        ctx: &CallContext,
        request: i64,
        responses: &mut Sender<i64>,
    ) -> Result<(), Status> {
        match ctx.method() {
            "Count" => {
                for i in 1..=request {
                    if i == 4 && request == 99 {
                        return Err(Status::internal("counter broke"));
                    }
                    responses.send(i).await?;
                    ctx.sleep(Duration::from_millis(10)).await?;
                }
                Ok(())
            }
            "Flood" => {
                let mut i = 0;
                loop {
                    i += 1;
                    responses.send(i).await?;
                }
            }
            "Crash" => {
                responses.send(request).await?;
                panic!("stream handler bug");
            }
            other => Err(unimplemented_method(other)),
        }
    }

    async fn client_streaming(
        &self,
        _ctx: &CallContext,
        requests: &mut Receiver<i64>,
    ) -> Result<i64, Status> {
        let mut total = 0;
        while let Some(n) = requests.recv().await? {
            total += n;
        }
        Ok(total)
    }

    async fn bidi_streaming(
        &self,
        _ctx: &CallContext,
        requests: &mut Receiver<i64>,
        responses: &mut Sender<i64>,
    ) -> Result<(), Status> {
        while let Some(n) = requests.recv().await? {
            responses.send(n * 10).await?;
        }
        Ok(())
    }
}

struct Shadow;

#[async_trait]
impl Service<i64> for Shadow {
    fn name(&self) -> &'static str {
        "shadow"
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        vec![MethodDescriptor::new("Double", CallMode::Unary)]
    }

    async fn unary(&self, ctx: &CallContext, _request: i64) -> Result<i64, Status> {
        Err(unimplemented_method(ctx.method()))
    }

    async fn server_streaming(
        &self,
        ctx: &CallContext,
        _request: i64,
        _responses: &mut Sender<i64>,
    ) -> Result<(), Status> {
        Err(unimplemented_method(ctx.method()))
    }

    async fn client_streaming(
        &self,
        ctx: &CallContext,
        _requests: &mut Receiver<i64>,
    ) -> Result<i64, Status> {
        Err(unimplemented_method(ctx.method()))
    }

    async fn bidi_streaming(
        &self,
        ctx: &CallContext,
        _requests: &mut Receiver<i64>,
        _responses: &mut Sender<i64>,
    ) -> Result<(), Status> {
        Err(unimplemented_method(ctx.method()))
    }
}

fn dispatcher_with(config: DispatchConfig) -> Dispatcher<i64> {
    Dispatcher::builder(config)
        .add_service(Numbers)
        .unwrap()
        .build()
}

fn dispatcher() -> Dispatcher<i64> {
    dispatcher_with(DispatchConfig::default())
}

// --- Tests ---

#[tokio::test]
async fn test_unary_round_trip_and_error() {
    let dispatcher = dispatcher();

    let call = dispatcher.dispatch(CallSpec::unary("Double", 21));
    let ctx = call.context().clone();
    assert_eq!(call.outcome().await, Ok(Some(42)));
    assert_eq!(ctx.state(), CallState::Completed);

    let call = dispatcher.dispatch(CallSpec::unary("Double", -1));
    let ctx = call.context().clone();
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::InvalidArgument);
    assert_eq!(ctx.state(), CallState::Failed);
}

#[tokio::test]
async fn test_unknown_method_and_wrong_mode_are_unimplemented() {
    let dispatcher = dispatcher();

    let call = dispatcher.dispatch(CallSpec::unary("Triple", 1));
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::Unimplemented);

    // A rejected streaming call hands back channels that are already terminated.
    let mut call = dispatcher.dispatch(CallSpec::server_streaming("Double", 1));
    let err = call.recv().await.unwrap_err();
    assert_eq!(err.code(), Code::Unimplemented);
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::Unimplemented);
}

#[tokio::test]
async fn test_missing_request_is_invalid_argument() {
    let dispatcher = dispatcher();
    let spec = CallSpec {
        method: "Double".to_string(),
        mode: CallMode::Unary,
        deadline: None,
        request: None,
    };
    let call = dispatcher.dispatch(spec);
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_duplicate_method_is_rejected() {
    let result = Dispatcher::<i64>::builder(DispatchConfig::default())
        .add_service(Numbers)
        .unwrap()
        .add_shared(Arc::new(Shadow));

    match result {
        Err(DispatchError::DuplicateMethod {
            method,
            first,
            second,
        }) => {
            assert_eq!(method, "Double");
            assert_eq!(first, "numbers");
            assert_eq!(second, "shadow");
        }
        Ok(_) => panic!("duplicate registration accepted"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_server_stream_delivers_in_order_then_ends() {
    let dispatcher = dispatcher();
    let mut call = dispatcher.dispatch(CallSpec::server_streaming("Count", 5));

    let mut received = Vec::new();
    while let Some(n) = call.recv().await.unwrap() {
        received.push(n);
    }
    assert_eq!(received, vec![1, 2, 3, 4, 5]);
    assert_eq!(call.recv().await, Ok(None));
    assert_eq!(call.outcome().await, Ok(None));
}

#[tokio::test(start_paused = true)]
async fn test_server_stream_error_follows_sent_items() {
    let dispatcher = dispatcher();
    let mut call = dispatcher.dispatch(CallSpec::server_streaming("Count", 99));

    assert_eq!(call.recv().await, Ok(Some(1)));
    assert_eq!(call.recv().await, Ok(Some(2)));
    assert_eq!(call.recv().await, Ok(Some(3)));
    assert_eq!(call.recv().await.unwrap_err().code(), Code::Internal);
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::Internal);
}

#[tokio::test]
async fn test_client_stream_sums_requests() {
    let dispatcher = dispatcher();
    let mut call = dispatcher.dispatch(CallSpec::client_streaming("Total"));
    for n in 1..=4 {
        call.send(n).await.unwrap();
    }
    call.close_requests();
    assert_eq!(call.outcome().await, Ok(Some(10)));
}

#[tokio::test]
async fn test_bidi_stream_with_independent_sender() {
    let dispatcher = dispatcher();
    let mut call = dispatcher.dispatch(CallSpec::bidi_streaming("Echo"));
    let mut requests = call.take_requests().unwrap();

    let sender = tokio::spawn(async move {
        for n in 1..=3 {
            requests.send(n).await?;
        }
        requests.close();
        Ok::<_, Status>(())
    });

    let mut received = Vec::new();
    while let Some(n) = call.recv().await.unwrap() {
        received.push(n);
    }
    sender.await.unwrap().unwrap();

    assert_eq!(received, vec![10, 20, 30]);
    assert_eq!(call.outcome().await, Ok(None));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_overrides_late_result() {
    let dispatcher = dispatcher();
    let call = dispatcher
        .dispatch(CallSpec::unary("Stall", 7).with_timeout(Duration::from_millis(50)));
    let ctx = call.context().clone();

    let err = call.outcome().await.unwrap_err();
    assert_eq!(err.code(), Code::DeadlineExceeded);
    assert_eq!(ctx.state(), CallState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_terminates_server_stream() {
    let dispatcher = dispatcher();
    let mut call = dispatcher
        .dispatch(CallSpec::server_streaming("Count", 10).with_timeout(Duration::from_millis(35)));

    let mut received = 0;
    let err = loop {
        match call.recv().await {
            Ok(Some(_)) => received += 1,
            Ok(None) => panic!("stream ended normally past its deadline"),
            Err(status) => break status,
        }
    };
    assert!(received < 10);
    assert_eq!(err.code(), Code::DeadlineExceeded);
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::DeadlineExceeded);
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout_applies_without_deadline() {
    let config = DispatchConfig {
        default_timeout_ms: Some(50),
        ..DispatchConfig::default()
    };
    let dispatcher = dispatcher_with(config);

    let call = dispatcher.dispatch(CallSpec::unary("Stall", 1));
    assert!(call.context().deadline().is_some());
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::DeadlineExceeded);
}

#[tokio::test]
async fn test_caller_cancel_stops_server_stream() {
    let dispatcher = dispatcher();
    let mut call = dispatcher.dispatch(CallSpec::server_streaming("Flood", 0));

    for expected in 1..=3 {
        assert_eq!(call.recv().await, Ok(Some(expected)));
    }
    assert!(call.cancel());

    // Anything already buffered drains first, then the cancellation shows.
    let err = loop {
        match call.recv().await {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("cancelled stream ended normally"),
            Err(status) => break status,
        }
    };
    assert_eq!(err.code(), Code::Cancelled);
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::Cancelled);
}

#[tokio::test]
async fn test_panicking_handler_is_unknown() {
    let dispatcher = dispatcher();
    let call = dispatcher.dispatch(CallSpec::unary("Panic", 0));
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::Unknown);
}

#[tokio::test]
async fn test_panicking_stream_handler_fails_response_stream() {
    let dispatcher = dispatcher();
    let mut call = dispatcher.dispatch(CallSpec::server_streaming("Crash", 7));

    assert_eq!(call.recv().await, Ok(Some(7)));
    assert_eq!(call.recv().await.unwrap_err().code(), Code::Unknown);
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::Unknown);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_after_missed_deadline_reports_deadline() {
    let dispatcher = dispatcher();
    let call = dispatcher
        .dispatch(CallSpec::unary("Crunch", 3).with_timeout(Duration::from_millis(50)));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(call.cancel());

    let ctx = call.context().clone();
    assert_eq!(call.outcome().await.unwrap_err().code(), Code::DeadlineExceeded);
    assert_eq!(ctx.state(), CallState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_completed_stream_drains_after_deadline() {
    let dispatcher = dispatcher();
    let mut call = dispatcher
        .dispatch(CallSpec::server_streaming("Count", 3).with_timeout(Duration::from_millis(50)));
    let ctx = call.context().clone();

    // The handler finishes at 30ms; the caller only reads after the deadline.
    tokio::time::sleep(Duration::from_millis(110)).await;
    assert_eq!(ctx.state(), CallState::Completed);

    let mut received = Vec::new();
    while let Some(n) = call.recv().await.unwrap() {
        received.push(n);
    }
    assert_eq!(received, vec![1, 2, 3]);
    assert_eq!(call.recv().await, Ok(None));
    assert_eq!(call.outcome().await, Ok(None));
}

#[tokio::test]
async fn test_methods_are_listed_sorted() {
    let dispatcher = dispatcher();
    let names: Vec<_> = dispatcher.methods().iter().map(|m| m.name).collect();
    assert_eq!(
        names,
        vec!["Count", "Crash", "Crunch", "Double", "Echo", "Flood", "Panic", "Stall", "Total"]
    );
}
