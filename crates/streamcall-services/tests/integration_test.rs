use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use streamcall::mock::MockStore;
use streamcall::store::StoreError;
use streamcall::{CallContext, CallSpec, Code, DispatchConfig, Dispatcher, Receiver, Sender, Status};
use streamcall_services::blog_service::{Blog, BlogServer, ResourceDocument, ResourceRepository};
use streamcall_services::calculator_service::COMPUTE_SUM;
use streamcall_services::clients::{BlogClient, GreetClient};
use streamcall_services::greet_service::{
    GreetServer, GreetService, UnimplementedGreetService, GREET_WITH_DEADLINE,
};
use streamcall_services::lifecycle::{ServiceSystem, SystemConfig};
use streamcall_services::model::*;
use uuid::Uuid;

fn start_system() -> ServiceSystem {
    let config = SystemConfig {
        greet_interval_ms: 1000,
        greet_repeat: 3,
        ..SystemConfig::default()
    };
    ServiceSystem::new(config).expect("Failed to start system")
}

// --- Blog ---

#[tokio::test]
async fn test_blog_crud_round_trip() {
    let system = start_system();
    let blog = &system.blog_client;

    let created = blog
        .create_resource(Resource::new("alice", "Title", "Body"))
        .await
        .expect("Failed to create resource");
    assert!(!created.id.is_empty());
    assert_eq!(created.author_id, "alice");

    let read = blog
        .read_resource(created.id.clone())
        .await
        .expect("Failed to read resource");
    assert_eq!(read, created);

    let changed = Resource {
        content: "Edited".to_string(),
        ..created.clone()
    };
    let updated = blog
        .update_resource(changed.clone())
        .await
        .expect("Failed to update resource");
    assert_eq!(updated, changed);
    assert_eq!(blog.read_resource(created.id.clone()).await.unwrap(), changed);

    let deleted = blog
        .delete_resource(created.id.clone())
        .await
        .expect("Failed to delete resource");
    assert_eq!(deleted, created.id);

    let err = blog.read_resource(created.id).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    system.shutdown().await.expect("Failed to shut down");
}

#[tokio::test]
async fn test_blog_create_ignores_supplied_id() {
    let system = start_system();
    let mut resource = Resource::new("bob", "T", "C");
    resource.id = "chosen-by-caller".to_string();

    let created = system.blog_client.create_resource(resource).await.unwrap();
    assert_ne!(created.id, "chosen-by-caller");
    assert!(Uuid::parse_str(&created.id).is_ok());
}

#[tokio::test]
async fn test_blog_absent_and_malformed_ids() {
    let system = start_system();
    let blog = &system.blog_client;
    let absent = Uuid::new_v4().to_string();

    let err = blog.read_resource(absent.clone()).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let mut missing = Resource::new("carol", "T", "C");
    missing.id = absent.clone();
    let err = blog.update_resource(missing).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = blog.delete_resource(absent).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = blog.read_resource("not-an-id").await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let mut malformed = Resource::new("carol", "T", "C");
    malformed.id = "not-an-id".to_string();
    let err = blog.update_resource(malformed).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = blog.delete_resource("not-an-id").await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_blog_list_in_insertion_order() {
    let system = start_system();
    let blog = &system.blog_client;

    let empty: Vec<Resource> = blog.list_resources().try_collect().await.unwrap();
    assert!(empty.is_empty());

    let first = blog
        .create_resource(Resource::new("a", "one", "1"))
        .await
        .unwrap();
    let second = blog
        .create_resource(Resource::new("b", "two", "2"))
        .await
        .unwrap();

    let listed: Vec<Resource> = blog.list_resources().try_collect().await.unwrap();
    assert_eq!(listed, vec![first, second]);
}

#[tokio::test]
async fn test_blog_list_reports_cursor_failure_after_items() {
    let mock = MockStore::<ResourceDocument>::new();
    let stored = ResourceDocument {
        id: Some(Uuid::new_v4()),
        author_id: "dave".to_string(),
        title: "Kept".to_string(),
        content: "Body".to_string(),
    };
    mock.expect_find_all().return_items(vec![
        Ok(stored.clone()),
        Err(StoreError::Cursor("connection reset".into())),
    ]);

    let repository = ResourceRepository::new(Arc::new(mock.clone()));
    let dispatcher = Dispatcher::builder(DispatchConfig::default())
        .add_service(BlogServer::new(Blog::new(repository)))
        .unwrap()
        .build();
    let blog = BlogClient::new(Arc::new(dispatcher));

    let items: Vec<Result<Resource, Status>> = blog.list_resources().collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &Resource::from(stored));
    assert_eq!(items[1].as_ref().unwrap_err().code(), Code::Internal);

    mock.verify();
}

// --- Calculator ---

#[tokio::test]
async fn test_calculator_unary_methods() {
    let system = start_system();
    let calculator = &system.calculator_client;

    assert_eq!(calculator.sum(3, 10).await.unwrap(), 13);
    assert_eq!(
        calculator.sum(i64::MAX, 1).await.unwrap_err().code(),
        Code::InvalidArgument
    );

    assert_eq!(calculator.square_root(25.0).await.unwrap(), 5.0);
    assert_eq!(
        calculator.square_root(-1.0).await.unwrap_err().code(),
        Code::InvalidArgument
    );
}

#[tokio::test]
async fn test_calculator_streams_prime_factors() {
    let system = start_system();

    let factors: Vec<u64> = system
        .calculator_client
        .decompose_into_primes(120)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(factors, vec![2, 2, 2, 3, 5]);

    let none: Vec<u64> = system
        .calculator_client
        .decompose_into_primes(1)
        .try_collect()
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_calculator_prime_search_stops_at_deadline() {
    let system = start_system();
    let calculator = system
        .calculator_client
        .clone()
        .with_timeout(Duration::from_millis(50));

    // The largest prime below 2^64: trial division would run for seconds.
    let started = std::time::Instant::now();
    let items: Vec<Result<u64, Status>> = calculator
        .decompose_into_primes(18_446_744_073_709_551_557)
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap_err().code(), Code::DeadlineExceeded);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_calculator_average() {
    let system = start_system();
    let calculator = &system.calculator_client;

    let average = calculator
        .compute_average(vec![3, 5, 9, 54, 23])
        .await
        .unwrap();
    assert!((average - 18.8).abs() < 1e-9);

    let err = calculator.compute_average(Vec::new()).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_calculator_running_maximum() {
    let system = start_system();

    let maxima: Vec<f64> = system
        .calculator_client
        .track_running_maximum(vec![1.0, 5.0, 3.0, 6.0, 2.0, 20.0])
        .try_collect()
        .await
        .unwrap();
    assert_eq!(maxima, vec![5.0, 6.0, 20.0]);
}

// --- Greet ---

#[tokio::test(start_paused = true)]
async fn test_greet_all_modes() {
    let system = start_system();
    let greet = &system.greet_client;

    assert_eq!(
        greet.greet(Greeting::new("Ada", "Lovelace")).await.unwrap(),
        "Hello Ada Lovelace"
    );

    let many: Vec<String> = greet
        .greet_many_times(Greeting::new("Ada", "Lovelace"))
        .try_collect()
        .await
        .unwrap();
    assert_eq!(
        many,
        vec![
            "Hello Ada Lovelace. You are number 1.",
            "Hello Ada Lovelace. You are number 2.",
            "Hello Ada Lovelace. You are number 3.",
        ]
    );

    let long = greet
        .long_greet(vec![
            Greeting::new("Alan", "Turing"),
            Greeting::new("Grace", "Hopper"),
        ])
        .await
        .unwrap();
    assert_eq!(long, "Hi Alan Turing! Hi Grace Hopper! ");

    let everyone: Vec<String> = greet
        .greet_everyone(vec![
            Greeting::new("Alan", "Turing"),
            Greeting::new("Grace", "Hopper"),
        ])
        .try_collect()
        .await
        .unwrap();
    assert_eq!(everyone, vec!["Hello Alan Turing! ", "Hello Grace Hopper! "]);
}

#[tokio::test(start_paused = true)]
async fn test_greet_with_deadline_times_out() {
    let system = start_system();

    let err = system
        .greet_client
        .clone()
        .with_timeout(Duration::from_secs(1))
        .greet_with_deadline(Greeting::new("Ada", "Lovelace"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::DeadlineExceeded);

    let reply = system
        .greet_client
        .clone()
        .with_timeout(Duration::from_secs(5))
        .greet_with_deadline(Greeting::new("Ada", "Lovelace"))
        .await
        .unwrap();
    assert_eq!(reply, "Hello Ada Lovelace");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_deadline() {
    let system = start_system();

    let spec = CallSpec::unary(
        GREET_WITH_DEADLINE,
        GreetRequest::from(Greeting::new("Ada", "Lovelace")),
    )
    .with_timeout(Duration::from_secs(10));
    let call = system.dispatcher().dispatch(spec);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(call.cancel());

    let err = call.outcome().await.unwrap_err();
    assert_eq!(err.code(), Code::Cancelled);
}

#[tokio::test]
async fn test_wrong_message_type_is_invalid_argument() {
    let system = start_system();

    let spec = CallSpec::unary(
        COMPUTE_SUM,
        GreetRequest::from(Greeting::new("Ada", "Lovelace")),
    );
    let err = system.dispatcher().dispatch(spec).outcome().await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_every_method_is_registered() {
    let system = start_system();
    assert_eq!(system.dispatcher().methods().len(), 15);
    system.shutdown().await.unwrap();
}

// --- Partial Services ---

/// Only answers `Greet`.
struct PoliteOnly;

#[async_trait]
impl GreetService for PoliteOnly {
    async fn greet(&self, _ctx: &CallContext, request: GreetRequest) -> Result<GreetResponse, Status> {
        Ok(GreetResponse {
            result: format!("Good day {}", request.greeting),
        })
    }

    async fn greet_many_times(
        &self,
        ctx: &CallContext,
        request: GreetRequest,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        UnimplementedGreetService
            .greet_many_times(ctx, request, responses)
            .await
    }

    async fn long_greet(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<Message>,
    ) -> Result<GreetResponse, Status> {
        UnimplementedGreetService.long_greet(ctx, requests).await
    }

    async fn greet_everyone(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<Message>,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        UnimplementedGreetService
            .greet_everyone(ctx, requests, responses)
            .await
    }

    async fn greet_with_deadline(
        &self,
        ctx: &CallContext,
        request: GreetRequest,
    ) -> Result<GreetResponse, Status> {
        UnimplementedGreetService.greet_with_deadline(ctx, request).await
    }
}

#[tokio::test]
async fn test_partial_service_reports_unimplemented() {
    let dispatcher = Dispatcher::builder(DispatchConfig::default())
        .add_service(GreetServer::new(PoliteOnly))
        .unwrap()
        .build();
    let greet = GreetClient::new(Arc::new(dispatcher));

    assert_eq!(
        greet.greet(Greeting::new("Ada", "Lovelace")).await.unwrap(),
        "Good day Ada Lovelace"
    );

    let err = greet
        .greet_with_deadline(Greeting::new("Ada", "Lovelace"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unimplemented);

    let err = greet
        .long_greet(vec![Greeting::new("Ada", "Lovelace")])
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unimplemented);

    let replies: Vec<Result<String, Status>> = greet
        .greet_everyone(vec![Greeting::new("Ada", "Lovelace")])
        .collect()
        .await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].as_ref().unwrap_err().code(), Code::Unimplemented);
}
