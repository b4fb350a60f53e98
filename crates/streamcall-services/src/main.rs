use futures::{StreamExt, TryStreamExt};
use streamcall::tracing::setup_tracing;
use streamcall_services::lifecycle::{ServiceSystem, SystemConfig};
use streamcall_services::model::{Greeting, Resource};
use std::time::Duration;
use tracing::{info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    info!("Starting service system");

    let config = SystemConfig {
        greet_interval_ms: 200,
        greet_repeat: 3,
        ..SystemConfig::default()
    };
    let system = ServiceSystem::new(config).map_err(|e| e.to_string())?;

    let span = tracing::info_span!("blog");
    async {
        let blog = &system.blog_client;
        let created = blog
            .create_resource(Resource::new("alice", "First post", "Hello there"))
            .await
            .map_err(|e| e.to_string())?;
        info!(resource_id = %created.id, "Resource created");

        let mut updated = blog
            .read_resource(created.id.clone())
            .await
            .map_err(|e| e.to_string())?;
        updated.content = "Edited".to_string();
        blog.update_resource(updated)
            .await
            .map_err(|e| e.to_string())?;

        let mut resources = blog.list_resources();
        while let Some(resource) = resources.next().await {
            let resource = resource.map_err(|e| e.to_string())?;
            info!(resource_id = %resource.id, title = %resource.title, "Listed resource");
        }

        let deleted = blog
            .delete_resource(created.id)
            .await
            .map_err(|e| e.to_string())?;
        info!(resource_id = %deleted, "Resource deleted");
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("calculator");
    async {
        let calculator = &system.calculator_client;
        let sum = calculator.sum(3, 10).await.map_err(|e| e.to_string())?;
        info!(sum, "Sum computed");

        let root = calculator
            .square_root(2.0)
            .await
            .map_err(|e| e.to_string())?;
        info!(root, "Square root computed");

        let factors: Vec<u64> = calculator
            .decompose_into_primes(120)
            .try_collect()
            .await
            .map_err(|e| e.to_string())?;
        info!(?factors, "Primes decomposed");

        let average = calculator
            .compute_average(vec![1, 2, 3, 4])
            .await
            .map_err(|e| e.to_string())?;
        info!(average, "Average computed");

        let mut maxima = calculator.track_running_maximum(vec![1.0, 5.0, 3.0, 6.0, 2.0, 20.0]);
        while let Some(maximum) = maxima.next().await {
            let maximum = maximum.map_err(|e| e.to_string())?;
            info!(maximum, "New maximum");
        }
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("greet");
    async {
        let greet = &system.greet_client;
        let reply = greet
            .greet(Greeting::new("Ada", "Lovelace"))
            .await
            .map_err(|e| e.to_string())?;
        info!(%reply, "Greeted");

        let mut replies = greet.greet_many_times(Greeting::new("Grace", "Hopper"));
        while let Some(reply) = replies.next().await {
            let reply = reply.map_err(|e| e.to_string())?;
            info!(%reply, "Greeted again");
        }

        let reply = greet
            .long_greet(vec![
                Greeting::new("Alan", "Turing"),
                Greeting::new("Edsger", "Dijkstra"),
            ])
            .await
            .map_err(|e| e.to_string())?;
        info!(%reply, "Long greet finished");

        let mut replies = greet.greet_everyone(vec![
            Greeting::new("Barbara", "Liskov"),
            Greeting::new("Donald", "Knuth"),
        ]);
        while let Some(reply) = replies.next().await {
            let reply = reply.map_err(|e| e.to_string())?;
            info!(%reply, "Greeted everyone");
        }

        match greet
            .clone()
            .with_timeout(Duration::from_millis(300))
            .greet_with_deadline(Greeting::new("Late", "Caller"))
            .await
        {
            Ok(reply) => warn!(%reply, "Deadline greet finished unexpectedly"),
            Err(status) => info!(error = %status, "Deadline greet timed out as expected"),
        }

        let reply = greet
            .clone()
            .with_timeout(Duration::from_secs(5))
            .greet_with_deadline(Greeting::new("Patient", "Caller"))
            .await
            .map_err(|e| e.to_string())?;
        info!(%reply, "Deadline greet finished");
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
