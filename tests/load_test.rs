//! Load testing for the load balancer.

use std::sync::atomic::Ordering;
use std::time::Instant;

use lb_proxy::config::Strategy;

mod common;

async fn run_load(strategy: Strategy) -> (usize, usize) {
    let (a, hits_a) = common::start_mock_backend("Hello from A").await;
    let (b, hits_b) = common::start_mock_backend("Hello from B").await;
    let mut config = common::test_config(&[a, b]);
    config.strategy = strategy;
    let proxy = common::start_proxy(config).await;

    let concurrency = 20;
    let requests_per_task = 50;
    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}/", proxy.addr);
        tasks.push(tokio::spawn(async move {
            let mut ok = 0;
            for _ in 0..requests_per_task {
                if let Ok(res) = client.get(&url).send().await {
                    if res.status() == 200 {
                        ok += 1;
                    }
                }
            }
            ok
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        succeeded += task.await.unwrap();
    }
    let elapsed = start.elapsed();
    println!(
        "{strategy}: {succeeded} requests in {elapsed:?} ({:.0} req/s)",
        succeeded as f64 / elapsed.as_secs_f64()
    );

    assert_eq!(succeeded, concurrency * requests_per_task);
    assert!(proxy.pool.backends().iter().all(|b| b.active_connections() == 0));
    proxy.shutdown.trigger();

    (hits_a.load(Ordering::SeqCst), hits_b.load(Ordering::SeqCst))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_round_robin_splits_load_evenly() {
    let (a, b) = run_load(Strategy::RoundRobin).await;
    assert_eq!((a, b), (500, 500));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_least_connections_serves_all_requests() {
    let (a, b) = run_load(Strategy::LeastConnections).await;
    assert_eq!(a + b, 1000);
}
