use crate::rate_limiter::ApiRateLimiter;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn concurrent_acquires_respect_aggregate_ceiling() {
    // 15 slots at 5/s: the first burst is free, the remaining 10 take ~2s.
    let limiter = Arc::new(ApiRateLimiter::with_cooldown(5, Duration::from_secs(300)));
    let start = Instant::now();

    let waiters = (0..15).map(|_| {
        let limiter = limiter.clone();
        async move { limiter.acquire().await }
    });
    join_all(waiters).await;

    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(1700),
        "15 acquires at 5/s finished too fast: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(10),
        "15 acquires at 5/s took too long: {elapsed:?}"
    );
}

#[tokio::test]
async fn burst_rejection_parks_all_callers() {
    let limiter = ApiRateLimiter::with_cooldown(100, Duration::from_millis(400));
    limiter.acquire().await;

    limiter.report_burst_rejected().await;
    let start = Instant::now();
    limiter.acquire().await;

    assert!(
        start.elapsed() >= Duration::from_millis(350),
        "acquire did not wait out the cooldown: {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn rejection_parks_callers_already_queued_for_slots() {
    // 5/s with the burst drained: the queued waiters would naturally be
    // granted at ~200ms intervals, well inside the cooldown window.
    let limiter = Arc::new(ApiRateLimiter::with_cooldown(5, Duration::from_millis(600)));
    for _ in 0..5 {
        limiter.acquire().await;
    }

    let start = Instant::now();
    let waiters: Vec<_> = (0..2)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.acquire().await;
                start.elapsed()
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(50)).await;
    limiter.report_burst_rejected().await;

    for waiter in waiters {
        let granted_after = waiter.await.unwrap();
        assert!(
            granted_after >= Duration::from_millis(600),
            "queued waiter got a slot during the cooldown: {granted_after:?}"
        );
    }
}

#[tokio::test]
async fn cooldown_expires_and_slots_flow_again() {
    let limiter = ApiRateLimiter::with_cooldown(100, Duration::from_millis(100));
    limiter.report_burst_rejected().await;
    limiter.acquire().await;

    // After the cooldown the limiter is back to normal throughput.
    let start = Instant::now();
    limiter.acquire().await;
    assert!(start.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn repeated_rejections_keep_the_later_deadline() {
    let limiter = ApiRateLimiter::with_cooldown(100, Duration::from_millis(300));
    limiter.report_burst_rejected().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    limiter.report_burst_rejected().await;

    let start = Instant::now();
    limiter.acquire().await;
    assert!(
        start.elapsed() >= Duration::from_millis(250),
        "second rejection should extend the cooldown"
    );
}
