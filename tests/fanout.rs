//! Integration tests for the recursive fan-out handler.

use std::sync::{Arc, Mutex};

mod common;

/// The service's definition: both degenerate terms are 1.
fn expected_fib(n: u64) -> u64 {
    if n < 2 {
        1
    } else {
        expected_fib(n - 1) + expected_fib(n - 2)
    }
}

#[tokio::test]
async fn base_cases_return_one() {
    let (addr, shutdown) = common::start_service(None).await;
    let client = common::test_client();

    for i in [0, 1] {
        let res = client
            .get(format!("http://{addr}/fib?i={i}"))
            .send()
            .await
            .expect("service unreachable");
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "1");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn self_recursion_computes_fib_six() {
    let (addr, shutdown) = common::start_service(None).await;
    let client = common::test_client();

    let res = client
        .get(format!("http://{addr}/fib?i=6"))
        .send()
        .await
        .expect("service unreachable");
    assert_eq!(res.status(), 200);
    // exact body: ASCII decimal, no trailing newline
    assert_eq!(res.text().await.unwrap(), "13");

    shutdown.trigger();
}

#[tokio::test]
async fn recursion_matches_pure_definition() {
    let (addr, shutdown) = common::start_service(None).await;
    let client = common::test_client();

    for i in 0..=8u64 {
        let res = client
            .get(format!("http://{addr}/fib?i={i}"))
            .send()
            .await
            .expect("service unreachable");
        assert_eq!(res.status(), 200);
        assert_eq!(
            res.text().await.unwrap(),
            expected_fib(i).to_string(),
            "mismatch at i={i}"
        );
    }

    shutdown.trigger();
}

#[tokio::test]
async fn internal_endpoint_behaves_identically() {
    let (addr, shutdown) = common::start_service(None).await;
    let client = common::test_client();

    let res = client
        .get(format!("http://{addr}/fibinternal?i=5"))
        .send()
        .await
        .expect("service unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "8");

    shutdown.trigger();
}

#[tokio::test]
async fn malformed_input_yields_503_echoing_raw_value() {
    let (addr, shutdown) = common::start_service(None).await;
    let client = common::test_client();

    // non-numeric
    let res = client
        .get(format!("http://{addr}/fib?i=foo"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    let body = res.text().await.unwrap();
    assert!(body.contains("foo"), "body should echo the raw value: {body}");

    // absent
    let res = client.get(format!("http://{addr}/fib")).send().await.unwrap();
    assert_eq!(res.status(), 503);

    // duplicated
    let res = client
        .get(format!("http://{addr}/fib?i=3&i=4"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    let body = res.text().await.unwrap();
    assert!(body.contains("3,4"), "body should echo both raw values: {body}");

    // negative
    let res = client
        .get(format!("http://{addr}/fib?i=-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    shutdown.trigger();
}

#[tokio::test]
async fn single_subcall_failure_reports_one_line() {
    // upstream answers i=4 correctly but garbles i=5
    let upstream = common::start_mock_upstream(|request| async move {
        let target = common::request_target(&request).to_string();
        match common::index_of(&target) {
            Some(5) => (200, "not-a-number".to_string()),
            Some(4) => (200, "5".to_string()),
            _ => (404, "unexpected index".to_string()),
        }
    })
    .await;

    let (addr, shutdown) = common::start_service(Some(format!("http://{upstream}"))).await;
    let client = common::test_client();

    let res = client
        .get(format!("http://{addr}/fib?i=6"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    let body = res.text().await.unwrap();
    assert_eq!(body, "Failed to call child index '5'.\n");

    shutdown.trigger();
}

#[tokio::test]
async fn both_subcall_failures_report_both_lines() {
    // nothing listens on the upstream port: transport failure for both
    let unreachable = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    };

    let (addr, shutdown) = common::start_service(Some(format!("http://{unreachable}"))).await;
    let client = common::test_client();

    let res = client
        .get(format!("http://{addr}/fib?i=6"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    let body = res.text().await.unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 2, "one diagnostic line per failed sub-call: {body:?}");
    assert!(lines.contains(&"Failed to call child index '5'."));
    assert!(lines.contains(&"Failed to call child index '4'."));

    shutdown.trigger();
}

#[tokio::test]
async fn sibling_still_dispatched_when_one_fails() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_mock = seen.clone();
    let upstream = common::start_mock_upstream(move |request| {
        let seen = seen_by_mock.clone();
        async move {
            let target = common::request_target(&request).to_string();
            let index = common::index_of(&target);
            if let Some(i) = index {
                seen.lock().unwrap().push(i);
            }
            match index {
                Some(5) => (500, "boom".to_string()),
                Some(4) => (200, "5".to_string()),
                _ => (404, "unexpected index".to_string()),
            }
        }
    })
    .await;

    let (addr, shutdown) = common::start_service(Some(format!("http://{upstream}"))).await;
    let client = common::test_client();

    let res = client
        .get(format!("http://{addr}/fib?i=6"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    let mut dispatched = seen.lock().unwrap().clone();
    dispatched.sort_unstable();
    assert_eq!(dispatched, vec![4, 5], "both sub-indices must be dispatched");

    shutdown.trigger();
}

#[tokio::test]
async fn subcalls_carry_trace_context_headers() {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();
    let upstream = common::start_mock_upstream(move |request| {
        let recorded = recorded.clone();
        async move {
            recorded.lock().unwrap().push(request);
            (200, "1".to_string())
        }
    })
    .await;

    let (addr, shutdown) = common::start_service(Some(format!("http://{upstream}"))).await;
    let client = common::test_client();

    let res = client
        .get(format!("http://{addr}/fib?i=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "2");

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    for request in requests.iter() {
        let traceparent = request
            .lines()
            .find_map(|line| line.to_lowercase().strip_prefix("traceparent:").map(str::to_string))
            .unwrap_or_else(|| panic!("sub-call missing traceparent header: {request:?}"));
        let value = traceparent.trim().to_string();
        let parts: Vec<&str> = value.split('-').collect();
        assert_eq!(parts.len(), 4, "unexpected traceparent shape: {value}");
        assert_eq!(parts[0], "00");
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2].len(), 16);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn root_endpoint_returns_hint() {
    let (addr, shutdown) = common::start_service(None).await;
    let client = common::test_client();

    let res = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert!(body.contains("Your server is live!"));
    assert!(body.contains("/fib?i=6"));

    let res = client
        .get(format!("http://{addr}/favicon.ico"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}
