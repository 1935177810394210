//! End-to-end tests against the in-process stub cache service.

use cachebench::bench;
use cachebench::client::CacheClient;
use cachebench::config::Config;
use cachebench_test::server::TestServer;

fn client_for(server: &TestServer) -> CacheClient {
    CacheClient::new(&server.host(), server.port())
}

#[test]
fn scripted_sequence_maps_to_expected_outcomes() {
    cachebench_test::tracing::init();
    let server = TestServer::start();
    let client = client_for(&server);

    client.set("k1", "v1", 2).unwrap();
    assert!(client.get("k1").unwrap());
    assert!(client.del("k1").unwrap());
    assert!(!client.del("k1").unwrap());
}

#[test]
fn get_misses_on_an_unknown_key() {
    cachebench_test::tracing::init();
    let server = TestServer::start();
    let client = client_for(&server);

    assert!(!client.get("never-stored").unwrap());
}

#[test]
fn space_accounting_and_reset() {
    cachebench_test::tracing::init();
    let server = TestServer::start();
    let client = client_for(&server);

    assert_eq!(client.space_used().unwrap(), 0);

    client.set("abc", "defg", 4).unwrap();
    assert_eq!(client.space_used().unwrap(), 7);

    // Overwriting replaces, it does not accumulate.
    client.set("abc", "de", 2).unwrap();
    assert_eq!(client.space_used().unwrap(), 5);

    client.reset().unwrap();
    assert_eq!(client.space_used().unwrap(), 0);
}

#[test]
fn full_run_produces_a_consistent_result() {
    cachebench_test::tracing::init();
    let server = TestServer::start();
    let client = client_for(&server);

    let config = Config {
        host: server.host(),
        port: server.port(),
        num_requests: 40,
        warmup_steps: 10,
        ..Config::default()
    };

    let result = bench::run(&client, &config).unwrap();

    assert_eq!(result.num_requests, 40);
    assert!(result.space_after_warmup > 0);
    assert!(result.p95_latency_ms >= 0.0);
    assert!(result.throughput_rps > 0.0);
    let hit_rate = result.hit_rate.expect("40 requests contain GETs");
    assert!((0.0..=1.0).contains(&hit_rate));
}
