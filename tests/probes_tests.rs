//! Concrete probes against a local mock server

use network_status_checker::{
    defaults::DESKTOP_USER_AGENT,
    logging::{Logger, RunLogger},
    models::{Config, Endpoints, IpReport, StreamingStatus},
    orchestrator::ChannelSink,
    probes::{
        standard_plan, AcademicProbe, DisneyPlusProbe, FreedomProbe, GithubSpeedProbe, GoogleRegionProbe,
        IpInfoProbe, NetflixProbe, STREAMING_WAVE,
    },
    FailureKind, Orchestrator, Probe, ProbeContext, ProbeKey, ProbePayload, ProbeResult, RunContext, RunStatus,
    Session,
};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn invoke(probe: &dyn Probe, key: ProbeKey, timeout: Duration) -> ProbeResult {
    let session = Session::with_client(Client::new());
    let ctx = ProbeContext::new(key, session.lease(), CancellationToken::new());
    probe.invoke(&ctx, timeout).await
}

fn config_for(server: &MockServer) -> Config {
    Config {
        endpoints: Endpoints::with_base(&server.uri()),
        enable_color: false,
        ..Config::default()
    }
}

async fn mount_text(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, verb: &str, route: &str, status: u16) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

async fn mount_geo(server: &MockServer, ip: &str, region: &str, country: &str, code: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/geo/{}", ip)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "regionName": region,
            "country": country,
            "countryCode": code,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ip_info_single_address() {
    let server = MockServer::start().await;
    mount_text(&server, "/domestic-ip", "1.2.3.4\n").await;
    mount_text(&server, "/foreign-ip", "1.2.3.4").await;
    mount_geo(&server, "1.2.3.4", "Tokyo", "Japan", "JP").await;

    let probe = IpInfoProbe::from_config(&config_for(&server));
    let result = invoke(&probe, ProbeKey::IP_INFO, TIMEOUT).await;

    match result {
        ProbeResult::Success(ProbePayload::Ip(IpReport::Single { endpoint })) => {
            assert_eq!(endpoint.ip, "1.2.3.4");
            assert_eq!(endpoint.region, "Tokyo, Japan");
            assert_eq!(endpoint.country_code, "JP");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_ip_info_split_routing() {
    let server = MockServer::start().await;
    mount_text(&server, "/domestic-ip", "1.2.3.4").await;
    mount_text(&server, "/foreign-ip", "5.6.7.8").await;
    mount_geo(&server, "1.2.3.4", "Beijing", "China", "CN").await;
    mount_geo(&server, "5.6.7.8", "California", "United States", "US").await;

    let probe = IpInfoProbe::from_config(&config_for(&server));
    let result = invoke(&probe, ProbeKey::IP_INFO, TIMEOUT).await;

    match result {
        ProbeResult::Success(ProbePayload::Ip(IpReport::Split { domestic, foreign })) => {
            assert_eq!(domestic.country_code, "CN");
            assert_eq!(foreign.ip, "5.6.7.8");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_ip_info_restricted_country() {
    let server = MockServer::start().await;
    mount_text(&server, "/domestic-ip", "10.0.0.1").await;
    mount_text(&server, "/foreign-ip", "10.0.0.1").await;
    mount_geo(&server, "10.0.0.1", "Pyongyang", "North Korea", "kp").await;

    let probe = IpInfoProbe::from_config(&config_for(&server));
    let result = invoke(&probe, ProbeKey::IP_INFO, TIMEOUT).await;

    assert_eq!(result.restricted_country(), Some("KP"));
}

#[tokio::test]
async fn test_ip_info_failed_geo_lookup() {
    let server = MockServer::start().await;
    mount_text(&server, "/domestic-ip", "1.2.3.4").await;
    mount_text(&server, "/foreign-ip", "1.2.3.4").await;
    Mock::given(method("GET"))
        .and(path("/geo/1.2.3.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "fail", "message": "reserved range"})))
        .mount(&server)
        .await;

    let probe = IpInfoProbe::from_config(&config_for(&server));
    match invoke(&probe, ProbeKey::IP_INFO, TIMEOUT).await {
        ProbeResult::Failure(FailureKind::TransportError(detail)) => assert!(detail.contains("reserved range")),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_freedom_counts_reachable_sites() {
    let server = MockServer::start().await;
    mount_status(&server, "GET", "/freedom/1", 204).await;
    mount_status(&server, "GET", "/freedom/2", 200).await;
    Mock::given(method("GET"))
        .and(path("/freedom/3"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let probe = FreedomProbe::new(Endpoints::with_base(&server.uri()).freedom_urls);
    match invoke(&probe, ProbeKey::NETWORK_STATUS, TIMEOUT).await {
        ProbeResult::Success(ProbePayload::Freedom(report)) => {
            assert_eq!((report.reachable, report.total), (2, 3));
            assert!(report.is_free());
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_freedom_slow_sites_count_as_blocked() {
    let server = MockServer::start().await;
    for route in ["/freedom/1", "/freedom/2", "/freedom/3"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
    }

    let probe = FreedomProbe::new(Endpoints::with_base(&server.uri()).freedom_urls)
        .with_request_timeout(Duration::from_millis(50));
    match invoke(&probe, ProbeKey::NETWORK_STATUS, TIMEOUT).await {
        ProbeResult::Success(ProbePayload::Freedom(report)) => assert!(!report.is_free()),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_google_region_from_homepage() {
    let server = MockServer::start().await;
    mount_text(
        &server,
        "/google",
        r#"<html><a href="https://www.google.com.hk/setprefdomain?prefdom=US&amp;sig=abc">Google.com</a></html>"#,
    )
    .await;

    let probe = GoogleRegionProbe::new(format!("{}/google", server.uri()));
    assert_eq!(invoke(&probe, ProbeKey::GOOGLE_REGION, TIMEOUT).await, ProbeResult::text("CN"));
}

#[tokio::test]
async fn test_google_region_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/google"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let probe = GoogleRegionProbe::new(format!("{}/google", server.uri()));
    let result = invoke(&probe, ProbeKey::GOOGLE_REGION, Duration::from_millis(100)).await;
    assert_eq!(result, ProbeResult::Failure(FailureKind::Timeout));
}

#[tokio::test]
async fn test_github_speed_measures_head_request() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/github"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let probe = GithubSpeedProbe::new(format!("{}/github", server.uri()));
    match invoke(&probe, ProbeKey::GITHUB_SPEED, TIMEOUT).await {
        ProbeResult::Success(ProbePayload::Latency { millis }) => assert!(millis >= 0.0),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_academic_login_sends_browser_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/academic"))
        .and(header("user-agent", DESKTOP_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"({"IsSuccess":true,"ShowName":"Example University"})"#))
        .expect(1)
        .mount(&server)
        .await;

    let probe = AcademicProbe::new(format!("{}/academic", server.uri()));
    assert_eq!(
        invoke(&probe, ProbeKey::ACADEMIC_NAME, TIMEOUT).await,
        ProbeResult::text("Example University")
    );
}

#[tokio::test]
async fn test_academic_not_logged_in_is_empty() {
    let server = MockServer::start().await;
    mount_text(&server, "/academic", r#"({"IsSuccess":false})"#).await;

    let probe = AcademicProbe::new(format!("{}/academic", server.uri()));
    assert_eq!(
        invoke(&probe, ProbeKey::ACADEMIC_NAME, TIMEOUT).await,
        ProbeResult::Success(ProbePayload::Empty)
    );
}

fn streaming_status(result: ProbeResult) -> StreamingStatus {
    match result {
        ProbeResult::Success(ProbePayload::Streaming(report)) => report.status,
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_netflix_catalogue_levels() {
    let server = MockServer::start().await;
    mount_status(&server, "GET", "/netflix/title", 404).await;
    mount_status(&server, "GET", "/netflix/original", 200).await;
    let probe = NetflixProbe::new(&Endpoints::with_base(&server.uri()));
    assert_eq!(
        streaming_status(invoke(&probe, ProbeKey::NETFLIX, TIMEOUT).await),
        StreamingStatus::OriginalsOnly
    );

    let server = MockServer::start().await;
    mount_status(&server, "GET", "/netflix/title", 200).await;
    Mock::given(method("GET"))
        .and(path("/netflix/original"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let probe = NetflixProbe::new(&Endpoints::with_base(&server.uri()));
    assert_eq!(streaming_status(invoke(&probe, ProbeKey::NETFLIX, TIMEOUT).await), StreamingStatus::Unlocked);

    let server = MockServer::start().await;
    mount_status(&server, "GET", "/netflix/title", 403).await;
    mount_status(&server, "GET", "/netflix/original", 403).await;
    let probe = NetflixProbe::new(&Endpoints::with_base(&server.uri()));
    assert_eq!(streaming_status(invoke(&probe, ProbeKey::NETFLIX, TIMEOUT).await), StreamingStatus::Blocked);
}

#[tokio::test]
async fn test_disney_plus_region_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/disney"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", format!("{}/unavailable", server.uri())))
        .mount(&server)
        .await;
    mount_status(&server, "GET", "/unavailable", 200).await;

    let probe = DisneyPlusProbe::new(format!("{}/disney", server.uri()));
    assert_eq!(streaming_status(invoke(&probe, ProbeKey::DISNEY_PLUS, TIMEOUT).await), StreamingStatus::Blocked);
}

#[tokio::test]
async fn test_disney_plus_server_error_is_a_failure() {
    let server = MockServer::start().await;
    mount_status(&server, "GET", "/disney", 500).await;

    let probe = DisneyPlusProbe::new(format!("{}/disney", server.uri()));
    assert!(matches!(
        invoke(&probe, ProbeKey::DISNEY_PLUS, TIMEOUT).await,
        ProbeResult::Failure(FailureKind::TransportError(_))
    ));
}

fn quiet_orchestrator() -> Orchestrator {
    let (logger, _) = Logger::capturing("RUN".to_string());
    Orchestrator::new(RunLogger::from_logger(logger))
}

async fn drain(mut receiver: tokio::sync::mpsc::Receiver<(ProbeKey, ProbeResult)>) -> Vec<(ProbeKey, ProbeResult)> {
    let mut received = Vec::new();
    while let Ok((key, result)) = receiver.try_recv() {
        received.push((key, result));
    }
    received
}

#[tokio::test]
async fn test_standard_plan_end_to_end() {
    let server = MockServer::start().await;
    mount_text(&server, "/domestic-ip", "1.2.3.4").await;
    mount_text(&server, "/foreign-ip", "5.6.7.8").await;
    mount_geo(&server, "1.2.3.4", "Beijing", "China", "CN").await;
    mount_geo(&server, "5.6.7.8", "Tokyo", "Japan", "JP").await;
    for route in ["/freedom/1", "/freedom/2", "/freedom/3"] {
        mount_status(&server, "GET", route, 204).await;
    }
    mount_text(&server, "/google", "<html>no switch link</html>").await;
    mount_status(&server, "HEAD", "/github", 200).await;
    mount_text(&server, "/academic", r#"({"IsSuccess":false})"#).await;
    mount_status(&server, "GET", "/netflix/title", 404).await;
    mount_status(&server, "GET", "/netflix/original", 404).await;
    mount_status(&server, "GET", "/disney", 200).await;

    let config = config_for(&server);
    let plan = standard_plan(&config).unwrap();
    let (sink, receiver) = ChannelSink::new(32);
    let outcome = quiet_orchestrator()
        .run(&plan, &sink, &RunContext::from_config(&config))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.len(), 7);
    assert!(outcome.wave_fired(STREAMING_WAVE));
    assert_eq!(outcome.get(&ProbeKey::GOOGLE_REGION), Some(&ProbeResult::text("Global")));
    assert_eq!(streaming_status(outcome.get(&ProbeKey::NETFLIX).cloned().unwrap()), StreamingStatus::Blocked);
    assert_eq!(
        streaming_status(outcome.get(&ProbeKey::DISNEY_PLUS).cloned().unwrap()),
        StreamingStatus::Available
    );

    let received = drain(receiver).await;
    assert_eq!(received.len(), 7);
    assert_eq!(received[0].0, ProbeKey::IP_INFO);
    let network_at = received.iter().position(|(k, _)| *k == ProbeKey::NETWORK_STATUS).unwrap();
    let netflix_at = received.iter().position(|(k, _)| *k == ProbeKey::NETFLIX).unwrap();
    assert!(network_at < netflix_at);
}

#[tokio::test]
async fn test_standard_plan_stops_in_restricted_region() {
    let server = MockServer::start().await;
    mount_text(&server, "/domestic-ip", "10.0.0.1").await;
    mount_text(&server, "/foreign-ip", "10.0.0.1").await;
    mount_geo(&server, "10.0.0.1", "Havana", "Cuba", "CU").await;
    for route in ["/freedom/1", "/freedom/2", "/freedom/3", "/google", "/academic", "/netflix/title", "/disney"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let config = config_for(&server);
    let plan = standard_plan(&config).unwrap();
    let (sink, receiver) = ChannelSink::new(32);
    let outcome = quiet_orchestrator()
        .run(&plan, &sink, &RunContext::from_config(&config))
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Restricted);
    let received = drain(receiver).await;
    assert_eq!(received.len(), 5);
    assert_eq!(received[0].1.restricted_country(), Some("CU"));
    assert!(received[1..]
        .iter()
        .all(|(_, result)| *result == ProbeResult::Failure(FailureKind::Terminated)));
}
