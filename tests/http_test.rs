use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::extract::{Form, State};
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::Router;
use tower::ServiceExt;

use air_node::config::{ClimateModel, InvalidSlotPolicy, SensorsConfig, TelemetryConfig};
use air_node::error::{NodeError, Result};
use air_node::hal::HardwareProvider;
use air_node::orchestrator::RequestOrchestrator;
use air_node::page::{PageRenderer, FALLBACK_BODY};
use air_node::publisher::RemotePublisher;
use air_node::server;
use air_node::snapshot::SensorSet;

const TEMPLATE: &str =
    "<ul><li>{{ temp }}</li><li>{{ hum }}</li><li>{{ mq9_voltage }}</li><li>{{ mq135_voltage }}</li></ul>";

/// adc samples: 23831 reads ~1.2 V at 3.3 V full scale, 26214 reads 2.0 V at 5 V
struct Bench {
    climate: Option<(f64, f64)>,
    adc: [Option<u16>; 2],
}

impl Bench {
    fn healthy() -> Self {
        Self { climate: Some((24.5, 60.0)), adc: [Some(23831), Some(26214)] }
    }
}

impl HardwareProvider for Bench {
    fn read_climate(&self, _model: ClimateModel, pin: u8) -> Result<(f64, f64)> {
        self.climate
            .ok_or_else(|| NodeError::hardware(format!("dht11-gpio{}", pin), "timeout"))
    }

    fn read_adc(&self, channel: u8, _vref: f64) -> Result<u16> {
        self.adc[channel as usize].ok_or_else(|| NodeError::hardware("adc", "bus error"))
    }

    fn scan_i2c(&self) -> Result<Vec<u8>> {
        Ok(vec![])
    }

    fn draw_lines(&self, _addr: u8, _width: u32, _height: u32, _lines: &[String]) -> Result<()> {
        Ok(())
    }
}

type Received = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// local stand-in for the remote collector
async fn spawn_collector(status: StatusCode) -> (String, Received) {
    async fn update(
        State((received, status)): State<(Received, StatusCode)>,
        Form(fields): Form<HashMap<String, String>>,
    ) -> StatusCode {
        received.lock().unwrap().push(fields);
        status
    }

    let received: Received = Arc::default();
    let app = Router::new()
        .route("/update", post(update))
        .with_state((received.clone(), status));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/update", addr), received)
}

fn template_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("air-node-http-{}-{}.html", name, std::process::id()));
    std::fs::write(&path, TEMPLATE).unwrap();
    path
}

fn app(bench: Bench, collector_url: &str, template: PathBuf) -> Router {
    let telemetry = TelemetryConfig {
        url: collector_url.to_string(),
        api_key: "TESTKEY".to_string(),
        invalid_slots: InvalidSlotPolicy::Zero,
        ..TelemetryConfig::default()
    };
    let orchestrator = RequestOrchestrator::new(
        Arc::new(bench),
        SensorSet::new(&SensorsConfig::default()),
        RemotePublisher::new(&telemetry).unwrap(),
        PageRenderer::new(template),
    );
    server::router(Arc::new(orchestrator))
}

async fn get_index(router: Router) -> (StatusCode, String, String) {
    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_healthy_request_renders_and_publishes() {
    let (url, received) = spawn_collector(StatusCode::OK).await;
    let template = template_file("healthy");

    let (status, content_type, body) = get_index(app(Bench::healthy(), &url, template.clone())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/html");
    assert_eq!(
        body,
        "<ul><li>24.5</li><li>60</li><li>1.200004577706569</li><li>2.0</li></ul>"
    );
    assert!(!body.contains("Sensor Error"));

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let fields = &received[0];
    assert_eq!(fields["api_key"], "TESTKEY");
    assert_eq!(fields["field1"], "24.5");
    assert_eq!(fields["field2"], "60");
    assert_eq!(fields["field3"], "1.200004577706569");
    assert_eq!(fields["field4"], "2.0");

    std::fs::remove_file(template).ok();
}

#[tokio::test]
async fn test_publish_failure_does_not_change_response() {
    let (ok_url, _) = spawn_collector(StatusCode::OK).await;
    let (err_url, rejected) = spawn_collector(StatusCode::INTERNAL_SERVER_ERROR).await;
    let template = template_file("publish-failure");

    let baseline = get_index(app(Bench::healthy(), &ok_url, template.clone())).await;
    let rejected_by_collector = get_index(app(Bench::healthy(), &err_url, template.clone())).await;
    let unreachable = get_index(app(Bench::healthy(), "http://127.0.0.1:1/update", template.clone())).await;

    assert_eq!(rejected.lock().unwrap().len(), 1);
    assert_eq!(baseline, rejected_by_collector);
    assert_eq!(baseline, unreachable);

    std::fs::remove_file(template).ok();
}

#[tokio::test]
async fn test_dht_failure_marks_only_climate_fields() {
    let (url, received) = spawn_collector(StatusCode::OK).await;
    let template = template_file("dht-failure");
    let bench = Bench { climate: None, ..Bench::healthy() };

    let (status, _, body) = get_index(app(bench, &url, template.clone())).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("<ul><li>Sensor Error</li><li>Sensor Error</li><li>1.2"));
    assert_eq!(body.matches("Sensor Error").count(), 2);

    let received = received.lock().unwrap();
    assert_eq!(received[0]["field1"], "0");
    assert_eq!(received[0]["field2"], "0");

    std::fs::remove_file(template).ok();
}

#[tokio::test]
async fn test_zero_voltage_shown_as_error() {
    let (url, _) = spawn_collector(StatusCode::OK).await;
    let template = template_file("zero");
    let bench = Bench { adc: [Some(0), None], ..Bench::healthy() };

    let (_, _, body) = get_index(app(bench, &url, template.clone())).await;
    assert_eq!(
        body,
        "<ul><li>24.5</li><li>60</li><li>Sensor Error</li><li>Sensor Error</li></ul>"
    );

    std::fs::remove_file(template).ok();
}

#[tokio::test]
async fn test_missing_template_serves_fallback() {
    let (url, _) = spawn_collector(StatusCode::OK).await;

    for bench in [Bench::healthy(), Bench { climate: None, adc: [None, None] }] {
        let (status, content_type, body) =
            get_index(app(bench, &url, PathBuf::from("/nonexistent/air-node/index.html"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "text/html");
        assert_eq!(body, FALLBACK_BODY);
    }
}

#[tokio::test]
async fn test_unknown_route_is_not_served() {
    let (url, received) = spawn_collector(StatusCode::OK).await;
    let template = template_file("unknown");
    let response = app(Bench::healthy(), &url, template.clone())
        .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(received.lock().unwrap().is_empty());

    std::fs::remove_file(&template).ok();
    assert!(!template.exists());
}
