use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use test_log::test;
use tokio::net::TcpListener;

use libcasedesk::page::{Control, Multiselect, OptionRecord, Page, SelectControl};
use libcasedesk::populator::{FetchError, HttpItemSource, ItemSource};
use libcasedesk::{CasedeskConfig, Message, View};

const SELECTION_7: &str = r#"{
    "objects": {
        "selected": [
            {"id": 4, "name": "Second login", "product_id": 7, "order": 0,
             "created_by": {"username": "camd"}, "tags": []}
        ],
        "unselected": [
            {"id": 2, "name": "Logout", "product": {"id": 7},
             "created_by": {"username": "rdalal"}, "tags": [{"name": "smoke"}]},
            {"id": 3, "name": "Profile <edit>", "product_id": 7, "tags": []}
        ]
    },
    "meta": {"limit": 0}
}"#;

type Seen = Arc<Mutex<Vec<String>>>;

async fn handle(
    seen: Seen,
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let uri = req.uri().to_string();
    seen.lock().unwrap().push(uri.clone());
    let (status, body) = match uri.as_str() {
        "/api/v1/caseselection/?productversion__product=7" => (StatusCode::OK, SELECTION_7),
        "/api/v1/caseselection/?productversion__product=8" => (StatusCode::OK, "{\"objects\": "),
        _ => (StatusCode::NOT_FOUND, "{}"),
    };
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap())
}

/// Serves the selection endpoint on a free port. Returns the base url and the
/// request log.
async fn start_server() -> (String, Seen) {
    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::default();
    let log = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let io = TokioIo::new(stream);
            let seen = seen.clone();
            tokio::task::spawn(async move {
                let service = service_fn(move |req| handle(seen.clone(), req));
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    eprintln!("server error: {e}");
                }
            });
        }
    });
    (format!("http://{addr}"), log)
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn fetches_and_parses_selection() {
    let (base, seen) = start_server().await;
    let source = HttpItemSource::new(Some(base));

    let response = source
        .fetch("/api/v1/caseselection/?productversion__product=7".to_string())
        .await
        .unwrap();
    assert_eq!(response.objects.selected.len(), 1);
    assert_eq!(response.objects.selected[0].order(), Some(0));
    assert_eq!(response.objects.unselected[0].product_id().as_deref(), Some("7"));
    assert_eq!(response.objects.unselected[0].tag_names(), vec!["smoke"]);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn error_status_is_reported() {
    let (base, _) = start_server().await;
    let source = HttpItemSource::new(Some(base));
    let err = source
        .fetch("/api/v1/caseselection/?productversion__product=1".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::UnexpectedStatus(StatusCode::NOT_FOUND)));
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn truncated_body_is_a_parse_error() {
    let (base, _) = start_server().await;
    let source = HttpItemSource::new(Some(base));
    let err = source
        .fetch("/api/v1/caseselection/?productversion__product=8".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn view_from_config_renders_server_items_once() {
    let (base, seen) = start_server().await;
    let mut config = CasedeskConfig::defaults().unwrap();
    config.http.base_url = Some(base);

    let mut products = SelectControl::new(vec![
        OptionRecord::new("", "---"),
        OptionRecord::new("7", "Firefox").with_data("product-id", "7"),
        OptionRecord::new("9", "Thunderbird").with_data("product-id", "9"),
    ]);
    products.select_value("7");
    let page = Page::new()
        .with_control("id_product", Control::Select(products))
        .with_multiselect(Multiselect::default());

    let mut view = View::from_config(page, &config).unwrap();
    view.update(Message::PageLoaded);
    assert!(view.wait_for_fetches(Duration::from_secs(10)));

    let multiselect = view.page.multiselect.clone().unwrap();
    let names: Vec<_> = multiselect
        .unselected
        .rows()
        .iter()
        .map(|r| r.label.as_str())
        .collect();
    assert_eq!(names, vec!["Logout", "Profile <edit>"]);
    assert!(
        multiselect
            .unselected
            .content
            .markup()
            .contains("Profile &lt;edit&gt;")
    );
    assert_eq!(multiselect.selected.rows()[0].label, "Second login");

    view.update(Message::SelectOption {
        field: "id_product".to_string(),
        value: "9".to_string(),
    });
    assert!(view.wait_for_fetches(Duration::from_secs(10)));
    view.update(Message::SelectOption {
        field: "id_product".to_string(),
        value: "7".to_string(),
    });
    assert_eq!(view.outstanding_fetches(), 0);
    assert_eq!(view.page.multiselect.unwrap(), multiselect);
    assert_eq!(
        seen.lock().unwrap().clone(),
        vec![
            "/api/v1/caseselection/?productversion__product=7",
            "/api/v1/caseselection/?productversion__product=9",
        ]
    );
}
