//! End-to-end tests over a real listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use concierge_core::RequestContext;
use concierge_server::lifecycle::{Coordinator, ServiceRegistry};
use concierge_server::network::{NetworkConfig, NetworkModule, ServerState, ShutdownController};
use concierge_server::storage::SqliteGuestStore;
use concierge_server::GuestStore;

type RunHandle = JoinHandle<anyhow::Result<()>>;

async fn start_server(
    store: Option<Arc<dyn GuestStore>>,
) -> (SocketAddr, Arc<ShutdownController>, RunHandle) {
    let mut module = NetworkModule::new(NetworkConfig::ephemeral(), store);
    let port = module.start().await.unwrap();
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();

    let coordinator = Coordinator::new(module, ServiceRegistry::new(), Duration::from_secs(5));
    let controller = coordinator.shutdown_controller();
    let handle = tokio::spawn(coordinator.run());

    while controller.state() != ServerState::Listening {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    (addr, controller, handle)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn stop_server(controller: &ShutdownController, handle: RunHandle) {
    controller.trigger_shutdown();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn greets_named_visitor_on_both_routes() {
    let (addr, controller, handle) = start_server(None).await;
    let client = client();

    let res = client
        .get(format!("http://{addr}/?name=Ada"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(&res.bytes().await.unwrap()[..], b"Hello, Ada\n");

    let res = client
        .get(format!("http://{addr}/hi?name=Grace"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(&res.bytes().await.unwrap()[..], b"Hello, Grace\n");

    stop_server(&controller, handle).await;
}

#[tokio::test]
async fn greets_guest_when_name_is_absent_or_empty() {
    let (addr, controller, handle) = start_server(None).await;
    let client = client();

    let res = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(&res.bytes().await.unwrap()[..], b"Hello, Guest\n");

    let res = client
        .get(format!("http://{addr}/hi?name="))
        .send()
        .await
        .unwrap();
    assert_eq!(&res.bytes().await.unwrap()[..], b"Hello, Guest\n");

    stop_server(&controller, handle).await;
}

#[tokio::test]
async fn passes_names_through_verbatim() {
    let (addr, controller, handle) = start_server(None).await;
    let client = client();

    let res = client
        .get(format!("http://{addr}/hi"))
        .query(&[("name", "Ada Lovelace")])
        .send()
        .await
        .unwrap();
    assert_eq!(&res.bytes().await.unwrap()[..], b"Hello, Ada Lovelace\n");

    let res = client
        .get(format!("http://{addr}/hi"))
        .query(&[("name", "<b>Ada</b>")])
        .send()
        .await
        .unwrap();
    assert_eq!(&res.bytes().await.unwrap()[..], b"Hello, <b>Ada</b>\n");

    stop_server(&controller, handle).await;
}

#[tokio::test]
async fn unknown_routes_get_an_empty_404() {
    let (addr, controller, handle) = start_server(None).await;
    let client = client();

    let res = client
        .get(format!("http://{addr}/goodbye"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.bytes().await.unwrap().is_empty());

    stop_server(&controller, handle).await;
}

#[tokio::test]
async fn responses_carry_distinct_request_ids() {
    let (addr, controller, handle) = start_server(None).await;
    let client = client();

    let first = client.get(format!("http://{addr}/")).send().await.unwrap();
    let second = client.get(format!("http://{addr}/")).send().await.unwrap();

    let first_id = first.headers().get("x-request-id").cloned().unwrap();
    let second_id = second.headers().get("x-request-id").cloned().unwrap();
    assert_ne!(first_id, second_id);

    stop_server(&controller, handle).await;
}

#[tokio::test]
async fn repeated_visits_keep_one_live_record() {
    let store = SqliteGuestStore::in_memory().await.unwrap();
    store.initialize().await.unwrap();
    let store: Arc<SqliteGuestStore> = Arc::new(store);

    let (addr, controller, handle) = start_server(Some(store.clone())).await;
    let client = client();

    for _ in 0..3 {
        let res = client
            .get(format!("http://{addr}/hi?name=Ada"))
            .send()
            .await
            .unwrap();
        assert_eq!(&res.bytes().await.unwrap()[..], b"Hello, Ada\n");
    }

    let ctx = RequestContext::new();
    assert_eq!(store.live_count(&ctx, "Ada").await.unwrap(), 1);

    stop_server(&controller, handle).await;
}

#[tokio::test]
async fn graceful_stop_closes_the_port() {
    let (addr, controller, handle) = start_server(None).await;
    let client = client();

    let res = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    stop_server(&controller, handle).await;
    assert_eq!(controller.state(), ServerState::Stopped);
    assert!(TcpStream::connect(addr).await.is_err());
}
