//! Integration tests for the dispatch core against real sockets.
//!
//! The connect-timeout scenario uses the backlog-saturation technique: a
//! listener with a backlog of one whose queue is pre-filled, so subsequent
//! connection attempts sit in SYN_SENT until the client's deadline fires.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use courier::{CallState, Category, HttpClient, RequestSpec, Routes};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio_test::assert_ok;

const JSON_ORDER: &str = "{\"flavor\":\"pistachio\"}";

#[derive(serde::Deserialize)]
struct Order {
    flavor: String,
}

fn init_logs() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .ok();
    });
}

fn order_response() -> String {
    format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        JSON_ORDER.len(),
        JSON_ORDER
    )
}

async fn read_request_head(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return;
        }
    }
}

/// Listener that answers every connection with the canned order, counting
/// accepted connections.
async fn spawn_order_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                read_request_head(&mut stream).await;
                stream.write_all(order_response().as_bytes()).await.ok();
                stream.shutdown().await.ok();
            });
        }
    });
    (addr, accepted)
}

/// Listener that accepts and then stays silent, holding the connection open.
async fn spawn_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            tokio::spawn(async move {
                read_request_head(&mut stream).await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    addr
}

/// A port with a backlog of one whose accept queue is already full. Returns
/// the saturating sockets so they stay open for the caller's lifetime.
async fn saturated_backlog() -> (SocketAddr, Vec<TcpStream>, TcpListener) {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(1).unwrap();
    let addr = listener.local_addr().unwrap();

    // Never accept; fill the queue until connects stop completing.
    let mut fillers = Vec::new();
    for _ in 0..8 {
        match tokio::time::timeout(Duration::from_millis(100), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => fillers.push(stream),
            _ => break,
        }
    }
    (addr, fillers, listener)
}

fn client_for(addr: SocketAddr) -> HttpClient {
    HttpClient::builder(format!("http://{addr}"))
        .connect_timeout(Duration::from_millis(300))
        .read_timeout(Duration::from_millis(200))
        .routes(Routes::new().route("find_order", || RequestSpec::get("/icecream/orders/1")))
        .build()
        .unwrap()
}

#[tokio::test]
async fn saturated_backlog_fails_with_connect_timeout() {
    init_logs();
    let (addr, _fillers, _listener) = saturated_backlog().await;
    let client = client_for(addr);

    let started = Instant::now();
    let err = (&client.get("/icecream/orders/1")).await.unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.category(), Category::ConnectTimeout);
    assert!(
        elapsed >= Duration::from_millis(250) && elapsed < Duration::from_secs(2),
        "connect timeout fired after {elapsed:?}"
    );
}

#[tokio::test]
async fn silent_server_fails_with_read_timeout_after_connect_succeeds() {
    init_logs();
    let addr = spawn_silent_server().await;
    let client = client_for(addr);

    let call = client.get("/icecream/orders/1");
    let in_flight = call.subscribe();
    let mut states = in_flight.watch_state();

    let started = Instant::now();
    let err = in_flight.join().await.unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.category(), Category::ReadTimeout);
    assert!(
        elapsed >= Duration::from_millis(150) && elapsed < Duration::from_secs(2),
        "read timeout fired after {elapsed:?}"
    );
    // The connect phase succeeded: the attempt got past Connecting.
    let mut reached_awaiting = false;
    loop {
        if *states.borrow_and_update() == CallState::AwaitingResponse {
            reached_awaiting = true;
        }
        if states.changed().await.is_err() {
            break;
        }
    }
    assert!(*states.borrow() == CallState::Failed || reached_awaiting);
}

#[tokio::test]
async fn healthy_server_completes_with_the_decoded_order() {
    init_logs();
    let (addr, _accepted) = spawn_order_server().await;
    let client = client_for(addr);

    let result = client.invoke("find_order").unwrap().subscribe().join().await;
    let resp = tokio_test::assert_ok!(result);
    assert_eq!(resp.status().as_u16(), 200);
    let order: Order = resp.json().unwrap();
    assert_eq!(order.flavor, "pistachio");
}

#[tokio::test]
async fn resubscription_replays_cold_with_a_fresh_connection() {
    let (addr, accepted) = spawn_order_server().await;
    let client = client_for(addr);
    let call = client.get("/icecream/orders/1");

    // Dispatching alone must not touch the network.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 0);

    call.subscribe().join().await.unwrap();
    call.subscribe().join().await.unwrap();
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancelling_a_silent_call_terminates_as_cancelled() {
    let addr = spawn_silent_server().await;
    let client = HttpClient::builder(format!("http://{addr}"))
        .connect_timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let call = client.get("/slow");
    let in_flight = call.subscribe();
    let handle = in_flight.cancel_handle();

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();
    let err = in_flight.join().await.unwrap_err();
    assert_eq!(err.category(), Category::Cancelled);

    // Idempotence: cancelling a terminal call is a no-op.
    handle.cancel();
}

#[test]
fn blocking_bridge_returns_the_value_on_the_calling_thread() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (addr, _accepted) = rt.block_on(spawn_order_server());
    // Keep the server runtime alive on its own thread while we block here.
    let _guard = std::thread::spawn(move || rt.block_on(std::future::pending::<()>()));

    let client = client_for(addr);
    let resp = client.get("/icecream/orders/1").block().unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[test]
fn blocking_bridge_reraises_the_client_error() {
    // Grab a port that is then closed again: connection refused.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_for(addr);
    let err = client.get("/icecream/orders/1").block().unwrap_err();
    assert_eq!(err.category(), Category::ConnectFailure);
}

#[test]
fn blocking_bridge_honors_its_wait_bound() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let addr = rt.block_on(spawn_silent_server());
    let _guard = std::thread::spawn(move || rt.block_on(std::future::pending::<()>()));

    // No read timeout configured: only the bridge bound terminates the wait.
    let client = HttpClient::builder(format!("http://{addr}")).build().unwrap();
    let started = Instant::now();
    let err = client
        .get("/slow")
        .block_with_timeout(Duration::from_millis(200))
        .unwrap_err();
    assert_eq!(err.category(), Category::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(2));
}
