//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use ops_gate::config::GateConfig;
use ops_gate::http::HttpServer;
use ops_gate::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a mock upstream that answers every request with `response` and
/// echoes the request target in `x-upstream-target`.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        loop {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    buf.extend_from_slice(&chunk[..n]);
                                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                        break;
                                    }
                                }
                            }
                        }

                        let head = String::from_utf8_lossy(&buf);
                        let target = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\
                             x-upstream-target: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            target,
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a mock upstream that reads the whole request, chunked body included,
/// before answering 200. A client that aborts mid-body gets nothing back.
pub async fn start_draining_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            buf.extend_from_slice(&chunk[..n]);
                            if buf.ends_with(b"0\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Send `request` verbatim over a fresh connection and return the raw reply.
pub async fn raw_request(addr: SocketAddr, request: &[u8]) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request).await.unwrap();

    let mut reply = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), socket.read_to_end(&mut reply)).await;
    String::from_utf8_lossy(&reply).into_owned()
}

/// Start the gate on `config.listener.bind_address`.
pub async fn start_gate(config: GateConfig) -> Shutdown {
    let shutdown = Shutdown::new();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
