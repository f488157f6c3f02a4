use std::time::Duration;

use weir::injectable;
use weir_base::{CancellationToken, Daemons};
use weir_http::{App, Body, HttpServer, HttpServerConfig, PathParams, Route};

#[injectable]
fn hello(path_params: PathParams) -> String {
    format!("Hello, {}", path_params.get("name").unwrap_or("stranger"))
}

#[injectable]
fn upload(body: Body) -> (u16, String) {
    (201, format!("{} bytes", body.0.len()))
}

fn config(body_limit: usize) -> HttpServerConfig {
    HttpServerConfig {
        addr: "127.0.0.1:0".parse().unwrap(),
        body_limit,
    }
}

#[tokio::test]
async fn test_http_server() {
    let app = App::builder()
        .add_route(Route::get("/hello/{name}", hello))
        .add_route(Route::post("/upload", upload))
        .build()
        .unwrap();
    let server = HttpServer::bind(app, &config(16)).await.unwrap();
    let base_url = format!("http://{}", server.local_addr());

    let shutdown = CancellationToken::new();
    let daemons = Daemons::new().with(server);
    let shutdown_clone = shutdown.clone();
    let server_task = tokio::spawn(async move { daemons.run(shutdown_clone).await });

    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base_url}/hello/Ann"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    let body = response.text().await.expect("Failed to read response body");
    assert_eq!(body, "Hello, Ann");

    let response = client
        .get(format!("{base_url}/unknown"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);

    let response = client
        .delete(format!("{base_url}/hello/Ann"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 405);
    assert_eq!(response.headers()["allow"], "GET");

    let response = client
        .post(format!("{base_url}/upload"))
        .body("0123456789")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    assert_eq!(response.text().await.unwrap(), "10 bytes");

    let response = client
        .post(format!("{base_url}/upload"))
        .body("0123456789abcdefghij")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 413);

    shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("Server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[test]
fn test_http_server_config() {
    let config: HttpServerConfig =
        serde_json::from_value(serde_json::json!({"addr": "127.0.0.1:8080"})).unwrap();
    assert_eq!(config.addr.port(), 8080);
    assert_eq!(config.body_limit, 2 * 1024 * 1024);
}
