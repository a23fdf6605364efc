//! Listener bring-up against real sockets, plus a live HTTP round trip.

use records::{Created, DatabaseStatus, Health, User};
use serde_json::json;
use server::{
    app,
    config::{Config, DatabaseConfig},
    error::BindError,
    listener::{ListenerBringUp, ListenerState},
    spawn_database_bring_up,
    state::AppState,
};

fn occupy() -> (std::net::TcpListener, u16) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    (listener, port)
}

#[tokio::test]
async fn test_falls_forward_when_preferred_port_is_taken() {
    let (_held, port) = occupy();

    let mut bring_up = ListenerBringUp::new("127.0.0.1");
    let listener = bring_up.start(port, 3).await.unwrap();
    let bound = listener.local_addr().unwrap().port();

    assert!(bound > port);
    assert_eq!(bring_up.state(), ListenerState::Bound { port: bound });
    assert_eq!(
        &bring_up.transitions()[..3],
        &[
            ListenerState::Unbound,
            ListenerState::Binding { port },
            ListenerState::Retrying {
                port: port + 1,
                remaining: 2
            },
        ]
    );
}

#[tokio::test]
async fn test_binds_next_port_with_single_attempt() {
    let (_held, port) = occupy();

    // The neighbour may be in use by something else on the machine.
    if std::net::TcpListener::bind(("127.0.0.1", port + 1)).is_err() {
        return;
    }

    let mut bring_up = ListenerBringUp::new("127.0.0.1");
    let listener = bring_up.start(port, 1).await.unwrap();

    assert_eq!(listener.local_addr().unwrap().port(), port + 1);
}

#[tokio::test]
async fn test_fails_without_budget() {
    let (_held, port) = occupy();

    let mut bring_up = ListenerBringUp::new("127.0.0.1");
    let err = bring_up.start(port, 0).await.unwrap_err();

    assert!(matches!(err, BindError::PortsExhausted { last_port, .. } if last_port == port));
    assert_eq!(bring_up.state(), ListenerState::Failed { port });
}

#[tokio::test]
async fn test_serves_records_over_http() {
    let state = AppState::new(Config {
        port: 0,
        host: "127.0.0.1".into(),
        max_port_fallback: 0,
        database: DatabaseConfig::sqlite("sqlite::memory:"),
    });

    let mut bring_up = ListenerBringUp::new("127.0.0.1");
    let listener = bring_up.start(0, 0).await.unwrap();
    let address = listener.local_addr().unwrap();

    spawn_database_bring_up(state.clone());
    let router = app(state.clone());
    tokio::spawn(async move { axum::serve(listener, router).await });

    let client = reqwest::Client::new();
    let base = format!("http://{address}");

    state.database.ensure_pool().await.unwrap();

    let health: Health = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.database, DatabaseStatus::Up);

    let created: Created = client
        .post(format!("{base}/users"))
        .json(&json!({
            "firstname": "Grace",
            "lastname": "Hopper",
            "age": 85,
            "gender": "female",
            "interests": "compilers, navy",
            "description": "Found the first bug",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let user: User = client
        .get(format!("{base}/users/{}", created.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(user.full_name(), "Grace Hopper");
    assert_eq!(user.interest_list(), vec!["compilers", "navy"]);
    assert_eq!(state.database.connect_attempts(), 1);
}
