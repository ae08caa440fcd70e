//! Tests of the REST client against a local HTTP responder, that replays canned replies

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use planner_calendar::client::Client;
use planner_calendar::error::ScheduleError;
use planner_calendar::traits::ScheduleSource;
use planner_calendar::{Category, EventDraft, EventId, EventPatch, YearMonth};

use chrono::{NaiveDate, NaiveTime};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Start a server that answers one connection per reply, then returns the requests it received
async fn replay_server(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in replies {
            let (mut socket, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut socket).await);

            let reason = match status {
                200 => "OK",
                204 => "No Content",
                404 => "Not Found",
                _ => "Internal Server Error",
            };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status, reason, body.len(), body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
        requests
    });

    (url, handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
            let content_length = head.lines()
                .find_map(|line| line.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
                .unwrap_or(0);
            if data.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}

fn request_line(request: &str) -> &str {
    request.lines().next().unwrap_or_default()
}

fn body(request: &str) -> &str {
    request.split("\r\n\r\n").nth(1).unwrap_or_default()
}

#[tokio::test]
async fn test_listings() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (url, server) = replay_server(vec![
        (200, r#"{"items": [{"id": 7, "date": "2024-02-10", "end_date": "2024-02-12", "title": "Diet", "memo": null, "kind": "식사", "time": "08:30"}]}"#),
        (200, r#"{"items": [{"id": 8, "date": "2024-02-10", "end_date": null, "title": "Run", "kind": "운동"}]}"#),
        (200, r#"{"items": []}"#),
    ]).await;

    let client = Client::new(&url, Some("secret".to_string())).unwrap();

    let month = client.list_month(YearMonth::new(2024, 2).unwrap()).await.unwrap();
    assert_eq!(month.len(), 1);
    assert_eq!(month[0].id(), &EventId::from(7u64));
    assert_eq!(month[0].category(), Category::Meal);
    assert_eq!(month[0].end_date(), Some(ymd(2024, 2, 12)));
    assert_eq!(month[0].memo(), "");
    assert_eq!(month[0].time(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());

    let day = client.list_by_date(ymd(2024, 2, 10), Some(Category::Workout)).await.unwrap();
    assert_eq!(day[0].category(), Category::Workout);
    assert_eq!(day[0].end_date(), None);
    assert_eq!(day[0].time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());

    let found = client.search("dentist appointment").await.unwrap();
    assert!(found.is_empty());
    // Blank searches do not reach the server
    assert!(client.search("  ").await.unwrap().is_empty());

    let requests = server.await.unwrap();
    assert_eq!(request_line(&requests[0]), "GET /api/schedule/month?month=2024-02 HTTP/1.1");
    assert!(requests[0].to_ascii_lowercase().contains("authorization: bearer secret"));
    assert_eq!(request_line(&requests[1]), "GET /api/schedule/items?date=2024-02-10&kind=%EC%9A%B4%EB%8F%99 HTTP/1.1");
    assert_eq!(request_line(&requests[2]), "GET /api/schedule/search?query=dentist+appointment HTTP/1.1");
}

#[tokio::test]
async fn test_writes() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (url, server) = replay_server(vec![
        (200, r#"{"item": {"id": 12, "date": "2024-02-20", "end_date": "2024-02-20", "title": "Yoga", "memo": "", "kind": "운동", "time": "07:00"}}"#),
        (200, r#"{"item": {"id": 12, "date": "2024-02-20", "end_date": "2024-02-20", "title": "Hot yoga", "memo": "", "kind": "운동", "time": "07:00"}}"#),
        (204, ""),
    ]).await;

    let client = Client::new(format!("{}/", url), None).unwrap();

    let draft = EventDraft::new(ymd(2024, 2, 20), "Yoga", Category::Workout)
        .at(NaiveTime::from_hms_opt(7, 0, 0).unwrap());
    let created = client.create(draft).await.unwrap();
    assert_eq!(created.id().as_str(), "12");
    assert_eq!(created.end_date(), Some(ymd(2024, 2, 20)));

    let patch = EventPatch { title: Some("Hot yoga".to_string()), ..EventPatch::default() };
    let updated = client.update(created.id(), patch).await.unwrap();
    assert_eq!(updated.title(), "Hot yoga");

    client.delete(created.id()).await.unwrap();

    let requests = server.await.unwrap();
    assert_eq!(request_line(&requests[0]), "POST /api/schedule/items HTTP/1.1");
    assert!(requests[0].to_ascii_lowercase().contains("authorization") == false);
    let sent: serde_json::Value = serde_json::from_str(body(&requests[0])).unwrap();
    assert_eq!(sent["date"], "2024-02-20");
    assert_eq!(sent["kind"], "운동");
    assert_eq!(sent["title"], "Yoga");
    assert_eq!(sent["time"], "07:00");

    assert_eq!(request_line(&requests[1]), "PUT /api/schedule/items/12 HTTP/1.1");
    let sent: serde_json::Value = serde_json::from_str(body(&requests[1])).unwrap();
    assert_eq!(sent, serde_json::json!({"title": "Hot yoga"}));

    assert_eq!(request_line(&requests[2]), "DELETE /api/schedule/items/12 HTTP/1.1");
}

#[tokio::test]
async fn test_errors() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (url, server) = replay_server(vec![
        (404, r#"{"error": "not found"}"#),
        (500, r#"{"error": "database is down"}"#),
        (404, r#"{"error": "no such route"}"#),
    ]).await;

    let client = Client::new(&url, None).unwrap();

    match client.delete(&EventId::from(99u64)).await {
        Err(ScheduleError::NotFound(id)) => assert_eq!(id, EventId::from(99u64)),
        other => panic!("unexpected {:?}", other),
    }
    match client.list_month(YearMonth::new(2024, 2).unwrap()).await {
        Err(ScheduleError::Network(msg)) => assert!(msg.contains("database is down")),
        other => panic!("unexpected {:?}", other),
    }
    // A 404 on a listing is not about an event
    assert!(client.list_by_date(ymd(2024, 2, 10), None).await.unwrap_err().is_network());

    // Invalid drafts never reach the server
    assert!(client.create(EventDraft::new(ymd(2024, 2, 10), "", Category::Meal)).await.is_err());
    assert_eq!(server.await.unwrap().len(), 3);

    // Nobody listens anymore
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let client = Client::new(&closed, None).unwrap();
    assert!(client.list_month(YearMonth::new(2024, 2).unwrap()).await.unwrap_err().is_network());
}
