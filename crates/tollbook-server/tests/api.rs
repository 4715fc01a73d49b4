use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc, Weekday};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tollbook_config::{Bot, Config, Line, Logging, Server, Store};
use tollbook_kernel::is_holiday;
use tollbook_server::{build_app, sign_body};
use tower::util::ServiceExt;

const SECRET: &str = "test-channel-secret";

#[derive(Clone, Default)]
struct Captured {
    replies: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Captured {
    async fn texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .await
            .iter()
            .map(|(_, body)| body["messages"][0]["text"].as_str().unwrap().to_string())
            .collect()
    }
}

async fn capture_reply(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    captured.replies.lock().await.push((auth, body));
    StatusCode::OK
}

/// Stands in for the messaging platform's reply API.
async fn spawn_reply_sink() -> (String, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/v2/bot/message/reply", post(capture_reply))
        .with_state(captured.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v2/bot/message/reply"), captured)
}

fn test_config(reply_endpoint: &str) -> Config {
    Config {
        server: Server {
            listen_addr: "127.0.0.1:0".to_string(),
            callback_path: "/callback".to_string(),
        },
        store: Store {
            kind: "memory".to_string(),
            sqlite_path: None,
        },
        line: Line {
            channel_secret: SECRET.to_string(),
            channel_access_token: "test-access-token".to_string(),
            reply_endpoint: reply_endpoint.to_string(),
            timeout_ms: 2_000,
        },
        bot: Bot::default(),
        logging: Logging::default(),
    }
}

fn test_config_sqlite(reply_endpoint: &str, db_path: &str) -> Config {
    let mut cfg = test_config(reply_endpoint);
    cfg.store.kind = "sqlite".to_string();
    cfg.store.sqlite_path = Some(db_path.to_string());
    cfg
}

fn temp_db_path() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("tollbook-api-{nanos}.db"))
        .to_string_lossy()
        .to_string()
}

fn text_events(texts: &[&str]) -> Value {
    let events: Vec<Value> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            json!({
                "type": "message",
                "mode": "active",
                "timestamp": 1_700_000_000_000i64,
                "replyToken": format!("reply-{i}"),
                "source": {"type": "user", "userId": "U1"},
                "message": {"type": "text", "id": format!("m{i}"), "text": text}
            })
        })
        .collect();
    json!({"destination": "Ubot", "events": events})
}

fn signed_request(body: &Value) -> Request<Body> {
    let raw = body.to_string();
    Request::builder()
        .method("POST")
        .uri("/callback")
        .header("content-type", "application/json")
        .header("x-line-signature", sign_body(SECRET, raw.as_bytes()))
        .body(Body::from(raw))
        .unwrap()
}

async fn send_texts(app: &Router, texts: &[&str]) -> StatusCode {
    let res = app
        .clone()
        .oneshot(signed_request(&text_events(texts)))
        .await
        .unwrap();
    res.status()
}

/// First Saturday and first Monday of June in the bot's current year.
fn june_weekend_and_weekday() -> (String, String) {
    let offset = FixedOffset::east_opt(8 * 3600).unwrap();
    let year = Utc::now().with_timezone(&offset).year();
    let first = NaiveDate::from_ymd_opt(year, 6, 1).unwrap();
    let find = |weekday: Weekday| {
        (0..7)
            .map(|i| first + Duration::days(i))
            .find(|d| d.weekday() == weekday)
            .unwrap()
    };
    let (saturday, monday) = (find(Weekday::Sat), find(Weekday::Mon));
    assert!(is_holiday(saturday) && !is_holiday(monday));
    (
        saturday.format("%m/%d").to_string(),
        monday.format("%m/%d").to_string(),
    )
}

#[tokio::test]
async fn healthz_ok() {
    let app = build_app(test_config("http://127.0.0.1:9/reply"))
        .await
        .unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn verification_ping_with_no_events_is_accepted() {
    let (endpoint, captured) = spawn_reply_sink().await;
    let app = build_app(test_config(&endpoint)).await.unwrap();
    let status = app
        .oneshot(signed_request(&json!({"destination": "Ubot", "events": []})))
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::OK);
    assert!(captured.texts().await.is_empty());
}

#[tokio::test]
async fn bad_signature_is_rejected_without_dispatch() {
    let (endpoint, captured) = spawn_reply_sink().await;
    let app = build_app(test_config(&endpoint)).await.unwrap();

    let raw = text_events(&["新增人名 小明"]).to_string();
    let forged = Request::builder()
        .method("POST")
        .uri("/callback")
        .header("x-line-signature", sign_body("wrong-secret", raw.as_bytes()))
        .body(Body::from(raw.clone()))
        .unwrap();
    let res = app.clone().oneshot(forged).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let payload: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["error"]["code"], "invalid_signature");

    let unsigned = Request::builder()
        .method("POST")
        .uri("/callback")
        .body(Body::from(raw))
        .unwrap();
    let res = app.clone().oneshot(unsigned).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(send_texts(&app, &["清單 人名"]).await, StatusCode::OK);
    assert_eq!(captured.texts().await, vec!["目前沒有任何人名紀錄。"]);
}

#[tokio::test]
async fn signed_garbage_body_is_bad_request() {
    let app = build_app(test_config("http://127.0.0.1:9/reply"))
        .await
        .unwrap();
    let raw = "not json";
    let req = Request::builder()
        .method("POST")
        .uri("/callback")
        .header("x-line-signature", sign_body(SECRET, raw.as_bytes()))
        .body(Body::from(raw))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn replies_carry_token_and_bearer_auth() {
    let (endpoint, captured) = spawn_reply_sink().await;
    let app = build_app(test_config(&endpoint)).await.unwrap();
    assert_eq!(send_texts(&app, &["說明"]).await, StatusCode::OK);

    let replies = captured.replies.lock().await;
    assert_eq!(replies.len(), 1);
    let (auth, body) = &replies[0];
    assert_eq!(auth.as_deref(), Some("Bearer test-access-token"));
    assert_eq!(body["replyToken"], "reply-0");
    assert_eq!(body["messages"][0]["type"], "text");
    assert!(body["messages"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("指令說明："));
}

#[tokio::test]
async fn non_text_events_are_skipped() {
    let (endpoint, captured) = spawn_reply_sink().await;
    let app = build_app(test_config(&endpoint)).await.unwrap();
    let body = json!({
        "events": [
            {"type": "follow", "replyToken": "f1", "source": {"type": "user"}},
            {"type": "message", "replyToken": "s1", "message": {"type": "sticker", "id": "1"}},
            {"type": "message", "replyToken": "t1", "message": {"type": "text", "id": "2", "text": "清單 地點"}}
        ]
    });
    let status = app.oneshot(signed_request(&body)).await.unwrap().status();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(captured.texts().await, vec!["目前沒有任何地點紀錄。"]);
}

#[tokio::test]
async fn paired_location_prices_by_day_kind() {
    let (endpoint, captured) = spawn_reply_sink().await;
    let app = build_app(test_config(&endpoint)).await.unwrap();
    let (saturday, monday) = june_weekend_and_weekday();

    let on_saturday = format!("{saturday}(六) 小明 遊樂園");
    let on_monday = format!("{monday}(一) 小明 遊樂園");
    send_texts(&app, &["新增 遊樂園 平日 100 假日 200"]).await;
    send_texts(&app, &[on_saturday.as_str(), on_monday.as_str()]).await;
    send_texts(&app, &["統計 小明 6月"]).await;

    let texts = captured.texts().await;
    assert_eq!(texts[0], "已新增/更新地點：遊樂園，平日：100，假日：200");
    assert_eq!(texts[1], format!("已成功紀錄：{saturday}, 小明, 遊樂園, 金額: 200"));
    assert_eq!(texts[2], format!("已成功紀錄：{monday}, 小明, 遊樂園, 金額: 100"));
    assert_eq!(texts[3], "小明 在 6月 的通路費總計為：300");
}

#[tokio::test]
async fn full_command_round_trip() {
    let (endpoint, captured) = spawn_reply_sink().await;
    let app = build_app(test_config(&endpoint)).await.unwrap();

    send_texts(
        &app,
        &[
            "新增 停車場 100",
            "新增人名 小明",
            "清單 地點",
            "清單 人名",
            "06/02 小明 停車場",
            "06/03 小明 海邊 55",
            "統計 小明",
            "刪除 紀錄 06/02(二) 小明",
            "統計 小明",
            "刪除 人名 小明",
            "刪除 人名 小明",
            "新增 停車場 一百",
            "哈囉",
        ],
    )
    .await;

    let texts = captured.texts().await;
    assert_eq!(
        texts,
        vec![
            "已新增/更新地點：停車場，金額：100",
            "已成功新增人名：小明",
            "地點清單：\n停車場: 100",
            "人名清單：\n小明",
            "已成功紀錄：06/02, 小明, 停車場, 金額: 100",
            "已成功紀錄：06/03, 小明, 海邊, 金額: 55",
            "小明 的通路費總計為：155",
            "已成功刪除 06/02 小明 的紀錄，共 1 筆。",
            "小明 的通路費總計為：55",
            "已成功刪除人名：小明",
            "找不到人名：小明",
            "錯誤：金額必須是數字！",
            "無法辨識的指令，請輸入「說明」查看指令格式。",
        ]
    );
}

#[tokio::test]
async fn sqlite_store_survives_app_restart() {
    let (endpoint, captured) = spawn_reply_sink().await;
    let db_path = temp_db_path();

    let app = build_app(test_config_sqlite(&endpoint, &db_path))
        .await
        .unwrap();
    send_texts(&app, &["新增 停車場 平日 10 假日 20", "06/02 小華 停車場 7"]).await;
    drop(app);

    let app = build_app(test_config_sqlite(&endpoint, &db_path))
        .await
        .unwrap();
    send_texts(&app, &["清單 地點", "統計 6月"]).await;

    let texts = captured.texts().await;
    assert_eq!(texts[2], "地點清單：\n停車場: 平日-10, 假日-20");
    assert!(texts[3].ends_with("6月 通路費統計：\n小華：7\n合計：7"));
}

#[tokio::test]
async fn unreachable_reply_endpoint_still_acknowledges_webhook() {
    let app = build_app(test_config("http://127.0.0.1:9/reply"))
        .await
        .unwrap();
    assert_eq!(send_texts(&app, &["說明"]).await, StatusCode::OK);
}
