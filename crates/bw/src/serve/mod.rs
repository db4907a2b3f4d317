//! `bw serve`: a local HTTP API over the command dispatcher.
//!
//! Every route maps onto a [`CommandRequest`] and answers with the same [`Response`] envelope the
//! CLI renders. Query strings become options and JSON bodies are handed over already parsed.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use clap::Args;
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::{
    dispatch::{CommandRequest, Dispatcher, Verb},
    options::OptionBag,
    payload::{Payload, PayloadError},
    response::{CommandError, Response, ResponseData},
    session::SessionContext,
    vault::create::MAX_ATTACHMENT_SIZE,
};

/// Header carrying the session key of a single request.
pub const SESSION_HEADER: &str = "x-bw-session";

#[derive(Args, Clone)]
pub struct ServeArgs {
    #[arg(
        long,
        default_value = "localhost",
        help = "The hostname to bind your API webserver to."
    )]
    pub hostname: String,

    #[arg(long, default_value_t = 8087, help = "The port to run your API webserver on.")]
    pub port: u16,
}

/// Room for the multipart framing around the largest attachment.
const UPLOAD_LIMIT: usize = MAX_ATTACHMENT_SIZE + 64 * 1024;

type QueryPairs = Query<Vec<(String, String)>>;
type JsonBody = Result<Json<Value>, JsonRejection>;
type Reply = (StatusCode, Json<Response>);

#[derive(Clone)]
struct ServeState {
    dispatcher: Dispatcher,
    /// Used by requests without a session header. Replaced by `unlock`, cleared by `lock`.
    session: Arc<RwLock<Option<String>>>,
}

impl ServeState {
    async fn run(&self, headers: &HeaderMap, request: CommandRequest) -> Reply {
        let header = headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let session_key = match header {
            Some(key) => Some(key),
            None => self.session.read().await.clone(),
        };
        let session = SessionContext::for_serve(session_key);

        let verb = request.verb;
        let response = self.dispatcher.dispatch(request, &session).await;

        if response.success {
            match (verb, &response.data) {
                (Verb::Unlock, Some(ResponseData::Message { raw: Some(key), .. })) => {
                    *self.session.write().await = Some(key.clone());
                    debug!("Server session replaced");
                }
                (Verb::Lock, _) => {
                    *self.session.write().await = None;
                    debug!("Server session cleared");
                }
                _ => {}
            }
        }

        reply(response)
    }
}

fn reply(response: Response) -> Reply {
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(response))
}

fn bag(query: Vec<(String, String)>) -> OptionBag {
    query.into_iter().collect()
}

/// A request without a JSON content type carries no body. Anything else that fails to parse is
/// reported the same way a malformed encoded payload is.
fn parsed(body: JsonBody) -> Result<Option<Value>, Reply> {
    match body {
        Ok(Json(value)) => Ok(Some(value)),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(None),
        Err(rejection) => {
            debug!(%rejection, "Rejected request body");
            let error = CommandError::from(PayloadError::Body(rejection.body_text()));
            Err(reply(error.into()))
        }
    }
}

fn payload(body: JsonBody) -> Result<Option<Payload>, Reply> {
    Ok(parsed(body)?.map(Payload::Parsed))
}

pub(crate) fn router(dispatcher: Dispatcher, session: Option<String>) -> Router {
    let state = ServeState {
        dispatcher,
        session: Arc::new(RwLock::new(session)),
    };

    Router::new()
        .route("/status", get(status))
        .route("/sync", post(sync))
        .route("/unlock", post(unlock))
        .route("/lock", post(lock))
        .route("/generate", get(generate))
        .route("/list/object/:object", get(list))
        .route("/object/:object", post(create))
        .route(
            "/object/:object/:id",
            get(get_object).put(edit).delete(delete),
        )
        .route("/restore/:object/:id", post(restore))
        .route("/move/:id/:organization_id", post(move_item))
        .route("/confirm/:object/:id", post(confirm))
        .route(
            "/attachment",
            post(create_attachment).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until interrupted.
pub(crate) async fn serve(
    dispatcher: Dispatcher,
    args: ServeArgs,
    session: Option<String>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind((args.hostname.as_str(), args.port)).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(dispatcher, session))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
}

async fn status(State(state): State<ServeState>, headers: HeaderMap) -> Reply {
    state
        .run(&headers, CommandRequest::new(Verb::Status))
        .await
}

async fn sync(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Query(query): QueryPairs,
) -> Reply {
    let request = CommandRequest::new(Verb::Sync).options(bag(query));
    state.run(&headers, request).await
}

async fn unlock(
    State(state): State<ServeState>,
    headers: HeaderMap,
    body: JsonBody,
) -> Reply {
    let body = match parsed(body) {
        Ok(body) => body,
        Err(reply) => return reply,
    };
    let password = body.and_then(|body| {
        body.get("password")
            .and_then(Value::as_str)
            .map(str::to_owned)
    });
    state
        .run(&headers, CommandRequest::new(Verb::Unlock).id(password))
        .await
}

async fn lock(State(state): State<ServeState>, headers: HeaderMap) -> Reply {
    state.run(&headers, CommandRequest::new(Verb::Lock)).await
}

async fn generate(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Query(query): QueryPairs,
) -> Reply {
    let request = CommandRequest::new(Verb::Generate).options(bag(query));
    state.run(&headers, request).await
}

async fn list(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Path(object): Path<String>,
    Query(query): QueryPairs,
) -> Reply {
    let request = CommandRequest::new(Verb::List)
        .object(object)
        .options(bag(query));
    state.run(&headers, request).await
}

async fn get_object(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Path((object, id)): Path<(String, String)>,
    Query(query): QueryPairs,
) -> Reply {
    let request = CommandRequest::new(Verb::Get)
        .object(object)
        .id(Some(id))
        .options(bag(query));
    state.run(&headers, request).await
}

async fn create(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Path(object): Path<String>,
    Query(query): QueryPairs,
    body: JsonBody,
) -> Reply {
    let body = match payload(body) {
        Ok(body) => body,
        Err(reply) => return reply,
    };
    let request = CommandRequest::new(Verb::Create)
        .object(object)
        .payload(body)
        .options(bag(query));
    state.run(&headers, request).await
}

async fn edit(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Path((object, id)): Path<(String, String)>,
    Query(query): QueryPairs,
    body: JsonBody,
) -> Reply {
    let body = match payload(body) {
        Ok(body) => body,
        Err(reply) => return reply,
    };
    let request = CommandRequest::new(Verb::Edit)
        .object(object)
        .id(Some(id))
        .payload(body)
        .options(bag(query));
    state.run(&headers, request).await
}

async fn delete(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Path((object, id)): Path<(String, String)>,
    Query(query): QueryPairs,
) -> Reply {
    let request = CommandRequest::new(Verb::Delete)
        .object(object)
        .id(Some(id))
        .options(bag(query));
    state.run(&headers, request).await
}

async fn restore(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Path((object, id)): Path<(String, String)>,
) -> Reply {
    let request = CommandRequest::new(Verb::Restore).object(object).id(Some(id));
    state.run(&headers, request).await
}

async fn move_item(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Path((id, organization_id)): Path<(String, String)>,
    body: JsonBody,
) -> Reply {
    let body = match payload(body) {
        Ok(body) => body,
        Err(reply) => return reply,
    };
    let mut options = OptionBag::new();
    options.insert("organizationid", organization_id);
    let request = CommandRequest::new(Verb::Move)
        .id(Some(id))
        .payload(body)
        .options(options);
    state.run(&headers, request).await
}

async fn confirm(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Path((object, id)): Path<(String, String)>,
    Query(query): QueryPairs,
) -> Reply {
    let request = CommandRequest::new(Verb::Confirm)
        .object(object)
        .id(Some(id))
        .options(bag(query));
    state.run(&headers, request).await
}

async fn create_attachment(
    State(state): State<ServeState>,
    headers: HeaderMap,
    Query(query): QueryPairs,
    mut multipart: Multipart,
) -> Reply {
    let mut file = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let file_name = field
                    .file_name()
                    .and_then(|name| std::path::Path::new(name).file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match field.bytes().await {
                    Ok(data) => {
                        file = Some(Payload::File {
                            file_name,
                            data: data.to_vec(),
                        })
                    }
                    Err(e) => return reply(Response::bad_request(e)),
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => return reply(Response::bad_request(e)),
        }
    }

    let request = CommandRequest::new(Verb::Create)
        .object("attachment")
        .payload(file)
        .options(bag(query));
    state.run(&headers, request).await
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use tower::ServiceExt;
    use uuid::{Uuid, uuid};

    use super::*;
    use crate::{
        dispatch::tests::Mocks,
        vault::test_support::{attachment, login},
    };

    const ITEM: Uuid = uuid!("11111111-1111-1111-1111-111111111111");

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_templates_are_served_without_a_session() {
        let app = router(Dispatcher::new(Mocks::default().into_services()), None);

        let (status, body) = call(&app, get("/object/template/folder")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["object"], "template");
        assert_eq!(body["data"]["template"]["name"], "Folder name");
    }

    #[tokio::test]
    async fn test_failures_are_bad_requests() {
        let mut mocks = Mocks::default();
        mocks
            .crypto
            .expect_validate_session()
            .withf(|key| key.as_deref() == Some("header-key"))
            .returning(|_| Ok(false));
        let app = router(Dispatcher::new(mocks.into_services()), None);

        let request = Request::builder()
            .uri("/list/object/items")
            .header(SESSION_HEADER, "header-key")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Vault is locked.");
    }

    #[tokio::test]
    async fn test_unlock_replaces_the_server_session() {
        let mut mocks = Mocks::default();
        mocks
            .crypto
            .expect_unlock()
            .withf(|password| password == "hunter2")
            .times(1)
            .returning(|_| Ok("fresh".to_owned()));
        mocks
            .crypto
            .expect_validate_session()
            .withf(|key| key.as_deref() == Some("fresh"))
            .returning(|_| Ok(true));
        mocks.ciphers.expect_list().returning(|| Ok(vec![]));
        let app = router(Dispatcher::new(mocks.into_services()), Some("stale".to_owned()));

        let (status, body) = call(
            &app,
            post_json("/unlock", serde_json::json!({ "password": "hunter2" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["raw"], "fresh");

        let (status, body) = call(&app, get("/list/object/items")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["object"], "list");
    }

    #[tokio::test]
    async fn test_lock_clears_the_server_session() {
        let mut mocks = Mocks::default();
        mocks.crypto.expect_lock().times(1).returning(|| Ok(()));
        mocks
            .crypto
            .expect_validate_session()
            .withf(|key| key.is_none())
            .returning(|_| Ok(false));
        let app = router(Dispatcher::new(mocks.into_services()), Some("key".to_owned()));

        let request = Request::builder()
            .method("POST")
            .uri("/lock")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, get("/list/object/items")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_attachment_upload_is_multipart() {
        let mut mocks = Mocks::unlocked();
        mocks
            .ciphers
            .expect_get()
            .returning(|id| Ok(Some(login(id, "GitHub"))));
        mocks
            .account
            .expect_can_access_premium()
            .returning(|| Ok(true));
        mocks
            .ciphers
            .expect_save_attachment()
            .withf(|id, file_name, data| {
                *id == ITEM && file_name == "photo.jpg" && data.as_slice() == b"hello"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let app = router(Dispatcher::new(mocks.into_services()), Some("key".to_owned()));

        let boundary = "X-BOUNDARY";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"photo.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri(format!("/attachment?itemid={ITEM}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["object"], "item");
    }

    #[tokio::test]
    async fn test_attachment_upload_above_default_body_limit() {
        let contents = vec![b'x'; 3 * 1024 * 1024];
        let expected = contents.len();
        let mut mocks = Mocks::unlocked();
        mocks
            .ciphers
            .expect_get()
            .returning(|id| Ok(Some(login(id, "GitHub"))));
        mocks
            .account
            .expect_can_access_premium()
            .returning(|| Ok(true));
        mocks
            .ciphers
            .expect_save_attachment()
            .withf(move |_, _, data| data.len() == expected)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let app = router(Dispatcher::new(mocks.into_services()), Some("key".to_owned()));

        let boundary = "X-BOUNDARY";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"large.bin\"\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(&contents);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        let request = Request::builder()
            .method("POST")
            .uri(format!("/attachment?itemid={ITEM}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_a_parse_error() {
        let mut mocks = Mocks::unlocked();
        mocks.folders.expect_create().never();
        let app = router(Dispatcher::new(mocks.into_services()), Some("key".to_owned()));

        let request = Request::builder()
            .method("POST")
            .uri("/object/folder")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Error parsing the encoded request data.");

        let request = Request::builder()
            .method("POST")
            .uri("/object/folder")
            .body(Body::empty())
            .unwrap();
        let (_, body) = call(&app, request).await;
        assert_eq!(body["message"], "`requestJson` was not provided.");
    }

    #[tokio::test]
    async fn test_attachment_download_is_returned_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("written.txt");
        let mut mocks = Mocks::unlocked();
        mocks.ciphers.expect_get().returning(|id| {
            let mut cipher = login(id, "GitHub");
            cipher.attachments = vec![attachment("att1", "codes.txt")];
            Ok(Some(cipher))
        });
        mocks
            .account
            .expect_can_access_premium()
            .returning(|| Ok(true));
        mocks
            .ciphers
            .expect_download_attachment()
            .returning(|_, _| Ok(b"codes".to_vec()));
        let app = router(Dispatcher::new(mocks.into_services()), Some("key".to_owned()));

        let uri = format!(
            "/object/attachment/att1?itemid={ITEM}&output={}",
            target.display()
        );
        let (status, body) = call(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["object"], "file");
        assert_eq!(body["data"]["fileName"], "codes.txt");
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_attachment_without_file_is_rejected() {
        let app = router(
            Dispatcher::new(Mocks::unlocked().into_services()),
            Some("key".to_owned()),
        );

        let request = Request::builder()
            .method("POST")
            .uri(format!("/attachment?itemid={ITEM}"))
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=X-BOUNDARY",
            )
            .body(Body::from("--X-BOUNDARY--\r\n"))
            .unwrap();

        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "`file` option is required.");
    }
}
