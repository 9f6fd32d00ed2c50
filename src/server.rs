//! HTTP and WebSocket front end.
//!
//! A thin axum wrapper around the session engine:
//!
//! - `GET /` - start page, shows `errmsg` if present
//! - `GET /game` - creates a game (no or malformed `g`) and redirects to it,
//!   or serves the game page for a live id
//! - `GET /ws?g=<id>` - WebSocket attach
//! - `GET /static/*` - assets with a `Cache-Control` header

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::{serve_connection, AppState, Frame, GAME_ID_LEN};

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid header value: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),
}

/// Build the application router.
pub fn router(state: AppState) -> Result<Router, ServerError> {
    let cache_control = HeaderValue::from_str(&format!(
        "max-age={}, public, must-revalidate, proxy-revalidate",
        state.config.server.static_max_age_secs
    ))?;
    let assets = Router::new()
        .nest_service("/static", ServeDir::new(&state.config.server.static_dir))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            cache_control,
        ));

    Ok(Router::new()
        .route("/", get(home))
        .route("/game", get(game_page))
        .route("/ws", get(ws_handler))
        .merge(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Bind and serve until the process stops.
pub async fn run(state: AppState) -> Result<(), ServerError> {
    let addr = state.config.server.bind_address.clone();
    let app = router(state)?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn home(Query(query): Query<HashMap<String, String>>) -> Html<String> {
    let error = query
        .get("errmsg")
        .map(|msg| format!("<p class=\"error\">{}</p>", escape_html(msg)))
        .unwrap_or_default();

    Html(format!(
        "<!DOCTYPE html>\n<html><head><title>Memory</title></head><body>\n\
         {error}\n\
         <form action=\"/game\" method=\"get\">\n\
         <input name=\"n\" value=\"10\"> pairs\n\
         <select name=\"t\"><option value=\"1\">classic</option><option value=\"2\">rush</option></select>\n\
         <input name=\"m\" value=\"∞\"> players\n\
         <button>Start</button>\n\
         </form>\n</body></html>\n"
    ))
}

async fn game_page(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let game_id = match query.get("g") {
        Some(g) if g.chars().count() == GAME_ID_LEN => g.clone(),
        _ => {
            let id = state.create_game(&query);
            return Redirect::to(&format!("/game?g={}", id)).into_response();
        }
    };

    info!(game_id = %game_id, "game requested");
    if state.games.get_game(&game_id).is_err() {
        warn!(game_id = %game_id, "game not found");
        let message = format!(
            "The game you were trying to join (id: {}) doesn't exist!",
            game_id
        );
        return Redirect::to(&error_location(&message)).into_response();
    }

    Html(format!(
        "<!DOCTYPE html>\n<html><head><title>Memory {id}</title></head><body>\n\
         <div id=\"game\" data-gid=\"{id}\"></div>\n\
         <script src=\"/static/game.js\"></script>\n</body></html>\n",
        id = escape_html(&game_id)
    ))
    .into_response()
}

async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let game_id = query.get("g").cloned().unwrap_or_default();
    ws.on_upgrade(move |socket| handle_socket(state, game_id, socket))
}

async fn handle_socket(state: AppState, game_id: String, socket: WebSocket) {
    let (sink, stream) = socket.split();

    let incoming = stream.filter_map(|message| async move {
        match message {
            Ok(Message::Text(text)) => Some(Ok(Frame::Text(text))),
            Ok(Message::Close(_)) => Some(Ok(Frame::Close)),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        }
    });
    let outgoing = sink.with(|frame: Frame| async move {
        Ok::<_, axum::Error>(match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Close => Message::Close(None),
        })
    });

    serve_connection(state.games.clone(), game_id, incoming, outgoing).await;
}

/// Start page location carrying an error message.
fn error_location(message: &str) -> String {
    match serde_urlencoded::to_string([("errmsg", message)]) {
        Ok(query) => format!("/?{}", query),
        Err(_) => "/".to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
