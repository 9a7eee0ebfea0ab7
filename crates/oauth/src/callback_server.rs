use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    axum::{Router, extract::Query, http::StatusCode, response::Html, routing::get},
    rand::{Rng, distr::Alphanumeric},
    tokio::{net::TcpListener, sync::oneshot},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

pub const CALLBACK_PATH: &str = "/oauth/callback";

const SUCCESS_PAGE: &str =
    "<h1>Authentication successful!</h1><p>You can close this window and return to aios.</p>";

type ResultSender = Arc<Mutex<Option<oneshot::Sender<Result<String>>>>>;

/// Random `state` value for an authorization request.
#[must_use]
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// One-shot HTTP listener on `127.0.0.1` that receives the OAuth redirect.
pub struct CallbackServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl CallbackServer {
    /// Bind an ephemeral loopback port.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(Error::Bind)?;
        let addr = listener.local_addr().map_err(Error::Bind)?;
        debug!(%addr, "OAuth callback listener bound");
        Ok(Self { listener, addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://127.0.0.1:<port>/oauth/callback`.
    pub fn redirect_uri(&self) -> String {
        format!("http://{}{CALLBACK_PATH}", self.addr)
    }

    /// Serve until the first callback arrives, `timeout` elapses, or
    /// `cancel` fires. The listener is dropped on return.
    pub async fn wait_for_code(
        self,
        expected_state: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String> {
        aios_common::ensure_active(cancel)?;
        let (tx, rx) = oneshot::channel::<Result<String>>();
        let tx: ResultSender = Arc::new(Mutex::new(Some(tx)));
        let expected_state = expected_state.to_string();

        let app = Router::new().route(
            CALLBACK_PATH,
            get(move |Query(params): Query<HashMap<String, String>>| {
                let outcome = check_params(&params, &expected_state);
                let tx = tx.lock().unwrap_or_else(|e| e.into_inner()).take();
                async move { respond(outcome, tx) }
            }),
        );

        info!(redirect_uri = %self.redirect_uri(), "waiting for OAuth callback");
        let server = axum::serve(self.listener, app);

        tokio::select! {
            result = rx => {
                result.unwrap_or(Err(Error::ServerExited))
            }
            _ = server.into_future() => {
                Err(Error::ServerExited)
            }
            _ = tokio::time::sleep(timeout) => {
                warn!(timeout_secs = timeout.as_secs(), "OAuth callback timed out");
                Err(Error::Timeout(timeout))
            }
            _ = cancel.cancelled() => {
                Err(aios_common::Cancelled.into())
            }
        }
    }
}

fn check_params(params: &HashMap<String, String>, expected_state: &str) -> Result<String> {
    match params.get("state") {
        Some(state) if state == expected_state => {},
        _ => return Err(Error::InvalidState),
    }
    if let Some(error) = params.get("error") {
        return Err(Error::Provider(error.clone()));
    }
    match params.get("code") {
        Some(code) if !code.is_empty() => Ok(code.clone()),
        _ => Err(Error::MissingCode),
    }
}

fn respond(
    outcome: Result<String>,
    tx: Option<oneshot::Sender<Result<String>>>,
) -> (StatusCode, Html<String>) {
    let response = match &outcome {
        Ok(_) => (StatusCode::OK, Html(SUCCESS_PAGE.to_string())),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Html(format!("<h1>Authentication failed</h1><p>{}</p>", escape_html(&e.to_string()))),
        ),
    };
    if let Some(tx) = tx {
        let _ = tx.send(outcome);
    }
    response
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
