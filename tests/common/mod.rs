// tests/common/mod.rs
//
// Shared helpers: a scripted in-memory transport and a tiny axum backend
// bound to an ephemeral local port.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pole_position_widgets::fetch::{FetchError, FetchRequest, FetchResponse, HttpFetch};
use pole_position_widgets::WidgetConfig;

/// Replays scripted results in order; once exhausted, repeats the last one.
/// Every request is recorded.
pub struct ScriptedFetch {
    script: Mutex<VecDeque<Result<FetchResponse, FetchError>>>,
    last: Mutex<Option<Result<FetchResponse, FetchError>>>,
    seen: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetch {
    pub fn new(script: Vec<Result<FetchResponse, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpFetch for ScriptedFetch {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, FetchError> {
        self.seen.lock().unwrap().push(req);
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(r) => {
                *last = Some(r.clone());
                r
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(FetchError::Network("script exhausted".into()))),
        }
    }
}

pub fn ok_json(v: serde_json::Value) -> Result<FetchResponse, FetchError> {
    Ok(FetchResponse {
        status: 200,
        body: v.to_string().into_bytes(),
    })
}

pub fn network_err(msg: &str) -> Result<FetchResponse, FetchError> {
    Err(FetchError::Network(msg.into()))
}

pub fn config_for(base_url: &str) -> WidgetConfig {
    WidgetConfig {
        base_url: base_url.into(),
        ..Default::default()
    }
}

/// Serve `app` on 127.0.0.1 with an OS-assigned port.
pub async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });
    addr
}
