use std::sync::Arc;
use std::time::Instant;

use formats::FeatureCollection;
use foundation::time::Millis;
use protocol::{BackendError, CommandReply};
use reqwest::Client;
use runtime::ExpiryTicket;
use serde_json::{Value, json};
use session::{MapSession, SessionError};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::transport::{self, Endpoints};

/// Everything that can wake the event loop.
#[derive(Debug)]
pub enum AppEvent {
    UploadFinished(Result<FeatureCollection, BackendError>),
    CommandFinished(Result<CommandReply, BackendError>),
    StatusExpired(ExpiryTicket),
}

/// Owns the session and drains events one at a time.
///
/// Network calls and expiry timers run as spawned tasks that only send
/// events back; the session itself is never shared.
pub struct App {
    session: MapSession,
    client: Client,
    endpoints: Arc<Endpoints>,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
    started: Instant,
    wait_for_status: bool,
}

impl App {
    pub fn new(session: MapSession, endpoints: Endpoints, wait_for_status: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session,
            client: Client::new(),
            endpoints: Arc::new(endpoints),
            tx,
            rx,
            started: Instant::now(),
            wait_for_status,
        }
    }

    pub fn session(&self) -> &MapSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MapSession {
        &mut self.session
    }

    fn now(&self) -> Millis {
        Millis(u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX))
    }

    pub fn start_upload(&mut self) -> Result<(), SessionError> {
        let request = self.session.begin_upload(self.now())?;
        self.arm_status_timer();
        let client = self.client.clone();
        let endpoints = Arc::clone(&self.endpoints);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let reply = transport::send_upload(&client, &endpoints.upload_url, &request).await;
            let _ = tx.send(AppEvent::UploadFinished(reply));
        });
        Ok(())
    }

    pub fn start_command(&mut self, query: &str) -> Result<(), SessionError> {
        let request = self.session.begin_command(query)?;
        let client = self.client.clone();
        let endpoints = Arc::clone(&self.endpoints);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let reply = transport::send_command(&client, &endpoints, &request).await;
            let _ = tx.send(AppEvent::CommandFinished(reply));
        });
        Ok(())
    }

    /// Processes events until no request is in flight (and, when asked, the
    /// status line has cleared).
    pub async fn run_until_idle(&mut self) {
        while self.busy() {
            let Some(event) = self.rx.recv().await else {
                break;
            };
            self.handle(event);
        }
    }

    fn busy(&self) -> bool {
        self.session.upload_pending()
            || self.session.command_pending()
            || (self.wait_for_status && self.session.status().is_some())
    }

    fn handle(&mut self, event: AppEvent) {
        let now = self.now();
        match event {
            AppEvent::UploadFinished(reply) => {
                self.session.complete_upload(reply, now);
            }
            AppEvent::CommandFinished(reply) => {
                let outcomes = self.session.complete_command(reply, now);
                info!("command produced {} outcome(s)", outcomes.len());
            }
            AppEvent::StatusExpired(ticket) => {
                if self.session.expire_status(ticket) {
                    debug!("status cleared");
                }
            }
        }
        self.arm_status_timer();
        if let Some(fit) = self.session.take_viewport_fit() {
            info!(
                "fit viewport to layer {}: {:?} .. {:?}",
                fit.layer_id, fit.bounds.min, fit.bounds.max
            );
        }
    }

    fn arm_status_timer(&mut self) {
        let Some(ticket) = self.session.take_status_timer() else {
            return;
        };
        let delay = ticket.delay_from(self.now());
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(AppEvent::StatusExpired(ticket));
        });
    }

    /// Snapshot of the session for printing.
    pub fn report(&self) -> Value {
        let s = &self.session;
        let layers: Vec<_> = s.layers().iter().map(|l| l.summary()).collect();
        let basemap = s.basemap();
        json!({
            "basemap": {
                "name": basemap.as_str(),
                "tileUrl": basemap.tile_url(),
                "attribution": basemap.attribution(),
            },
            "status": s.status(),
            "history": s.history().entries(),
            "layers": layers,
            "renderPlan": s.render_plan(),
        })
    }
}
