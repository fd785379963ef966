//! # WebSocket Transport
//!
//! Each connected peer is one actix WebSocket actor. On upgrade the peer's
//! role is derived from the request URI (`ESP32` marker → Producer), the
//! actor registers itself with the shared [`Relay`], and from then on every
//! inbound frame is pumped through `Relay::handle_frame`. The actor also
//! runs the heartbeat: protocol-level pings every 30 seconds, dropping peers
//! that have been silent for 60.

use crate::relay::frame::InboundFrame;
use crate::relay::relay::{ConnectionRole, PeerLink, Relay};

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How often the server pings a peer.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Silence threshold after which a peer is considered gone.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Text frame queued toward this peer by the relay.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SendText(pub String);

/// One WebSocket connection, producer or consumer.
pub struct RelaySocket {
    conn_id: Uuid,
    role: ConnectionRole,
    relay: Arc<Mutex<Relay>>,
    last_heartbeat: Instant,
}

impl RelaySocket {
    pub fn new(role: ConnectionRole, relay: Arc<Mutex<Relay>>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            role,
            relay,
            last_heartbeat: Instant::now(),
        }
    }

    fn forward(&self, frame: InboundFrame) {
        debug!(
            role = self.role.as_str(),
            len = frame.len(),
            "inbound frame"
        );
        self.relay.lock().unwrap().handle_frame(self.role, frame);
    }
}

/// Outbound link handed to the relay: messages are queued through the actor
/// mailbox so sends are safe from any thread.
struct ActorLink {
    addr: Addr<RelaySocket>,
}

impl PeerLink for ActorLink {
    fn send_text(&self, text: &str) {
        self.addr.do_send(SendText(text.to_string()));
    }

    fn is_open(&self) -> bool {
        self.addr.connected()
    }
}

impl Actor for RelaySocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(role = self.role.as_str(), conn_id = %self.conn_id, "websocket connection started");

        let link = Arc::new(ActorLink {
            addr: ctx.address(),
        });
        self.relay
            .lock()
            .unwrap()
            .register(self.role, self.conn_id, link);

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(role = act.role.as_str(), "heartbeat timeout, closing connection");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(role = self.role.as_str(), conn_id = %self.conn_id, "websocket connection stopped");
        self.relay.lock().unwrap().unregister(self.role, self.conn_id);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RelaySocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.forward(InboundFrame::Text(text.to_string()));
            }
            Ok(ws::Message::Binary(data)) => {
                self.last_heartbeat = Instant::now();
                self.forward(InboundFrame::Binary(data.to_vec()));
            }
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!(role = self.role.as_str(), ?reason, "websocket closed by peer");
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                // Fragmented frames are not part of the sensor protocol.
                warn!("unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!(role = self.role.as_str(), error = %err, "websocket protocol error");
                ctx.stop();
            }
        }
    }
}

impl Handler<SendText> for RelaySocket {
    type Result = ();

    fn handle(&mut self, msg: SendText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

/// HTTP → WebSocket upgrade endpoint.
pub async fn relay_websocket(
    req: HttpRequest,
    stream: web::Payload,
    relay: web::Data<Arc<Mutex<Relay>>>,
) -> ActixResult<HttpResponse> {
    let uri = req.uri().to_string();
    let role = ConnectionRole::from_uri(&uri);
    info!(
        role = role.as_str(),
        peer = ?req.connection_info().peer_addr(),
        "new websocket connection request"
    );

    let socket = RelaySocket::new(role, relay.get_ref().clone());
    ws::start(socket, &req, stream)
}
