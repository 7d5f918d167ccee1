//! WebSocket session for one participant in one room.
//!
//! Decodes inbound client messages, runs camera frames through the gesture
//! classifier and forwards the results to the room actor. Outbound messages from
//! the room arrive as [`ServerMessage`]s and are written to the socket as JSON.

use std::sync::Arc;
use std::time::Instant;

use actix::prelude::*;
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::game::types::{ParticipantId, RoomCode};
use crate::server::registry::{Connection, ConnectionHandle};
use crate::server::room_session::manager::GetRoom;
use crate::server::room_session::messages::{
    ClientMessage, CloseSession, Connect, Disconnect, FrameAnalyzed, ReadySignal, RestartRequest,
    ServerMessage,
};
use crate::server::room_session::server::RoomSession;
use crate::server::state::AppState;
use crate::server::ws_error::{room_error_response, ws_error_message};
use crate::services::classifier::{
    GestureClassifier, classify_in_background, decode_frame, strip_data_url,
};
use crate::services::events::{EventRecorder, GameEvent};

pub struct ParticipantSession {
    pub room_code: RoomCode,
    pub participant_id: ParticipantId,
    pub room_addr: Addr<RoomSession>,
    pub classifier: Arc<dyn GestureClassifier>,
    pub recorder: Arc<dyn EventRecorder>,
    /// Set once the room has seated this connection.
    connection_id: Option<Uuid>,
    /// A frame is being classified; frames arriving meanwhile are dropped.
    classifying: bool,
}

impl ParticipantSession {
    pub fn new(
        room_code: RoomCode,
        participant_id: ParticipantId,
        room_addr: Addr<RoomSession>,
        classifier: Arc<dyn GestureClassifier>,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            room_code,
            participant_id,
            room_addr,
            classifier,
            recorder,
            connection_id: None,
            classifying: false,
        }
    }

    fn handle_client_message(
        &mut self,
        msg: ClientMessage,
        received: Instant,
        payload_size_bytes: usize,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let kind = msg.kind();
        match msg {
            ClientMessage::VideoFrame { frame } => {
                self.handle_frame(frame, received, payload_size_bytes, ctx);
                return;
            }
            ClientMessage::PlayerReady => self.room_addr.do_send(ReadySignal {
                participant_id: self.participant_id.clone(),
            }),
            ClientMessage::RestartGame => self.room_addr.do_send(RestartRequest {
                participant_id: self.participant_id.clone(),
            }),
        }
        self.record_communication(kind, received, payload_size_bytes);
    }

    /// Decode the frame here, classify it on the blocking pool and forward the
    /// verdict to the room once it is known.
    fn handle_frame(
        &mut self,
        frame: String,
        received: Instant,
        payload_size_bytes: usize,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let bytes = match decode_frame(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("[ParticipantSession] Dropping frame from {}: {}", self.participant_id, e);
                self.record_communication("video_frame", received, payload_size_bytes);
                return;
            }
        };
        if self.classifying {
            debug!("[ParticipantSession] {} still classifying, frame skipped", self.participant_id);
            self.record_communication("video_frame", received, payload_size_bytes);
            return;
        }

        self.classifying = true;
        let pending = classify_in_background(self.classifier.clone(), bytes);
        ctx.spawn(pending.into_actor(self).map(
            move |(detection, processing_time_ms), act, _ctx| {
                act.classifying = false;
                act.room_addr.do_send(FrameAnalyzed {
                    participant_id: act.participant_id.clone(),
                    frame: strip_data_url(&frame).to_string(),
                    detection,
                    processing_time_ms,
                });
                act.record_communication("video_frame", received, payload_size_bytes);
            },
        ));
    }

    fn record_communication(&self, event_type: &str, received: Instant, payload_size_bytes: usize) {
        self.recorder.record(GameEvent::Communication {
            room_id: self.room_code.clone(),
            player_id: self.participant_id.clone(),
            event_type: event_type.to_string(),
            latency_ms: received.elapsed().as_secs_f64() * 1000.0,
            payload_size_bytes,
        });
    }
}

impl Actor for ParticipantSession {
    type Context = ws::WebsocketContext<Self>;

    /// Take a seat in the room before reading anything from the socket.
    fn started(&mut self, ctx: &mut Self::Context) {
        let connection = ConnectionHandle::new(ctx.address());
        let connection_id = connection.id();
        let connect = Connect {
            participant_id: self.participant_id.clone(),
            connection,
        };
        ctx.wait(self.room_addr.send(connect).into_actor(self).map(
            move |res, act, ctx| match res {
                Ok(Ok(())) => {
                    act.connection_id = Some(connection_id);
                    info!("[ParticipantSession] {} connected to {}", act.participant_id, act.room_code);
                }
                Ok(Err(e)) => {
                    ctx.text(ws_error_message(&e.to_string()));
                    ctx.close(Some(ws::CloseReason {
                        code: ws::CloseCode::Policy,
                        description: Some(e.code().into()),
                    }));
                    ctx.stop();
                }
                Err(e) => {
                    error!("[ParticipantSession] Room {} unreachable: {}", act.room_code, e);
                    ctx.text(ws_error_message("Room is no longer available"));
                    ctx.close(Some(ws::CloseReason {
                        code: ws::CloseCode::Error,
                        description: Some("Room unavailable".into()),
                    }));
                    ctx.stop();
                }
            },
        ));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(connection_id) = self.connection_id.take() {
            self.room_addr.do_send(Disconnect {
                participant_id: self.participant_id.clone(),
                connection_id,
            });
        }
        info!("[ParticipantSession] {} left {}", self.participant_id, self.room_code);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ParticipantSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                let received = Instant::now();
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => self.handle_client_message(client_msg, received, text.len(), ctx),
                    Err(e) => {
                        // Protocol error: drop this message, keep the connection.
                        warn!("[ParticipantSession] Invalid message from {}: {}", self.participant_id, e);
                    }
                }
            }
            Ok(ws::Message::Ping(payload)) => ctx.pong(&payload),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Binary(_)) => {
                debug!("[ParticipantSession] Ignoring binary message from {}", self.participant_id);
            }
            Ok(_) => (),
            Err(e) => {
                warn!("[ParticipantSession] Protocol error from {}: {}", self.participant_id, e);
                ctx.stop();
            }
        }
    }
}

impl Handler<ServerMessage> for ParticipantSession {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(text) => ctx.text(text),
            Err(e) => {
                error!("[ParticipantSession] Failed to serialize ServerMessage: {}", e);
                ctx.text(ws_error_message("Internal server error"));
            }
        }
    }
}

impl Handler<CloseSession> for ParticipantSession {
    type Result = ();

    fn handle(&mut self, msg: CloseSession, ctx: &mut Self::Context) {
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Normal,
            description: Some(msg.reason),
        }));
        ctx.stop();
    }
}

impl Connection for Addr<ParticipantSession> {
    fn deliver(&self, message: ServerMessage) {
        self.do_send(message);
    }

    fn close(&self, reason: &str) {
        self.do_send(CloseSession { reason: reason.to_string() });
    }
}

/// WebSocket endpoint for a participant joining a room: `/ws/{room_id}/{player_id}`.
pub async fn ws_room(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<(RoomCode, ParticipantId)>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (room_code, participant_id) = path.into_inner();
    if participant_id.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().body("Missing player id"));
    }

    let room_addr = match data
        .room_manager
        .send(GetRoom { code: room_code.clone() })
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?
    {
        Ok(addr) => addr,
        Err(e) => return Ok(room_error_response(&e)),
    };

    ws::start(
        ParticipantSession::new(
            room_code,
            participant_id,
            room_addr,
            data.classifier.clone(),
            data.recorder.clone(),
        ),
        &req,
        stream,
    )
}
