mod config;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use dashmap::DashMap;
use futures_util::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use coyote_core::{
    Action, ActionResult, Actor, ClientMessage, PlayerId, PlayerSummary, ServerMessage, SessionKey,
    SessionRegistry,
};

use crate::config::ServerConfig;

// 服务器全局状态
struct AppState {
    // 游戏会话，由引擎管理
    registry: SessionRegistry,
    // 每个社区的在线连接，与会话的生命周期无关
    channels: DashMap<SessionKey, Arc<Channel>>,
}

// 单个社区频道
struct Channel {
    // 将 PlayerId 映射到具体的网络连接
    connections: RwLock<HashMap<PlayerId, PlayerConnection>>,
}

// 玩家的网络连接信息
struct PlayerConnection {
    // 用于向该玩家的 WebSocket 任务发送消息的通道
    sender: mpsc::Sender<ServerMessage>,
}

type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    info!(?config, "配置已加载");

    let state = SharedState::new(AppState {
        registry: SessionRegistry::new(config.engine.clone()),
        channels: DashMap::new(),
    });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法监听 {}: {}", config.addr, e);
            return;
        }
    };
    info!("服务器正在监听 {}", config.addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("服务器异常退出: {}", e);
    }
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 单个连接：一个写任务负责下行，当前任务读取上行请求直到对端关闭
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (ws_tx, mut ws_rx) = socket.split();

    // 本连接的收件箱。Sender 会被登记到频道里，广播和私信都投递到这里
    let (tx, rx) = mpsc::channel::<ServerMessage>(32);
    tokio::spawn(forward_outbox(rx, ws_tx));

    // 进入频道前为 None
    let mut context: Option<(SessionKey, Actor)> = None;

    while let Some(Ok(frame)) = ws_rx.next().await {
        let Message::Text(text) = frame else { continue };
        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(client_msg) => handle_client_message(client_msg, state.clone(), &tx, &mut context).await,
            Err(e) => warn!("无法解析客户端请求: {}", e),
        }
    }

    // 连接关闭后从频道注销；会话本身不受影响
    if let Some((session, actor)) = context {
        handle_disconnect(state, session, actor.id).await;
    }
    info!("连接已关闭");
}

/// 把收件箱里的消息编码为 JSON 文本帧写回客户端。
/// 频道里的 Sender 全部释放后收件箱关闭，任务随之结束；写失败同样结束。
async fn forward_outbox(
    mut outbox: mpsc::Receiver<ServerMessage>,
    mut ws_tx: SplitSink<WebSocket, Message>,
) {
    while let Some(msg) = outbox.recv().await {
        let payload = match serde_json::to_string(&msg) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("无法编码下行消息: {}", e);
                continue;
            }
        };
        if ws_tx.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
    }
}

/// 核心消息处理逻辑
async fn handle_client_message(
    msg: ClientMessage,
    state: SharedState,
    tx: &mpsc::Sender<ServerMessage>,
    context: &mut Option<(SessionKey, Actor)>,
) {
    match msg {
        ClientMessage::Enter { session, nickname } => {
            if context.is_some() {
                let _ = tx.send(ServerMessage::Error { message: "你已经在一个频道里了".to_string() }).await;
                return;
            }

            let player_id = Uuid::new_v4();
            let channel = state
                .channels
                .entry(session.clone())
                .or_insert_with(|| Arc::new(Channel { connections: RwLock::new(HashMap::new()) }))
                .clone();
            channel.connections.write().await.insert(player_id, PlayerConnection { sender: tx.clone() });

            info!("玩家 {} ({}) 进入了频道 {}", player_id, nickname, session);
            *context = Some((session.clone(), Actor::new(player_id, nickname)));
            let _ = tx.send(ServerMessage::Welcome { your_id: player_id, session }).await;
        }
        ClientMessage::Act(action) => {
            let Some((session, actor)) = context.as_ref() else {
                let _ = tx.send(ServerMessage::Error { message: "请先进入一个频道".to_string() }).await;
                return;
            };
            let is_launch = matches!(action, Action::Launch { .. });

            // 同一会话上的动作由引擎内部的会话锁串行执行
            match state.registry.handle(session, actor, action) {
                Ok(result) => {
                    if is_launch || matches!(result, ActionResult::Reset) {
                        info!("频道 {} 的会话由 {} 执行了 {:?}", session, actor.id, result);
                    }
                    let private = result.is_private();
                    let msg = ServerMessage::Event { actor: actor_summary(actor), result };
                    if private {
                        // 查询和看牌只回复给本人
                        let _ = tx.send(msg).await;
                    } else {
                        broadcast(&state, session, &msg).await;
                    }
                }
                Err(e) => {
                    let _ = tx.send(ServerMessage::from(e)).await;
                }
            }
        }
    }
}

fn actor_summary(actor: &Actor) -> PlayerSummary {
    PlayerSummary { id: actor.id, name: actor.name.clone() }
}

/// 玩家断开连接后的处理。
/// 只移除连接，游戏会话保留，直到被重置或自然结束。
async fn handle_disconnect(state: SharedState, session: SessionKey, player_id: PlayerId) {
    info!("玩家 {} 从频道 {} 断开连接", player_id, session);
    let channel = match state.channels.get(&session) {
        None => return,
        Some(c) => c.clone(),
    };

    let mut connections = channel.connections.write().await;
    connections.remove(&player_id);
    if connections.is_empty() {
        // 只移除仍是同一个的频道
        state.channels.remove_if(&session, |_, c| Arc::ptr_eq(c, &channel));
        info!("频道 {} 已空，已被移除", session);
    }
}

/// 向频道内所有连接广播消息
async fn broadcast(state: &SharedState, session: &SessionKey, message: &ServerMessage) {
    let channel = match state.channels.get(session) {
        None => return,
        Some(c) => c.clone(),
    };
    for (player_id, conn) in channel.connections.read().await.iter() {
        if conn.sender.send(message.clone()).await.is_err() {
            // 发送失败，说明该玩家也断开了，后续由其自己的 handle_socket 任务处理
            warn!("向玩家 {} 发送消息失败（可能已断开）", player_id);
        }
    }
}
