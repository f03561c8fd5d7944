//! HTTP order intake and WebSocket subscriptions, over axum.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use fixbridge_core::{
    ClientId, ClientOrderId, Order, OrderKind, OrderType, Side, TimeInForce,
};
use fixbridge_store::{DynOrderStore, OrderStore};
use fixbridge_telemetry::Metrics;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::hub::Hub;
use crate::identity;
use crate::notice::ReportNotice;

/// Shared state for the axum handlers.
#[derive(Clone)]
pub struct ApiState {
    orders: DynOrderStore,
    hub: Arc<Hub>,
}

impl ApiState {
    pub fn new(orders: DynOrderStore, hub: Arc<Hub>) -> Self {
        Self { orders, hub }
    }
}

/// Body of `POST /api/orders/new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Decimal,
    pub order_type: OrderType,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub security_id: String,
    #[serde(default)]
    pub destination: String,
}

/// Body of `POST /api/orders/replace`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceOrderRequest {
    pub client_order_id: String,
    pub orig_client_order_id: String,
    #[serde(default)]
    pub venue_order_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Decimal,
    pub order_type: OrderType,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    #[serde(default)]
    pub security_id: String,
    #[serde(default)]
    pub destination: String,
}

/// Body of `POST /api/orders/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub client_order_id: String,
    #[serde(default)]
    pub orig_client_order_id: Option<String>,
    #[serde(default)]
    pub venue_order_id: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub market_id: Option<String>,
    #[serde(default)]
    pub market_segment_id: Option<String>,
}

/// Response to an accepted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAccepted {
    pub id: i64,
    pub client_order_id: String,
}

/// Builds the pending row for a new-order request.
fn order_from_new(req: NewOrderRequest, client: ClientId) -> Order {
    Order {
        id: 0,
        client_order_id: ClientOrderId::from_string(req.client_order_id),
        kind: OrderKind::New,
        client,
        symbol: req.symbol,
        side: Some(req.side),
        quantity: req.quantity,
        price: req.price,
        order_type: Some(req.order_type),
        time_in_force: Some(req.time_in_force),
        account: req.account,
        currency: req.currency,
        security_id: req.security_id,
        destination: req.destination,
        orig_client_order_id: None,
        venue_order_id: None,
        market_id: None,
        market_segment_id: None,
        pending: true,
        created_at: Utc::now(),
        dispatched_at: None,
    }
}

fn order_from_replace(req: ReplaceOrderRequest, client: ClientId) -> Order {
    Order {
        id: 0,
        client_order_id: ClientOrderId::from_string(req.client_order_id),
        kind: OrderKind::Replace,
        client,
        symbol: req.symbol,
        side: Some(req.side),
        quantity: req.quantity,
        price: req.price,
        order_type: Some(req.order_type),
        time_in_force: Some(req.time_in_force),
        account: String::new(),
        currency: String::new(),
        security_id: req.security_id,
        destination: req.destination,
        orig_client_order_id: Some(ClientOrderId::from_string(req.orig_client_order_id)),
        venue_order_id: req.venue_order_id,
        market_id: None,
        market_segment_id: None,
        pending: true,
        created_at: Utc::now(),
        dispatched_at: None,
    }
}

/// Cancels carry linkage only; payload fields stay at their neutral values.
fn order_from_cancel(req: CancelOrderRequest, client: ClientId) -> Order {
    Order {
        id: 0,
        client_order_id: ClientOrderId::from_string(req.client_order_id),
        kind: OrderKind::Cancel,
        client,
        symbol: req.symbol,
        side: None,
        quantity: Decimal::ZERO,
        price: Decimal::ZERO,
        order_type: None,
        time_in_force: None,
        account: String::new(),
        currency: String::new(),
        security_id: String::new(),
        destination: String::new(),
        orig_client_order_id: req.orig_client_order_id.map(ClientOrderId::from_string),
        venue_order_id: req.venue_order_id,
        market_id: req.market_id,
        market_segment_id: req.market_segment_id,
        pending: true,
        created_at: Utc::now(),
        dispatched_at: None,
    }
}

/// Creates the axum router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/orders/new", post(submit_new))
        .route("/api/orders/replace", post(submit_replace))
        .route("/api/orders/cancel", post(submit_cancel))
        .route("/ws", get(ws_handler))
        .route("/metrics", get(serve_metrics))
        .with_state(state)
}

async fn submit_new(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<NewOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let client = identity::resolve_client(&headers)?;
    accept_order(&state, order_from_new(req, client)).await
}

async fn submit_replace(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<ReplaceOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let client = identity::resolve_client(&headers)?;
    accept_order(&state, order_from_replace(req, client)).await
}

async fn submit_cancel(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<CancelOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let client = identity::resolve_client(&headers)?;
    accept_order(&state, order_from_cancel(req, client)).await
}

/// Validates and inserts one pending row; the dispatch scheduler picks it
/// up from here.
async fn accept_order(state: &ApiState, order: Order) -> ApiResult<impl IntoResponse> {
    order.validate()?;
    let stored = state.orders.insert(order).await?;
    Metrics::order_accepted(&stored.kind.to_string());
    info!(
        id = stored.id,
        client_order_id = %stored.client_order_id,
        kind = %stored.kind,
        client = %stored.client,
        "Order accepted"
    );
    Ok((
        StatusCode::CREATED,
        Json(OrderAccepted {
            id: stored.id,
            client_order_id: stored.client_order_id.to_string(),
        }),
    ))
}

/// WebSocket upgrade. The credential can come from the Authorization header
/// or, for browser clients that cannot set headers on upgrades, a `token`
/// query parameter.
async fn ws_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let resolved = if headers.contains_key(header::AUTHORIZATION) {
        identity::resolve_client(&headers)
    } else {
        match params.get("token") {
            Some(token) => identity::client_from_token(token),
            None => Err(ApiError::Unauthorized(
                "missing Authorization header or token parameter".to_string(),
            )),
        }
    };

    match resolved {
        Ok(client) => ws.on_upgrade(move |socket| handle_subscriber(socket, state, client)),
        Err(e) => e.into_response(),
    }
}

/// One subscriber's connection lifecycle: join the identity's group, send
/// the subscription acknowledgment, forward notices until disconnect, then
/// leave the group.
async fn handle_subscriber(socket: WebSocket, state: ApiState, client: ClientId) {
    let mut subscription = state.hub.subscribe(&client);
    Metrics::subscriber_connected();
    info!(%client, subscribers = state.hub.subscriber_count(), "Subscriber connected");

    let (mut sender, mut receiver) = socket.split();

    let ack = ReportNotice::subscribed(client.as_str());
    match serde_json::to_string(&ack) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!(%client, "Subscriber went away before the ack");
                finish_subscriber(&state, &client, subscription);
                return;
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to serialize subscription ack");
            finish_subscriber(&state, &client, subscription);
            return;
        }
    }

    // Drain the client side for close frames; everything else is ignored.
    let mut incoming = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            result = subscription.broadcast.recv() => {
                if !forward(&mut sender, result, &client).await {
                    break;
                }
            }
            result = subscription.group.recv() => {
                if !forward(&mut sender, result, &client).await {
                    break;
                }
            }
            _ = &mut incoming => {
                debug!(%client, "Client closed the connection");
                break;
            }
        }
    }

    incoming.abort();
    finish_subscriber(&state, &client, subscription);
    info!(%client, "Subscriber disconnected");
}

/// Forwards one received notice. Returns false when the connection is done.
async fn forward(
    sender: &mut (impl SinkExt<Message> + Unpin),
    result: Result<String, broadcast::error::RecvError>,
    client: &ClientId,
) -> bool {
    match result {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            // Slow subscriber: skip the missed notices and keep going.
            warn!(%client, skipped, "Subscriber lagged, notices skipped");
            true
        }
        Err(broadcast::error::RecvError::Closed) => false,
    }
}

fn finish_subscriber(state: &ApiState, client: &ClientId, subscription: crate::GroupSubscription) {
    drop(subscription);
    state.hub.leave(client);
    Metrics::subscriber_disconnected();
}

/// Prometheus text exposition.
async fn serve_metrics() -> Response {
    match Metrics::gather() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Metrics gathering failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Binds and serves until the shutdown token fires.
pub async fn run_server(
    state: ApiState,
    config: ApiConfig,
    shutdown: CancellationToken,
) -> ApiResult<()> {
    let router = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(port = config.port, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("API server stopped");
    Ok(())
}
