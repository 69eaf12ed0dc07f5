use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use ledger::types::ApprovalReceipt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::AppState;

// Notification types that can be sent to users
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum NotificationType {
    #[serde(rename = "deposit_confirmed")]
    DepositConfirmed { deposit_id: u64, amount: f64 },
    #[serde(rename = "deposit_rejected")]
    DepositRejected { deposit_id: u64, reason: String },
    #[serde(rename = "commission_credited")]
    CommissionCredited {
        deposit_id: u64,
        level: u8,
        amount: f64,
    },
    #[serde(rename = "withdrawal_created")]
    WithdrawalCreated {
        amount: f64,
        fee: f64,
        net_amount: f64,
    },
    #[serde(rename = "connection_established")]
    ConnectionEstablished { user_id: String, message: String },
}

type NotificationSender = broadcast::Sender<NotificationType>;

// Global notification manager, one channel per open connection, grouped by user
pub type NotificationManager = Arc<Mutex<HashMap<String, Vec<NotificationSender>>>>;

// Create a new notification manager
pub fn create_notification_manager() -> NotificationManager {
    Arc::new(Mutex::new(HashMap::new()))
}

// Open a channel for one more connection of `user_id`
pub fn register_connection(
    notification_manager: &NotificationManager,
    user_id: &str,
) -> (NotificationSender, broadcast::Receiver<NotificationType>) {
    let (tx, rx) = broadcast::channel(100);
    if let Ok(mut manager) = notification_manager.lock() {
        manager
            .entry(user_id.to_string())
            .or_default()
            .push(tx.clone());
    }
    (tx, rx)
}

// Drop only the channel of the connection that closed
pub fn unregister_connection(
    notification_manager: &NotificationManager,
    user_id: &str,
    connection: &NotificationSender,
) {
    let Ok(mut manager) = notification_manager.lock() else {
        return;
    };
    if let Some(senders) = manager.get_mut(user_id) {
        senders.retain(|tx| !tx.same_channel(connection));
        if senders.is_empty() {
            manager.remove(user_id);
        }
    }
}

// WebSocket handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket_with_auth(socket, state))
}

// Handle socket with authentication via first message
async fn handle_socket_with_auth(socket: WebSocket, state: AppState) {
    tracing::info!("WebSocket connection established, awaiting authentication");

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Wait for authentication message
    let user_id = match receiver.next().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<AuthMessage>(&text) {
            Ok(auth_msg) => match state.sessions.get_by_session_id(&auth_msg.session_id) {
                Some(account) => {
                    tracing::info!("User {} authenticated via WebSocket", account.user_id);
                    account.user_id
                }
                None => {
                    tracing::warn!("Invalid session ID in WebSocket auth");
                    let failure = NotificationType::ConnectionEstablished {
                        user_id: String::new(),
                        message: "Authentication failed: invalid session ID".to_string(),
                    };
                    let _ = sender
                        .send(Message::Text(
                            serde_json::to_string(&failure).unwrap_or_default().into(),
                        ))
                        .await;
                    return;
                }
            },
            Err(e) => {
                tracing::warn!("Failed to parse WebSocket auth message: {}", e);
                let _ = sender
                    .send(Message::Text(
                        "Authentication failed: invalid message format".into(),
                    ))
                    .await;
                return;
            }
        },
        Some(Ok(Message::Close(_))) | None => {
            tracing::info!("WebSocket connection closed before authentication");
            return;
        }
        Some(Err(e)) => {
            tracing::error!("WebSocket error during authentication: {}", e);
            return;
        }
        _ => {
            tracing::warn!("Unexpected message type during WebSocket authentication");
            return;
        }
    };

    // Continue with authenticated socket handling
    handle_authenticated_socket(sender, receiver, user_id, state).await;
}

// Authentication message structure
#[derive(Debug, Deserialize)]
struct AuthMessage {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn handle_authenticated_socket(
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut receiver: futures_util::stream::SplitStream<WebSocket>,
    user_id: String,
    state: AppState,
) {
    tracing::info!("WebSocket connection established for user {}", user_id);

    let (connection, mut rx) = register_connection(&state.notification_manager, &user_id);

    let connection_msg = NotificationType::ConnectionEstablished {
        user_id: user_id.clone(),
        message: "Successfully connected to notifications".to_string(),
    };

    if let Ok(msg_text) = serde_json::to_string(&connection_msg) {
        if sender.send(Message::Text(msg_text.into())).await.is_err() {
            tracing::warn!("Failed to send connection message to user {}", user_id);
        }
    }

    // Incoming messages are only watched for close/error
    let incoming_user = user_id.clone();
    let mut incoming_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    tracing::debug!("Received message from user {}: {}", incoming_user, text);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("WebSocket connection closed by user {}", incoming_user);
                    break;
                }
                Err(e) => {
                    tracing::error!("WebSocket error for user {}: {}", incoming_user, e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Handle outgoing notifications
    let outgoing_user = user_id.clone();
    let mut outgoing_task = tokio::spawn(async move {
        while let Ok(notification) = rx.recv().await {
            match serde_json::to_string(&notification) {
                Ok(msg_text) => {
                    if sender.send(Message::Text(msg_text.into())).await.is_err() {
                        tracing::warn!("Failed to send notification to user {}", outgoing_user);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to serialize notification for user {}: {}",
                        outgoing_user,
                        e
                    );
                }
            }
        }
    });

    // Wait for either task to complete (websocket connection closed/error, or send to user error)
    tokio::select! {
        _ = &mut incoming_task => {
            tracing::info!("Incoming task completed for user {}", user_id);
        }
        _ = &mut outgoing_task => {
            tracing::info!("Outgoing task completed for user {}", user_id);
        }
    }
    incoming_task.abort();
    outgoing_task.abort();

    unregister_connection(&state.notification_manager, &user_id, &connection);

    tracing::info!("WebSocket connection closed for user {}", user_id);
}

pub fn send_notification_to_user(
    notification_manager: &NotificationManager,
    user_id: &str,
    notification: NotificationType,
) {
    let Ok(manager) = notification_manager.lock() else {
        return;
    };
    for tx in manager.get(user_id).into_iter().flatten() {
        if let Err(e) = tx.send(notification.clone()) {
            tracing::warn!("Failed to send notification to user {}: {}", user_id, e);
        }
    }
}

// Notify the depositor and every upline member that was paid
pub fn send_approval_notifications(
    notification_manager: &NotificationManager,
    receipt: &ApprovalReceipt,
) {
    send_notification_to_user(
        notification_manager,
        &receipt.depositor_id,
        NotificationType::DepositConfirmed {
            deposit_id: receipt.deposit_id,
            amount: receipt.amount,
        },
    );

    for payout in &receipt.payouts {
        send_notification_to_user(
            notification_manager,
            &payout.user_id,
            NotificationType::CommissionCredited {
                deposit_id: receipt.deposit_id,
                level: payout.level,
                amount: payout.amount,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::types::Payout;

    #[test]
    fn test_approval_notifications_reach_connected_users() {
        let manager = create_notification_manager();
        let (_depositor_tx, mut depositor_rx) = register_connection(&manager, "depositor");
        let (_referrer_tx, mut referrer_rx) = register_connection(&manager, "referrer");

        let receipt = ApprovalReceipt {
            deposit_id: 7,
            depositor_id: "depositor".to_string(),
            amount: 100.0,
            payouts: vec![
                Payout {
                    user_id: "referrer".to_string(),
                    level: 1,
                    amount: 7.0,
                },
                // Not connected, silently skipped
                Payout {
                    user_id: "offline".to_string(),
                    level: 2,
                    amount: 2.0,
                },
            ],
        };
        send_approval_notifications(&manager, &receipt);

        assert!(matches!(
            depositor_rx.try_recv().unwrap(),
            NotificationType::DepositConfirmed { deposit_id: 7, .. }
        ));
        assert!(matches!(
            referrer_rx.try_recv().unwrap(),
            NotificationType::CommissionCredited { level: 1, .. }
        ));
    }

    #[test]
    fn test_notification_wire_format() {
        let json = serde_json::to_value(NotificationType::WithdrawalCreated {
            amount: 50.0,
            fee: 10.0,
            net_amount: 40.0,
        })
        .unwrap();
        assert_eq!(json["type"], "withdrawal_created");
        assert_eq!(json["netAmount"], 40.0);
    }

    #[test]
    fn test_closing_old_connection_keeps_newer_one_subscribed() {
        let manager = create_notification_manager();
        let (first, mut first_rx) = register_connection(&manager, "trader");
        let (second, mut second_rx) = register_connection(&manager, "trader");

        send_notification_to_user(
            &manager,
            "trader",
            NotificationType::DepositRejected {
                deposit_id: 3,
                reason: "bad hash".to_string(),
            },
        );
        assert!(first_rx.try_recv().is_ok());
        assert!(second_rx.try_recv().is_ok());

        unregister_connection(&manager, "trader", &first);
        send_notification_to_user(
            &manager,
            "trader",
            NotificationType::WithdrawalCreated {
                amount: 50.0,
                fee: 10.0,
                net_amount: 40.0,
            },
        );
        assert!(matches!(
            second_rx.try_recv().unwrap(),
            NotificationType::WithdrawalCreated { .. }
        ));

        unregister_connection(&manager, "trader", &second);
        assert!(manager.lock().unwrap().get("trader").is_none());
    }
}
