//! stdio transport, one JSON intent per line

use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::dispatcher::IntentDispatcher;
use crate::notify::{ChannelNotifier, Notification};
use crate::protocol::RequestHandler;
use wallet_session::WalletSession;

#[derive(Serialize)]
struct NotificationLine<'a> {
    notification: &'a Notification,
}

/// stdio transport for the intent protocol
pub struct StdioTransport {
    handler: RequestHandler,
    notifications: UnboundedReceiver<Notification>,
}

impl StdioTransport {
    /// Create a new stdio transport
    pub fn new(session: Arc<WalletSession>) -> Self {
        let (notifier, notifications) = ChannelNotifier::new();
        let dispatcher = Arc::new(IntentDispatcher::new(session, Arc::new(notifier)));
        Self {
            handler: RequestHandler::new(dispatcher),
            notifications,
        }
    }

    /// Run the stdio transport until stdin closes
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Starting wallet session on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests from `reader`, writing responses and notifications to `writer`
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> Result<(), Box<dyn std::error::Error>>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();

            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let request = line.trim();
            if request.is_empty() {
                continue;
            }

            debug!("Received: {}", request);

            let response = self.handler.handle_json(request).await;
            write_line(&mut writer, &response).await?;

            // toasts raised while handling this request follow its response
            while let Ok(notification) = self.notifications.try_recv() {
                write_line(&mut writer, &NotificationLine { notification: &notification }).await?;
            }
        }

        Ok(())
    }
}

async fn write_line<W, T>(writer: &mut W, message: &T) -> Result<(), Box<dyn std::error::Error>>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = serde_json::to_string(message)?;
    debug!("Sending: {}", line);
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
