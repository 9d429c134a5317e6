//! JSON-lines transport: input frames in, session messages out

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::game::session::SessionLink;
use crate::io::protocol::{parse_client_line, ClientMsg, ServerMsg};
use crate::util::rate_limit::InputLimiter;

/// Transport tasks bound to the process's stdin and stdout
pub struct StdioTasks {
    pub reader: JoinHandle<u64>,
    pub writer: JoinHandle<std::io::Result<()>>,
}

/// Wire a session to stdin/stdout
pub fn run_stdio(link: SessionLink, lines_per_second: u32) -> StdioTasks {
    let events = link.subscribe();
    let writer = tokio::spawn(write_messages(events, tokio::io::stdout()));

    let reader = tokio::spawn(async move {
        let limiter = InputLimiter::per_second(lines_per_second);
        let stdin = BufReader::new(tokio::io::stdin());
        read_inputs(stdin, &link, &limiter).await
    });

    StdioTasks { reader, writer }
}

/// Forward input lines to the session until EOF. Returns the number of
/// messages forwarded.
pub async fn read_inputs<R>(reader: R, link: &SessionLink, limiter: &InputLimiter) -> u64
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0u64;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!(session_id = %link.id, "Input source closed");
                break;
            }
            Err(e) => {
                warn!(session_id = %link.id, error = %e, "Input read failed");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if !limiter.check() {
            warn!(session_id = %link.id, "Rate limited input line");
            continue;
        }

        match parse_client_line(line) {
            Ok(msg) => {
                if link.send(msg).await.is_err() {
                    debug!(session_id = %link.id, "Input channel closed");
                    return forwarded;
                }
                forwarded += 1;
            }
            Err(e) => {
                warn!(session_id = %link.id, error = %e, "Failed to parse input line");
                link.publish(ServerMsg::error(e.code(), e.to_string()));
            }
        }
    }

    // Input source gone, end the session
    let _ = link.send(ClientMsg::Quit).await;
    forwarded
}

/// Write session messages as JSON lines until the session ends
pub async fn write_messages<W>(
    mut events: broadcast::Receiver<ServerMsg>,
    mut writer: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match events.recv().await {
            Ok(msg) => {
                let mut json = serde_json::to_vec(&msg)?;
                json.push(b'\n');
                writer.write_all(&json).await?;
                writer.flush().await?;

                if matches!(msg, ServerMsg::SessionEnd { .. }) {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(lagged_count = n, "Display lagged, skipping {} messages", n);
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Event channel closed");
                break;
            }
        }
    }
    Ok(())
}
