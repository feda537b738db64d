//! chatline — terminal chat client over a realtime WebSocket channel.
//!
//! LIFECYCLE
//! =========
//! 1. Connect → `ChatClient` opens the channel and logs the open.
//! 2. Event loop → each stdin line updates and submits the draft; inbound
//!    `chat_response` events append to the message log and print.
//! 3. stdin EOF or transport close → dispose the connection and exit.
//!
//! The loop is the single mutator of view state: inbound events and input
//! lines are interleaved here and applied in order.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use chatline::client::{ChatClient, ClientError};
use chatline::event::Envelope;
use chatline::view::{ChatView, DEFAULT_LOG_CAPACITY};

#[derive(Parser, Debug)]
#[command(name = "chatline", about = "Terminal chat client over a realtime websocket channel")]
struct Cli {
    /// Chat server endpoint; the channel lives under the fixed `/_chat` path.
    #[arg(long, env = "CHATLINE_BASE_URL", default_value = "http://127.0.0.1:5000")]
    base_url: String,

    /// Message log ring capacity; oldest entries drop first.
    #[arg(long, env = "CHATLINE_CAPACITY", default_value_t = DEFAULT_LOG_CAPACITY)]
    capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut chat = ChatClient::connect(&cli.base_url).await?;
    let mut view = ChatView::with_capacity(cli.capacity);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(text) = line? else {
                    break;
                };
                view.update_draft(&text);
                if let Some(payload) = view.submit_draft(chat.is_connected()) {
                    chat.emit(&Envelope::chat_message(payload))?;
                }
            }
            inbound = chat.next_event() => {
                let Some(event) = inbound else {
                    info!("chat server disconnected");
                    break;
                };
                if let Some(message) = view.apply_inbound(&event) {
                    println!("{message}");
                }
            }
        }
    }

    chat.close();
    Ok(())
}
