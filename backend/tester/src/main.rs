use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use protocol::{events::ServerEvent, id::ConnId};
use serde_json::json;
use tokio::{net::TcpStream, time::timeout};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "ws://127.0.0.1:10000/ws")]
    url: String,

    /// Seconds to wait for each server event
    #[arg(long, default_value_t = 5)]
    wait: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let wait = Duration::from_secs(args.wait);

    let (mut first, first_id) = open(&args.url, wait).await?;
    let (mut second, second_id) = open(&args.url, wait).await?;
    println!("Connected: {first_id} and {second_id}");

    send(&mut first, json!({ "event": "find-partner", "data": {} })).await?;
    send(&mut second, json!({ "event": "find-partner" })).await?;

    match (next_event(&mut first, wait).await?, next_event(&mut second, wait).await?) {
        (ServerEvent::PartnerFound { id: a }, ServerEvent::PartnerFound { id: b })
            if a == second_id && b == first_id =>
        {
            println!("Paired {first_id} <-> {second_id}");
        }
        (a, b) => bail!("Expected partner-found on both sides, got {} and {}", a.name(), b.name()),
    }

    let offer = json!({ "type": "offer", "sdp": "v=0" });
    send(
        &mut first,
        json!({ "event": "signal", "data": { "to": second_id, "data": offer } }),
    )
    .await?;

    match next_event(&mut second, wait).await? {
        ServerEvent::Signal { from, data } if from == first_id && data == offer => {
            println!("Signal relayed: {data}");
        }
        other => bail!("Expected relayed signal, got {}", other.name()),
    }

    first.close(None).await?;

    match next_event(&mut second, wait).await? {
        ServerEvent::PartnerDisconnected => println!("Partner disconnect delivered"),
        other => bail!("Expected partner-disconnected, got {}", other.name()),
    }

    println!("All good");
    Ok(())
}

async fn open(url: &str, wait: Duration) -> Result<(Socket, ConnId)> {
    let (mut socket, _) = connect_async(url)
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    match next_event(&mut socket, wait).await? {
        ServerEvent::Connected { id } => Ok((socket, id)),
        other => bail!("Expected connected, got {}", other.name()),
    }
}

async fn send(socket: &mut Socket, frame: serde_json::Value) -> Result<()> {
    socket.send(Message::Text(frame.to_string())).await?;
    Ok(())
}

async fn next_event(socket: &mut Socket, wait: Duration) -> Result<ServerEvent> {
    loop {
        let message = timeout(wait, socket.next())
            .await
            .context("Timed out waiting for server")?
            .context("Server closed the connection")??;

        if let Message::Text(text) = message {
            return Ok(serde_json::from_str(&text)?);
        }
    }
}
