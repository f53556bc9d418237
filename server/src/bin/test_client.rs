//! Minimal command-line player for poking at a running server.
//!
//! Connects under the given name, keeps the session alive with heartbeats,
//! and prints every packet the server sends. Lines typed on stdin are sent
//! as moves: `play <card>` (e.g. `play 7♥`) or `draw`. Ctrl+C sends a
//! disconnect before exiting.

use clap::Parser;
use serde_json::Value;
use shared::{encode, ClientPacket, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    server: SocketAddr,

    /// Player name
    name: String,

    /// Seconds between heartbeats
    #[arg(long, default_value_t = 3)]
    heartbeat: u64,
}

async fn send(
    socket: &UdpSocket,
    server: SocketAddr,
    packet: &ClientPacket,
) -> Result<(), Box<dyn std::error::Error>> {
    socket.send_to(&encode(packet)?, server).await?;
    Ok(())
}

fn parse_command(line: &str, name: &str) -> Option<ClientPacket> {
    let mut words = line.split_whitespace();
    match (words.next()?, words.next()) {
        ("play", Some(card)) => Some(ClientPacket::PlayCard {
            player_name: name.to_string(),
            card: card.to_string(),
        }),
        ("draw", None) => Some(ClientPacket::DrawCard {
            player_name: name.to_string(),
        }),
        _ => None,
    }
}

fn print_packet(data: &[u8]) {
    match serde_json::from_slice::<Value>(data) {
        Ok(packet) => {
            let kind = packet["type"].as_str().unwrap_or("?");
            match packet.get("message").and_then(Value::as_str) {
                Some(message) => println!("[{}] {}", kind, message),
                None => println!("[{}] {}", kind, packet),
            }
        }
        Err(e) => println!("Undecodable packet ({}): {}", e, String::from_utf8_lossy(data)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    println!("Connecting to {} as {}", args.server, args.name);
    send(
        &socket,
        args.server,
        &ClientPacket::Connect {
            name: args.name.clone(),
        },
    )
    .await?;

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut heartbeat = interval(Duration::from_secs(args.heartbeat.max(1)));
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                send(&socket, args.server, &ClientPacket::Disconnect { name: args.name.clone() }).await?;
                println!("Disconnected");
                break;
            }

            _ = heartbeat.tick() => {
                send(&socket, args.server, &ClientPacket::Heartbeat { name: args.name.clone() }).await?;
            }

            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, _)) => print_packet(&buf[..len]),
                    Err(e) => println!("Error receiving packet: {}", e),
                }
            }

            line = stdin.next_line() => {
                match line? {
                    Some(line) => match parse_command(&line, &args.name) {
                        Some(packet) => send(&socket, args.server, &packet).await?,
                        None => println!("Commands: play <card> | draw"),
                    },
                    None => {
                        send(&socket, args.server, &ClientPacket::Disconnect { name: args.name.clone() }).await?;
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
