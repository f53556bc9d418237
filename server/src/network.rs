//! Server network layer handling UDP communications and intake coordination

use crate::config::ServerConfig;
use crate::dispatcher::{forward, Outgoing};
use crate::error::ServerError;
use crate::liveness::spawn_supervisor;
use crate::world::World;
use log::{debug, error, info, warn};
use shared::{decode_client_packet, encode, ClientPacket, ServerPacket};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Messages sent from the receiver task to the intake loop
#[derive(Debug)]
pub enum NetworkEvent {
    PacketReceived {
        packet: ClientPacket,
        addr: SocketAddr,
    },
    /// A datagram that could not be decoded into a client message.
    Malformed { addr: SocketAddr, reason: String },
}

/// Main server owning the socket, the world and the task channels
pub struct Server {
    socket: Arc<UdpSocket>,
    world: Arc<Mutex<World>>,
    config: ServerConfig,
    cancel_token: CancellationToken,

    // Communication channels
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
    outbound_tx: mpsc::UnboundedSender<Outgoing>,
    outbound_rx: Option<mpsc::UnboundedReceiver<Outgoing>>,
}

impl Server {
    pub async fn bind(addr: SocketAddr, config: ServerConfig) -> Result<Self, ServerError> {
        Self::with_world(addr, World::new(config.clone()), config).await
    }

    /// Binds with a caller-supplied world, e.g. one with a fixed shuffle seed.
    pub async fn with_world(
        addr: SocketAddr,
        world: World,
        config: ServerConfig,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        info!("Server listening on {}", socket.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket: Arc::new(socket),
            world: Arc::new(Mutex::new(world)),
            config,
            cancel_token: CancellationToken::new(),
            event_tx,
            event_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Cancelling this token stops every task and makes [`Server::run`] return.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn world(&self) -> Arc<Mutex<World>> {
        Arc::clone(&self.world)
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_network_receiver(&self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let event_tx = self.event_tx.clone();
        let cancel_token = self.cancel_token.clone();
        let buffer_size = self.config.recv_buffer_size;

        tokio::spawn(async move {
            let mut buffer = vec![0u8; buffer_size];

            loop {
                let received = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    received = socket.recv_from(&mut buffer) => received,
                };

                match received {
                    Ok((len, addr)) => {
                        let event = match decode_client_packet(&buffer[..len]) {
                            Ok(packet) => NetworkEvent::PacketReceived { packet, addr },
                            Err(e) => NetworkEvent::Malformed {
                                addr,
                                reason: e.to_string(),
                            },
                        };
                        if let Err(e) = event_tx.send(event) {
                            error!("Failed to send event to intake loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Spawns task that processes the outgoing packet queue
    fn spawn_network_sender(&mut self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let cancel_token = self.cancel_token.clone();
        let mut outbound_rx = self
            .outbound_rx
            .take()
            .unwrap_or_else(|| mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            loop {
                let outgoing = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    outgoing = outbound_rx.recv() => outgoing,
                };
                let Some(Outgoing { addr, packet }) = outgoing else {
                    break;
                };

                if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                    error!("Failed to send {} to {}: {}", packet.kind(), addr, e);
                }
            }
        })
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &ServerPacket,
        addr: SocketAddr,
    ) -> Result<(), ServerError> {
        let data = encode(packet)?;
        socket.send_to(&data, addr).await?;
        debug!("Sent {} to {}", packet.kind(), addr);
        Ok(())
    }

    /// Applies one decoded message under the world lock
    async fn handle_packet(&self, packet: ClientPacket, addr: SocketAddr) {
        let mut world = self.world.lock().await;
        let outbox = world.dispatch(packet, addr, Instant::now());
        forward(outbox, &self.outbound_tx);
    }

    fn handle_malformed(&self, addr: SocketAddr, reason: String) {
        warn!("Failed to decode datagram from {}: {}", addr, reason);
        let reply = Outgoing::new(
            addr,
            ServerPacket::Unknown {
                message: format!("Unrecognized message: {}", reason),
            },
        );
        forward(vec![reply], &self.outbound_tx);
    }

    /// Main server loop; returns once the cancel token fires
    pub async fn run(mut self) -> Result<(), ServerError> {
        let receiver = self.spawn_network_receiver();
        let sender = self.spawn_network_sender();
        let supervisor = spawn_supervisor(
            Arc::clone(&self.world),
            self.outbound_tx.clone(),
            self.config.sweep_interval,
            self.cancel_token.clone(),
        );

        info!("Server started successfully");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    info!("Server shutting down");
                    break;
                }

                event = self.event_rx.recv() => {
                    match event {
                        Some(NetworkEvent::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(NetworkEvent::Malformed { addr, reason }) => {
                            self.handle_malformed(addr, reason);
                        }
                        None => {
                            warn!("Receiver task stopped");
                            break;
                        }
                    }
                }
            }
        }

        self.cancel_token.cancel();
        for (task, handle) in [("receiver", receiver), ("sender", sender), ("supervisor", supervisor)] {
            if let Err(e) = handle.await {
                error!("{} task failed: {}", task, e);
            }
        }
        Ok(())
    }
}
