//! Server network layer handling UDP communications and the session boundary

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::session::{SessionController, SessionEvent};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, MAX_PARTICIPANTS, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { participant_id: u32 },
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// UDP front end of one game session
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    session: SessionController,
    client_timeout: Duration,
    tasks: Vec<JoinHandle<()>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
    session_tx: mpsc::UnboundedSender<SessionEvent>,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Server {
    pub async fn new(config: &ServerConfig) -> Result<Self> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();
        let (session_tx, session_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(
                config.session.max_participants.clamp(1, MAX_PARTICIPANTS),
            ))),
            session: SessionController::new(&config.session),
            client_timeout: config.client_timeout,
            tasks: Vec::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
            session_tx,
            session_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Sender that can stop the server with `ServerMessage::Shutdown`
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn session(&self) -> SessionController {
        self.session.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&mut self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        self.tasks.push(tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        // Malformed kinds, directions and difficulties stop here
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        self.tasks.push(tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        // Encode once, the snapshot dominates the cost
                        let data = match serialize(&packet) {
                            Ok(data) => data,
                            Err(e) => {
                                error!("Failed to encode broadcast packet: {}", e);
                                continue;
                            }
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = socket.send_to(&data, addr).await {
                                error!("Failed to send to player {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        }));
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&mut self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.client_timeout;

        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(timeout)
                };

                for participant_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { participant_id })
                    {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        }));
    }

    /// Spawns the session's tick driver
    fn spawn_tick_driver(&self) -> JoinHandle<()> {
        let session = self.session.clone();
        let session_tx = self.session_tx.clone();
        tokio::spawn(async move { session.run(session_tx).await })
    }

    async fn send_packet_impl(socket: &UdpSocket, packet: &Packet, addr: SocketAddr) -> Result<()> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<u32>) {
        if let Err(e) = self
            .game_tx
            .send(GameMessage::BroadcastPacket { packet, exclude })
        {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Drops a participant from the session and tells everyone else
    async fn drop_participant(&self, participant_id: u32) {
        self.session.remove_participant(participant_id).await;
        self.broadcast_packet(Packet::Left { participant_id }, Some(participant_id));
    }

    /// Processes incoming packets and forwards them to the session
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Join { client_version } = packet {
            self.handle_join(client_version, addr).await;
            return;
        }

        if !packet.is_client_packet() {
            warn!("Unexpected packet type from {}", addr);
            self.send_packet(
                Packet::ServerError {
                    reason: "Unexpected packet".to_string(),
                },
                addr,
            );
            return;
        }

        let participant_id = {
            let mut clients = self.clients.write().await;
            let id = clients.find_client_by_addr(addr);
            if let Some(id) = id {
                clients.touch(id);
            }
            id
        };

        let Some(participant_id) = participant_id else {
            debug!("Ignoring {:?} from unknown address {}", packet, addr);
            return;
        };

        match packet {
            Packet::Leave => {
                let removed = {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&participant_id)
                };
                if removed {
                    self.drop_participant(participant_id).await;
                }
            }
            Packet::Heartbeat => {}
            Packet::Move { direction } => {
                self.session.apply_direction(participant_id, direction).await;
            }
            Packet::SetDifficulty { difficulty } => {
                info!("Player {} requested {:?}", participant_id, difficulty);
                self.session.set_difficulty(difficulty).await;
            }
            Packet::StartGame => {
                let ids = {
                    let clients = self.clients.read().await;
                    clients.ids()
                };
                info!("Player {} started a game for {:?}", participant_id, ids);
                self.session.start_game(&ids).await;
            }
            _ => {}
        }
    }

    async fn handle_join(&mut self, client_version: u32, addr: SocketAddr) {
        info!("Player joining from {} (version: {})", addr, client_version);

        if client_version != PROTOCOL_VERSION {
            self.send_packet(
                Packet::Rejected {
                    reason: "Protocol version mismatch".to_string(),
                },
                addr,
            );
            return;
        }

        // Remove existing connection if present
        let existing_id = {
            let mut clients = self.clients.write().await;
            let existing = clients.find_client_by_addr(addr);
            if let Some(id) = existing {
                clients.remove_client(&id);
            }
            existing
        };

        if let Some(existing_id) = existing_id {
            info!("Replacing existing player {} from {}", existing_id, addr);
            self.drop_participant(existing_id).await;
        }

        let participant_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(addr)
        };

        match participant_id {
            Some(participant_id) => {
                self.send_packet(Packet::Accepted { participant_id }, addr);
                self.broadcast_packet(Packet::Joined { participant_id }, None);
            }
            None => {
                info!("Rejecting {}: server full", addr);
                self.send_packet(
                    Packet::Rejected {
                        reason: "Server full".to_string(),
                    },
                    addr,
                );
            }
        }
    }

    /// Handles one message for the main loop. Returns false on shutdown.
    async fn handle_message(&mut self, message: Option<ServerMessage>) -> bool {
        match message {
            Some(ServerMessage::PacketReceived { packet, addr }) => {
                self.handle_packet(packet, addr).await;
                true
            }
            Some(ServerMessage::ClientTimeout { participant_id }) => {
                info!("Player {} timed out", participant_id);
                self.drop_participant(participant_id).await;
                true
            }
            Some(ServerMessage::Shutdown) | None => false,
        }
    }

    /// Publishes session output to every participant
    fn handle_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::StateSnapshot(snapshot) => {
                self.broadcast_packet(Packet::State { snapshot }, None);
            }
            SessionEvent::SessionEnded(snapshot) => {
                info!(
                    "Session ended at tick {} with {} survivor(s)",
                    snapshot.tick,
                    snapshot.living_count()
                );
                self.broadcast_packet(Packet::SessionEnded { snapshot }, None);
            }
        }
    }

    /// Stops the tick driver, says goodbye to everyone and frees all slots
    async fn shutdown(&mut self, driver: JoinHandle<()>) {
        info!("Server shutting down");
        self.session.shutdown();
        if let Err(e) = driver.await {
            error!("Tick driver panicked: {}", e);
        }

        let goodbye = Packet::ServerError {
            reason: "Server shutting down".to_string(),
        };
        let dropped = {
            let mut clients = self.clients.write().await;
            clients.clear()
        };
        for (participant_id, addr) in dropped {
            if let Err(e) = Self::send_packet_impl(&self.socket, &goodbye, addr).await {
                warn!("Failed to notify player {}: {}", participant_id, e);
            }
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();
        let driver = self.spawn_tick_driver();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    if !self.handle_message(message).await {
                        break;
                    }
                },
                Some(event) = self.session_rx.recv() => {
                    self.handle_session_event(event);
                },
            }
        }

        self.shutdown(driver).await;
        Ok(())
    }
}
