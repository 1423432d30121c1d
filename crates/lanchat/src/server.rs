//! `ChatServer` builder and the single-threaded reactor loop.
//!
//! One task owns every socket, the registry, and the outbound queue. Each
//! call to [`ChatServer::tick`] runs the same five phases:
//!
//! ```text
//! accept    wait up to accept_timeout for one new connection
//! multiplex sample read/write readiness of every connection, zero wait
//! read      one bounded read per readable connection, decode it
//! dispatch  route each decoded frame, send immediate replies
//! drain     deliver every queued chat message, then the queue is empty
//! ```
//!
//! No phase blocks on a single connection, so a slow or broken peer never
//! holds up the others, and nothing needs a lock.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use lanchat_protocol::{ChatMessage, Codec, JsonCodec, ProtocolError, ProtocolMessage};
use lanchat_registry::{
    Delivery, OutboundQueue, Registry, RegistryOp, plan_delivery, route,
    route_fault,
};
use lanchat_transport::{
    ConnectionId, Port, Readiness, ServerConnection, ServerRole, TryRecv,
};

use crate::LanchatError;

/// How long the accept phase waits before moving on.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_millis(500);

/// Listen backlog for the server socket.
pub const DEFAULT_BACKLOG: u32 = 128;

/// Builder for configuring and starting a lanchat server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), lanchat::LanchatError> {
/// use lanchat::prelude::*;
///
/// let server = ChatServerBuilder::new()
///     .listen_on("0.0.0.0".parse().unwrap(), Port::DEFAULT)
///     .build()?;
/// server.run().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChatServerBuilder {
    bind_addr: SocketAddr,
    accept_timeout: Duration,
    backlog: u32,
}

impl ChatServerBuilder {
    /// Creates a builder listening on every interface at [`Port::DEFAULT`].
    pub fn new() -> Self {
        Self {
            bind_addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                Port::DEFAULT.get(),
            ),
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
            backlog: DEFAULT_BACKLOG,
        }
    }

    /// Listens on `address` at an already-validated `port`.
    pub fn listen_on(mut self, address: IpAddr, port: Port) -> Self {
        self.bind_addr = SocketAddr::new(address, port.get());
        self
    }

    /// Binds to a raw socket address. Port `0` picks an ephemeral port,
    /// which is what tests use.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Upper bound on how long one tick waits for a new connection.
    pub fn accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Length of the kernel's pending-connection queue for the listening
    /// socket. Defaults to [`DEFAULT_BACKLOG`].
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Binds the listening socket. Must be called inside a Tokio runtime.
    pub fn build(self) -> Result<ChatServer, LanchatError> {
        let role = ServerRole::bind(self.bind_addr, self.backlog)?;
        Ok(ChatServer {
            role,
            connections: HashMap::new(),
            registry: Registry::new(),
            queue: OutboundQueue::new(),
            codec: JsonCodec,
            accept_timeout: self.accept_timeout,
            ticks: 0,
        })
    }
}

impl Default for ChatServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened during one tick. Used for logging and by tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// Connections accepted.
    pub accepted: usize,
    /// Frames read and routed.
    pub frames: usize,
    /// Immediate replies sent.
    pub replies: usize,
    /// Chat messages delivered.
    pub delivered: usize,
    /// Chat messages discarded because nobody holds the destination name.
    pub discarded: usize,
    /// Chat messages lost to a destination that could not be written.
    pub delivery_faults: usize,
    /// Connections removed for any reason.
    pub dropped: usize,
}

impl TickReport {
    /// `true` if nothing at all happened.
    pub fn is_idle(&self) -> bool {
        self.accepted == 0
            && self.frames == 0
            && self.delivered == 0
            && self.discarded == 0
            && self.delivery_faults == 0
            && self.dropped == 0
    }
}

/// A running lanchat server.
pub struct ChatServer {
    role: ServerRole,
    /// Every open connection: the set the reactor multiplexes on.
    connections: HashMap<ConnectionId, ServerConnection>,
    registry: Registry,
    queue: OutboundQueue,
    codec: JsonCodec,
    accept_timeout: Duration,
    ticks: u64,
}

impl ChatServer {
    /// Creates a new builder.
    pub fn builder() -> ChatServerBuilder {
        ChatServerBuilder::new()
    }

    /// Binds at `addr` with the default accept timeout and backlog.
    pub fn bind(addr: SocketAddr) -> Result<Self, LanchatError> {
        ChatServerBuilder::new().bind(addr).build()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.role.local_addr()
    }

    /// The participant registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of open connections, registered or not.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Runs the reactor until the process is terminated.
    pub async fn run(mut self) {
        tracing::info!("lanchat server running");
        loop {
            self.tick().await;
        }
    }

    /// Runs the reactor until `shutdown` completes, then closes every
    /// connection.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!("lanchat server running");
        tokio::pin!(shutdown);
        loop {
            // The only await inside a tick is the accept phase, and
            // accepting is cancel safe. A cancelled tick leaves the queue
            // empty because the previous tick drained it.
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.tick() => {}
            }
        }
        self.shutdown();
    }

    /// Runs one reactor tick.
    pub async fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };

        self.accept_phase(&mut report).await;
        let readiness = self.multiplex_phase();
        let inbound = self.read_phase(&readiness, &mut report);
        self.dispatch_phase(inbound, &mut report);

        let writable: HashSet<ConnectionId> = readiness
            .iter()
            .filter(|(_, r)| r.writable)
            .map(|(id, _)| *id)
            .collect();
        self.drain_phase(&writable, &mut report);

        if !report.is_idle() {
            tracing::debug!(?report, "tick complete");
        }
        report
    }

    async fn accept_phase(&mut self, report: &mut TickReport) {
        match self.role.accept_within(self.accept_timeout).await {
            Ok(Some(conn)) => {
                tracing::info!(
                    conn_id = %conn.id(),
                    peer = %conn.peer_addr(),
                    "connection accepted"
                );
                self.connections.insert(conn.id(), conn);
                report.accepted += 1;
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "accept failed"),
        }
    }

    fn multiplex_phase(&self) -> HashMap<ConnectionId, Readiness> {
        self.connections
            .iter()
            .map(|(id, conn)| (*id, conn.poll_readiness()))
            .collect()
    }

    fn read_phase(
        &mut self,
        readiness: &HashMap<ConnectionId, Readiness>,
        report: &mut TickReport,
    ) -> Vec<(ConnectionId, Result<ProtocolMessage, ProtocolError>)> {
        let mut readable: Vec<ConnectionId> = readiness
            .iter()
            .filter(|(_, r)| r.readable)
            .map(|(id, _)| *id)
            .collect();
        // Accept order, so a tick's outcome does not depend on hashing.
        readable.sort();

        let mut inbound = Vec::with_capacity(readable.len());
        for id in readable {
            let Some(conn) = self.connections.get(&id) else {
                continue;
            };
            match conn.try_recv() {
                Ok(TryRecv::Frame(bytes)) => {
                    report.frames += 1;
                    inbound.push((id, self.codec.decode(&bytes)));
                }
                Ok(TryRecv::Pending) => {}
                Ok(TryRecv::Closed) => {
                    self.drop_connection(id, "peer closed", report);
                }
                Err(e) => {
                    tracing::debug!(conn_id = %id, error = %e, "read failed");
                    self.drop_connection(id, "read error", report);
                }
            }
        }
        inbound
    }

    fn dispatch_phase(
        &mut self,
        inbound: Vec<(ConnectionId, Result<ProtocolMessage, ProtocolError>)>,
        report: &mut TickReport,
    ) {
        for (origin, decoded) in inbound {
            let decision = match decoded {
                Ok(message) => {
                    tracing::debug!(conn_id = %origin, %message, "frame received");
                    route(&self.registry, origin, message)
                }
                Err(e) => route_fault(origin, &e),
            };

            if let Some(reply) = &decision.reply {
                if let Err(e) = self.send_to(origin, reply) {
                    tracing::info!(conn_id = %origin, error = %e, "reply failed");
                    self.drop_connection(origin, "reply failed", report);
                    continue;
                }
                report.replies += 1;
            }

            match decision.op {
                RegistryOp::Register { name } => {
                    if let Err(e) = self.registry.register(&name, origin) {
                        tracing::warn!(conn_id = %origin, error = %e, "register failed");
                    }
                }
                RegistryOp::Enqueue(chat) => {
                    tracing::debug!(from = %chat.from, to = %chat.to, "chat queued");
                    self.queue.push(chat);
                }
                RegistryOp::Unregister { name } => {
                    if let Err(e) = self.registry.unregister(&name, origin) {
                        tracing::warn!(conn_id = %origin, error = %e, "unregister failed");
                    }
                    self.drop_connection(origin, "exit", report);
                }
                RegistryOp::Drop => {
                    self.drop_connection(origin, "rejected", report);
                }
                RegistryOp::Keep => {}
            }
        }
    }

    fn drain_phase(
        &mut self,
        writable: &HashSet<ConnectionId>,
        report: &mut TickReport,
    ) {
        let pending: Vec<ChatMessage> = self.queue.drain().collect();
        for chat in pending {
            match plan_delivery(&chat, &self.registry, writable) {
                Delivery::Deliver(conn_id) => {
                    let from = chat.from.clone();
                    let to = chat.to.clone();
                    match self.send_to(conn_id, &ProtocolMessage::Chat(chat)) {
                        Ok(()) => {
                            tracing::info!(%from, %to, "message delivered");
                            report.delivered += 1;
                        }
                        Err(e) => {
                            tracing::info!(%from, %to, error = %e, "delivery failed, connection lost");
                            report.delivery_faults += 1;
                            self.drop_connection(conn_id, "delivery failed", report);
                        }
                    }
                }
                Delivery::NotWritable(conn_id) => {
                    tracing::info!(
                        from = %chat.from,
                        to = %chat.to,
                        "destination not writable, message dropped and connection lost"
                    );
                    report.delivery_faults += 1;
                    self.drop_connection(conn_id, "not writable", report);
                }
                Delivery::UnknownDestination => {
                    tracing::error!(
                        from = %chat.from,
                        to = %chat.to,
                        "destination is not registered, message discarded"
                    );
                    report.discarded += 1;
                }
            }
        }
    }

    fn send_to(
        &self,
        conn_id: ConnectionId,
        message: &ProtocolMessage,
    ) -> Result<(), LanchatError> {
        let conn = self.connections.get(&conn_id).ok_or_else(|| {
            lanchat_transport::TransportError::ConnectionClosed(conn_id.to_string())
        })?;
        let frame = self.codec.encode(message)?;
        conn.try_send(&frame)?;
        Ok(())
    }

    /// Removes a connection from the registry and from the multiplexed
    /// set, and releases its socket. Both removals always happen together.
    fn drop_connection(
        &mut self,
        conn_id: ConnectionId,
        reason: &str,
        report: &mut TickReport,
    ) {
        let name = self.registry.remove_connection(conn_id);
        if let Some(conn) = self.connections.remove(&conn_id) {
            tracing::info!(
                %conn_id,
                peer = %conn.peer_addr(),
                name = name.as_deref().unwrap_or("-"),
                reason,
                "connection dropped"
            );
            conn.close();
            report.dropped += 1;
        }
    }

    fn shutdown(&mut self) {
        let count = self.connections.len();
        for (conn_id, conn) in self.connections.drain() {
            self.registry.remove_connection(conn_id);
            conn.close();
        }
        tracing::info!(connections = count, "lanchat server stopped");
    }
}
