//! UDP 노드 모드
//!
//! 엔티티 하나가 tokio 태스크 하나를 소유한다. 태스크는 소켓 수신, 명령,
//! 타이머 마감을 `select!`로 기다리고 콜백을 하나씩 끝까지 실행하므로
//! 엔티티 상태에 락이 필요 없다. 밖으로는 통계 스냅샷만 공유한다.
//!
//! 패킷은 bincode로 인코딩된 고정 32바이트 [`Packet`]. 나가는 패킷은
//! [`ChannelModel`]을 거쳐 손실/손상을 주입할 수 있다.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::channel::ChannelModel;
use crate::link::{EntityId, Link};
use crate::packet::{Message, Packet, Payload, PACKET_WIRE_LEN};
use crate::receiver::Receiver;
use crate::sender::{Sender, SubmitOutcome};
use crate::stats::{ChannelStats, ReceiverStats, SenderStats};
use crate::{Config, Error, Result};

/// 수신 버퍼 크기 (잘못된 길이의 데이터그램도 받아서 버리기 위해 여유를 둠)
const RECV_BUFFER: usize = 2048;

/// 전달된 페이로드 큐 용량
const DELIVERY_QUEUE: usize = 1024;

/// 노드 태스크가 엔티티에 제공하는 [`Link`]
///
/// 콜백 동안 나가는 패킷과 전달 페이로드를 모아 두었다가 콜백이 끝나면
/// 한꺼번에 내보낸다. 타이머는 마감 시각 하나로 표현된다.
struct NodeLink {
    entity: EntityId,
    started: Instant,
    tick: Duration,
    outbox: Vec<Packet>,
    delivered: Vec<Payload>,
    deadline: Option<Instant>,
    model: ChannelModel,
    rng: StdRng,
    channel_stats: ChannelStats,
}

impl NodeLink {
    fn new(entity: EntityId, config: &Config) -> Self {
        // 엔티티별 시드
        let seed = config.seed.wrapping_add(entity.index() as u64);
        Self {
            entity,
            started: Instant::now(),
            tick: Duration::from_millis(config.tick_ms),
            outbox: Vec::new(),
            delivered: Vec::new(),
            deadline: None,
            model: ChannelModel::from_config(config),
            rng: StdRng::seed_from_u64(seed),
            channel_stats: ChannelStats::default(),
        }
    }

    /// 모아 둔 패킷을 채널 모델을 거쳐 소켓으로 전송
    ///
    /// 전송 실패는 채널 손실로 취급한다 (재전송으로 복구).
    async fn flush(&mut self, socket: &UdpSocket, peer: SocketAddr) {
        for packet in std::mem::take(&mut self.outbox) {
            let Some(packet) = self
                .model
                .transmit(&mut self.rng, packet, &mut self.channel_stats)
                .into_packet()
            else {
                debug!("{}: packet dropped by fault injection", self.entity);
                continue;
            };
            let bytes = match packet.to_bytes() {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("{}: 직렬화 에러: {}", self.entity, e);
                    continue;
                }
            };
            if let Err(e) = socket.send_to(&bytes, peer).await {
                warn!("{}: 전송 에러 ({}): {}", self.entity, peer, e);
            }
        }
    }
}

impl Link for NodeLink {
    fn send_to_channel(&mut self, _from: EntityId, packet: Packet) {
        self.outbox.push(packet);
    }

    fn deliver_to_application(&mut self, _at: EntityId, payload: Payload) {
        self.delivered.push(payload);
    }

    fn start_timer(&mut self, entity: EntityId, duration: f64) {
        if self.deadline.is_some() {
            warn!("{}: timer started while already running, replacing it", entity);
        }
        self.deadline = Some(Instant::now() + self.tick.mul_f64(duration));
    }

    fn stop_timer(&mut self, entity: EntityId) {
        if self.deadline.take().is_none() {
            warn!("{}: unable to cancel timer, it wasn't running", entity);
        }
    }

    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64() / self.tick.as_secs_f64()
    }
}

/// 마감 시각까지 대기 (없으면 영원히)
async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// 수신한 데이터그램을 패킷으로 복원
fn decode(entity: EntityId, bytes: &[u8]) -> Option<Packet> {
    match Packet::from_bytes(bytes) {
        Ok(packet) => Some(packet),
        Err(e) => {
            warn!("{}: malformed datagram ignored: {}", entity, e);
            None
        }
    }
}

enum Command {
    Submit(Message, oneshot::Sender<SubmitOutcome>),
}

/// 송신 노드 (엔티티 A)
pub struct SenderNode {
    local_addr: SocketAddr,
    commands: mpsc::Sender<Command>,
    in_flight: Arc<AtomicUsize>,
    stats: Arc<RwLock<SenderStats>>,
    channel_stats: Arc<RwLock<ChannelStats>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<()>>>,
}

impl SenderNode {
    /// 노드 태스크 시작
    ///
    /// `socket`은 이미 바인딩된 소켓, `peer`는 수신 노드 주소
    pub fn start(config: &Config, socket: UdpSocket, peer: SocketAddr) -> Result<Self> {
        config.validate()?;
        let local_addr = socket.local_addr()?;

        let (commands, command_rx) = mpsc::channel(64);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let stats = Arc::new(RwLock::new(SenderStats::default()));
        let channel_stats = Arc::new(RwLock::new(ChannelStats::default()));

        let task = tokio::spawn(run_sender(
            SenderTask {
                socket,
                peer,
                link: NodeLink::new(EntityId::A, config),
                sender: Sender::new(),
                in_flight: in_flight.clone(),
                stats: stats.clone(),
                channel_stats: channel_stats.clone(),
            },
            command_rx,
            shutdown_rx,
        ));

        info!("sender node A started on {} -> {}", local_addr, peer);

        Ok(Self {
            local_addr,
            commands,
            in_flight,
            stats,
            channel_stats,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    /// 애플리케이션 메시지 제출
    pub async fn submit(&self, message: Message) -> Result<SubmitOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Submit(message, reply))
            .await
            .map_err(|_| Error::ConnectionClosed)?;
        outcome.await.map_err(|_| Error::ConnectionClosed)
    }

    /// 확인 대기 중인 패킷 수
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SenderStats {
        *self.stats.read()
    }

    pub fn channel_stats(&self) -> ChannelStats {
        *self.channel_stats.read()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 태스크 종료 후 대기
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.task.take() {
            Some(task) => task.await.map_err(|_| Error::ChannelError)?,
            None => Ok(()),
        }
    }
}

struct SenderTask {
    socket: UdpSocket,
    peer: SocketAddr,
    link: NodeLink,
    sender: Sender,
    in_flight: Arc<AtomicUsize>,
    stats: Arc<RwLock<SenderStats>>,
    channel_stats: Arc<RwLock<ChannelStats>>,
}

impl SenderTask {
    async fn publish(&mut self) {
        self.link.flush(&self.socket, self.peer).await;
        self.in_flight.store(self.sender.in_flight(), Ordering::Release);
        *self.stats.write() = self.sender.stats();
        *self.channel_stats.write() = self.link.channel_stats;
    }
}

async fn run_sender(
    mut task: SenderTask,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<()> {
    let mut buf = vec![0u8; RECV_BUFFER];

    loop {
        let deadline = task.link.deadline;
        tokio::select! {
            _ = &mut shutdown => break,
            command = commands.recv() => {
                let Some(Command::Submit(message, reply)) = command else {
                    break;
                };
                let outcome = task.sender.submit(&message, &mut task.link);
                task.publish().await;
                let _ = reply.send(outcome);
            }
            result = task.socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, _)) => {
                        if let Some(packet) = decode(EntityId::A, &buf[..len]) {
                            task.sender.on_ack(&packet, &mut task.link);
                            task.publish().await;
                        }
                    }
                    Err(e) => warn!("A: 수신 에러: {}", e),
                }
            }
            _ = wait_deadline(deadline) => {
                task.link.deadline = None;
                task.sender.on_timeout(&mut task.link);
                task.publish().await;
            }
        }
    }

    info!("sender node A stopped: {:?}", task.sender.stats());
    Ok(())
}

/// 수신 노드 (엔티티 B)
pub struct ReceiverNode {
    local_addr: SocketAddr,
    stats: Arc<RwLock<ReceiverStats>>,
    channel_stats: Arc<RwLock<ChannelStats>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<()>>>,
}

impl ReceiverNode {
    /// 노드 태스크 시작
    ///
    /// 순서대로 조립된 페이로드는 반환되는 채널로 전달된다. ACK는 마지막으로
    /// 데이터를 보낸 주소로 돌아간다.
    pub fn start(config: &Config, socket: UdpSocket) -> Result<(Self, mpsc::Receiver<Payload>)> {
        config.validate()?;
        let local_addr = socket.local_addr()?;

        let (deliveries, delivery_rx) = mpsc::channel(DELIVERY_QUEUE);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let stats = Arc::new(RwLock::new(ReceiverStats::default()));
        let channel_stats = Arc::new(RwLock::new(ChannelStats::default()));

        let task = tokio::spawn(run_receiver(
            ReceiverTask {
                socket,
                link: NodeLink::new(EntityId::B, config),
                receiver: Receiver::new(),
                deliveries,
                stats: stats.clone(),
                channel_stats: channel_stats.clone(),
            },
            shutdown_rx,
        ));

        info!("receiver node B started on {}", local_addr);

        Ok((
            Self {
                local_addr,
                stats,
                channel_stats,
                shutdown: Some(shutdown),
                task: Some(task),
            },
            delivery_rx,
        ))
    }

    pub fn stats(&self) -> ReceiverStats {
        *self.stats.read()
    }

    /// ACK 경로의 채널 통계
    pub fn channel_stats(&self) -> ChannelStats {
        *self.channel_stats.read()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.task.take() {
            Some(task) => task.await.map_err(|_| Error::ChannelError)?,
            None => Ok(()),
        }
    }
}

struct ReceiverTask {
    socket: UdpSocket,
    link: NodeLink,
    receiver: Receiver,
    deliveries: mpsc::Sender<Payload>,
    stats: Arc<RwLock<ReceiverStats>>,
    channel_stats: Arc<RwLock<ChannelStats>>,
}

impl ReceiverTask {
    async fn publish(&mut self, peer: SocketAddr) {
        self.link.flush(&self.socket, peer).await;
        *self.stats.write() = self.receiver.stats();
        *self.channel_stats.write() = self.link.channel_stats;

        for payload in std::mem::take(&mut self.link.delivered) {
            if self.deliveries.send(payload).await.is_err() {
                debug!("B: delivery channel closed, dropping payload");
            }
        }
    }
}

async fn run_receiver(mut task: ReceiverTask, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
    let mut buf = vec![0u8; RECV_BUFFER];

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = task.socket.recv_from(&mut buf) => {
                let (len, from) = match result {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("B: 수신 에러: {}", e);
                        continue;
                    }
                };
                if len != PACKET_WIRE_LEN {
                    debug!("B: datagram of {} bytes from {}", len, from);
                }
                let Some(packet) = decode(EntityId::B, &buf[..len]) else {
                    continue;
                };

                task.receiver.on_packet(&packet, &mut task.link);
                task.publish(from).await;
            }
        }
    }

    info!("receiver node B stopped: {:?}", task.receiver.stats());
    Ok(())
}
