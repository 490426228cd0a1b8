//! 이산 사건 시뮬레이터
//!
//! 스케줄러 역할: 이벤트 큐를 시간 순으로 꺼내 [`Endpoints`] 콜백을 하나씩
//! 끝까지 실행한다. 시뮬레이션 시계는 여기서만 소유한다.
//!
//! | 이벤트           | 대상 | 설명                                   |
//! |------------------|------|----------------------------------------|
//! | FromApplication  | A    | 평균 `avg_msg_interval` 간격 메시지    |
//! | FromChannel      | A/B  | 채널 통과 후 패킷 도착                 |
//! | TimerInterrupt   | A    | 재전송 타이머 만료                     |
//!
//! 채널은 재정렬하지 않는다: 같은 방향의 도착 시각은 항상 증가한다.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::channel::ChannelModel;
use crate::link::{EntityId, Link};
use crate::packet::{Message, Packet, Payload};
use crate::protocol::Endpoints;
use crate::sender::SubmitOutcome;
use crate::stats::{ChannelStats, TransferStats};
use crate::{Config, Result};

/// 채널 최소 전파 지연 (틱)
const MIN_DELAY: f64 = 1.0;

/// 채널 지연 변동 폭 (틱)
const DELAY_SPREAD: f64 = 9.0;

#[derive(Debug, Clone)]
enum EventKind {
    FromApplication,
    FromChannel(Packet),
    TimerInterrupt { generation: u64 },
}

#[derive(Debug, Clone)]
struct Event {
    time: f64,
    order: u64,
    entity: EntityId,
    kind: EventKind,
}

// BinaryHeap은 최대 힙이므로 역순 비교 (이른 시각, 먼저 등록된 순)
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

/// 엔티티에게 보이는 세계: 채널, 타이머, 애플리케이션 싱크, 시계
struct Network {
    clock: f64,
    queue: BinaryHeap<Event>,
    next_order: u64,
    rng: StdRng,
    model: ChannelModel,
    stats: ChannelStats,

    /// 방향별 마지막 도착 예정 시각 (도착 엔티티 기준)
    last_arrival: [f64; 2],

    /// 엔티티별 실행 중인 타이머 세대
    timers: [Option<u64>; 2],
    timer_generation: u64,

    delivered: Vec<Payload>,
}

impl Network {
    fn new(config: &Config) -> Self {
        Self {
            clock: 0.0,
            queue: BinaryHeap::new(),
            next_order: 0,
            rng: StdRng::seed_from_u64(config.seed),
            model: ChannelModel::from_config(config),
            stats: ChannelStats::default(),
            last_arrival: [0.0; 2],
            timers: [None; 2],
            timer_generation: 0,
            delivered: Vec::new(),
        }
    }

    fn schedule(&mut self, time: f64, entity: EntityId, kind: EventKind) {
        self.queue.push(Event {
            time,
            order: self.next_order,
            entity,
            kind,
        });
        self.next_order += 1;
    }
}

impl Link for Network {
    fn send_to_channel(&mut self, from: EntityId, packet: Packet) {
        let to = from.peer();
        let transit = self.model.transmit(&mut self.rng, packet, &mut self.stats);

        let Some(packet) = transit.into_packet() else {
            debug!("channel: packet from {} lost", from);
            return;
        };

        let earliest = self.last_arrival[to.index()].max(self.clock);
        let arrival = earliest + MIN_DELAY + DELAY_SPREAD * self.rng.gen::<f64>();
        self.last_arrival[to.index()] = arrival;
        self.schedule(arrival, to, EventKind::FromChannel(packet));
    }

    fn deliver_to_application(&mut self, at: EntityId, payload: Payload) {
        debug!("layer5 at {}: {:?}", at, String::from_utf8_lossy(&payload));
        self.delivered.push(payload);
    }

    fn start_timer(&mut self, entity: EntityId, duration: f64) {
        if self.timers[entity.index()].is_some() {
            warn!("{}: timer started while already running, replacing it", entity);
        }
        self.timer_generation += 1;
        let generation = self.timer_generation;
        self.timers[entity.index()] = Some(generation);
        self.schedule(
            self.clock + duration,
            entity,
            EventKind::TimerInterrupt { generation },
        );
    }

    fn stop_timer(&mut self, entity: EntityId) {
        if self.timers[entity.index()].take().is_none() {
            warn!("{}: unable to cancel timer, it wasn't running", entity);
        }
    }

    fn now(&self) -> f64 {
        self.clock
    }
}

/// 시뮬레이션 결과
#[derive(Debug, Clone)]
pub struct SimReport {
    pub stats: TransferStats,

    /// 송신자가 받아들인 메시지 (윈도우 초과로 버려진 것 제외)
    pub accepted: Vec<Message>,

    /// 수신 측 애플리케이션에 전달된 페이로드 (전달 순서)
    pub delivered: Vec<Payload>,

    pub final_time: f64,
}

impl SimReport {
    /// 전달된 페이로드가 받아들인 메시지의 앞부분과 순서까지 일치하는지
    pub fn delivered_in_order(&self) -> bool {
        self.delivered.len() <= self.accepted.len()
            && self
                .delivered
                .iter()
                .zip(&self.accepted)
                .all(|(payload, message)| payload == &message.data)
    }

    /// 받아들인 메시지가 모두 전달되었는지
    pub fn is_complete(&self) -> bool {
        self.delivered.len() == self.accepted.len() && self.delivered_in_order()
    }
}

/// 이산 사건 시뮬레이터
pub struct Simulator {
    config: Config,
    endpoints: Endpoints,
    net: Network,
    generated: usize,
    accepted: Vec<Message>,
    last_message_at: f64,
}

impl Simulator {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            net: Network::new(&config),
            config,
            endpoints: Endpoints::new(),
            generated: 0,
            accepted: Vec::new(),
            last_message_at: 0.0,
        })
    }

    /// i번째 애플리케이션 메시지 (`'a' + i % 26` 반복)
    pub fn message_for(index: usize) -> Message {
        Message::filled(b'a' + (index % 26) as u8)
    }

    /// 시뮬레이션 실행
    pub fn run(mut self) -> SimReport {
        info!(
            "simulation start: messages={}, loss={}, corrupt={}, interval={}",
            self.config.messages,
            self.config.loss_prob,
            self.config.corrupt_prob,
            self.config.avg_msg_interval
        );

        self.endpoints.init(EntityId::A);
        self.endpoints.init(EntityId::B);
        if self.config.messages > 0 {
            self.schedule_next_message();
        }

        while let Some(event) = self.net.queue.pop() {
            if self.generated >= self.config.messages
                && event.time > self.last_message_at + self.config.drain_ticks
            {
                debug!("drain window elapsed at {:.1}", event.time);
                break;
            }
            self.net.clock = event.time;
            self.dispatch(event);
        }

        let report = self.report();
        info!("simulation finished: {}", report.stats.summary());
        report
    }

    fn dispatch(&mut self, event: Event) {
        match event.kind {
            EventKind::FromApplication => {
                let message = Self::message_for(self.generated);
                self.generated += 1;
                self.last_message_at = self.net.clock;

                match self
                    .endpoints
                    .on_application_send(event.entity, &message, &mut self.net)
                {
                    Ok(SubmitOutcome::Sent { .. }) => self.accepted.push(message),
                    Ok(SubmitOutcome::WindowFull) => {}
                    Err(e) => warn!("application send rejected: {}", e),
                }

                if self.generated < self.config.messages {
                    self.schedule_next_message();
                }
            }
            EventKind::FromChannel(packet) => {
                self.endpoints
                    .on_channel_packet(event.entity, &packet, &mut self.net);
            }
            EventKind::TimerInterrupt { generation } => {
                let slot = &mut self.net.timers[event.entity.index()];
                if *slot != Some(generation) {
                    // 정지되었거나 교체된 타이머
                    return;
                }
                *slot = None;
                if let Err(e) = self.endpoints.on_timer_fired(event.entity, &mut self.net) {
                    warn!("timer interrupt ignored: {}", e);
                }
            }
        }
    }

    fn schedule_next_message(&mut self) {
        let gap = self.config.avg_msg_interval * 2.0 * self.net.rng.gen::<f64>();
        let time = self.net.clock + gap;
        self.net
            .schedule(time, EntityId::A, EventKind::FromApplication);
    }

    fn report(self) -> SimReport {
        let stats = TransferStats {
            sender: self.endpoints.sender().stats(),
            receiver: self.endpoints.receiver().stats(),
            channel: self.net.stats,
            elapsed: self.net.clock,
        };
        SimReport {
            stats,
            accepted: self.accepted,
            delivered: self.net.delivered,
            final_time: self.net.clock,
        }
    }
}
