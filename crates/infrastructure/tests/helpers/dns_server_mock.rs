use dohgate_infrastructure::dns::transport::tcp::{read_with_length_prefix, send_with_length_prefix};
use hickory_proto::op::{Message, MessageType, OpCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record, RecordType};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;

pub const MOCK_ANSWER: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

#[derive(Clone, Default)]
pub struct MockBehavior {
    /// Queries for this name (FQDN form) are answered after the delay.
    pub delayed: Option<(String, Duration)>,
    /// UDP answers come back empty with TC set; TCP answers are complete.
    pub truncate_udp: bool,
    /// Never answers anything.
    pub silent: bool,
}

/// Plain DNS upstream on 127.0.0.1, UDP and TCP on the same port.
pub struct MockDnsServer {
    addr: SocketAddr,
    udp_queries: Arc<AtomicUsize>,
    tcp_queries: Arc<AtomicUsize>,
    tasks: Vec<JoinHandle<()>>,
}

impl MockDnsServer {
    pub async fn start(behavior: MockBehavior) -> std::io::Result<Self> {
        let udp = Arc::new(UdpSocket::bind("127.0.0.1:0").await?);
        let addr = udp.local_addr()?;
        let tcp = TcpListener::bind(addr).await?;

        let udp_queries = Arc::new(AtomicUsize::new(0));
        let tcp_queries = Arc::new(AtomicUsize::new(0));

        let udp_task = {
            let behavior = behavior.clone();
            let counter = udp_queries.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                while let Ok((len, peer)) = udp.recv_from(&mut buf).await {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let packet = buf[..len].to_vec();
                    let udp = udp.clone();
                    let behavior = behavior.clone();
                    tokio::spawn(async move {
                        if let Some(reply) = respond(&behavior, &packet, true).await {
                            let _ = udp.send_to(&reply, peer).await;
                        }
                    });
                }
            })
        };

        let tcp_task = {
            let counter = tcp_queries.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = tcp.accept().await {
                    let behavior = behavior.clone();
                    let counter = counter.clone();
                    tokio::spawn(serve_tcp(stream, behavior, counter));
                }
            })
        };

        Ok(Self {
            addr,
            udp_queries,
            tcp_queries,
            tasks: vec![udp_task, tcp_task],
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, scheme: &str) -> String {
        format!("{}://{}", scheme, self.addr)
    }

    pub fn udp_queries(&self) -> usize {
        self.udp_queries.load(Ordering::SeqCst)
    }

    pub fn tcp_queries(&self) -> usize {
        self.tcp_queries.load(Ordering::SeqCst)
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn serve_tcp(mut stream: TcpStream, behavior: MockBehavior, counter: Arc<AtomicUsize>) {
    while let Ok(packet) = read_with_length_prefix(&mut stream).await {
        counter.fetch_add(1, Ordering::SeqCst);
        let Some(reply) = respond(&behavior, &packet, false).await else {
            continue;
        };
        if send_with_length_prefix(&mut stream, &reply).await.is_err() {
            break;
        }
    }
}

async fn respond(behavior: &MockBehavior, packet: &[u8], over_udp: bool) -> Option<Vec<u8>> {
    if behavior.silent {
        return None;
    }
    let query = Message::from_vec(packet).ok()?;
    let name = query.queries().first()?.name().to_string();

    if let Some((slow_name, delay)) = &behavior.delayed {
        if *slow_name == name {
            tokio::time::sleep(*delay).await;
        }
    }

    let mut answer = answer_for(&query, MOCK_ANSWER);
    if over_udp && behavior.truncate_udp {
        answer.take_answers();
        answer.set_truncated(true);
    }
    answer.to_vec().ok()
}

/// Response echoing `query` with one A record per A question.
pub fn answer_for(query: &Message, addr: Ipv4Addr) -> Message {
    let mut answer = Message::new();
    answer
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true)
        .add_queries(query.queries().iter().cloned());

    for q in query.queries() {
        if q.query_type() == RecordType::A {
            answer.add_answer(Record::from_rdata(q.name().clone(), 60, RData::A(A(addr))));
        }
    }
    answer
}
