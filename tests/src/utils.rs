//! A tiny PTR responder on loopback for exercising the real UDP resolver.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use rdns_core::report::ResultReporter;
use rdns_core::resolver::UdpResolver;
use rdns_core::resolver::conf::ResolverConf;
use rdns_core::scheduler::{QueryScheduler, RunSummary};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
pub enum Reply {
    Names(Vec<String>),
    Rcode(u8),
    /// Never answer.
    Silence,
    /// Answer with bytes that only carry the right transaction id.
    Garbage,
    /// A reply under a foreign transaction id, followed by the real answer.
    StrayThenNames(Vec<String>),
    /// `NOERROR` with the TC bit set and no answers.
    Truncated,
}

pub struct Responder {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Drop for Responder {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_responder<F>(behaviour: F) -> Responder
where
    F: Fn(Ipv4Addr) -> Reply + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let query = &buf[..len];
            let Some((target, question_end)) = parse_question(query) else {
                continue;
            };

            let replies: Vec<Vec<u8>> = match behaviour(target) {
                Reply::Names(names) => vec![build_reply(query, question_end, 0, &names)],
                Reply::Rcode(rcode) => vec![build_reply(query, question_end, rcode, &[])],
                Reply::Silence => Vec::new(),
                Reply::Garbage => vec![vec![query[0], query[1], 0xFF]],
                Reply::Truncated => {
                    let mut reply = build_reply(query, question_end, 0, &[]);
                    reply[2] |= 0x02;
                    vec![reply]
                }
                Reply::StrayThenNames(names) => {
                    let mut stray = build_reply(query, question_end, 0, &["stray.example".into()]);
                    stray[1] = stray[1].wrapping_add(1);
                    vec![stray, build_reply(query, question_end, 0, &names)]
                }
            };
            for reply in replies {
                let _ = socket.send_to(&reply, peer).await;
            }
        }
    });

    Responder { addr, handle }
}

/// Address asked about and the offset just past the question section.
fn parse_question(query: &[u8]) -> Option<(Ipv4Addr, usize)> {
    let mut labels: Vec<String> = Vec::new();
    let mut cursor: usize = 12;
    loop {
        let len = *query.get(cursor)? as usize;
        cursor += 1;
        if len == 0 {
            break;
        }
        let label = query.get(cursor..cursor + len)?;
        labels.push(String::from_utf8(label.to_vec()).ok()?);
        cursor += len;
    }

    let [d, c, b, a, ..] = labels.as_slice() else {
        return None;
    };
    let addr = Ipv4Addr::new(a.parse().ok()?, b.parse().ok()?, c.parse().ok()?, d.parse().ok()?);
    Some((addr, cursor + 4))
}

fn build_reply(query: &[u8], question_end: usize, rcode: u8, names: &[String]) -> Vec<u8> {
    let mut out = query[..question_end].to_vec();
    out[2] |= 0x80;
    out[3] = 0x80 | rcode;
    out[6..8].copy_from_slice(&(names.len() as u16).to_be_bytes());
    out[8..12].fill(0);

    for name in names {
        let mut rdata: Vec<u8> = Vec::new();
        for label in name.split('.') {
            rdata.push(label.len() as u8);
            rdata.extend_from_slice(label.as_bytes());
        }
        rdata.push(0);

        out.extend_from_slice(&[0xC0, 0x0C]);
        out.extend_from_slice(&12u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&300u32.to_be_bytes());
        out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(&rdata);
    }
    out
}

pub fn conf_for(servers: &[&Responder]) -> ResolverConf {
    let mut conf = ResolverConf::new();
    conf.servers = servers.iter().map(|responder| responder.addr).collect();
    conf.timeout = Duration::from_millis(50);
    conf.attempts = 1;
    conf
}

/// Runs the whole pipeline and returns the summary plus the printed lines.
pub async fn resolve_all<I>(conf: ResolverConf, addresses: I, max_in_flight: usize) -> (RunSummary, Vec<String>)
where
    I: IntoIterator<Item = Ipv4Addr>,
{
    let resolver = UdpResolver::bind(conf).await.unwrap();
    let mut scheduler = QueryScheduler::new(resolver, ResultReporter::new(Vec::new()), max_in_flight);
    let summary = scheduler.run(addresses).await.unwrap();

    let (_, reporter) = scheduler.into_parts();
    let out = String::from_utf8(reporter.into_inner()).unwrap();
    let mut lines: Vec<String> = out.lines().map(str::to_string).collect();
    lines.sort();
    (summary, lines)
}
