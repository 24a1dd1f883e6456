#![cfg(test)]
use rdns_common::config::Config;
use rdns_common::network::range::AddressRange;
use rdns_common::network::target;
use std::net::Ipv4Addr;

use crate::utils::{Reply, conf_for, resolve_all, spawn_responder};

fn host_name(addr: Ipv4Addr) -> String {
    format!("host-{}.example", addr.octets()[3])
}

/// Every outcome a nameserver can produce for a /29, resolved through the
/// real UDP resolver with fewer slots than addresses.
#[tokio::test]
async fn resolution_mixed_outcomes() {
    let responder = spawn_responder(|addr| match addr.octets()[3] {
        1 => Reply::Names(vec!["one.example".into(), "uno.example".into()]),
        2 => Reply::Rcode(3),
        3 => Reply::Names(Vec::new()),
        4 => Reply::Rcode(2),
        5 => Reply::Silence,
        6 => Reply::Rcode(1),
        _ => Reply::Names(vec![host_name(addr)]),
    })
    .await;

    let range: AddressRange = target::to_range(&["10.1.2.0/29"]).unwrap();
    let (summary, lines) = resolve_all(conf_for(&[&responder]), range.to_iter(None), 3).await;

    assert_eq!(summary.submitted, 8);
    assert_eq!(summary.completed, 8);
    assert_eq!(summary.failed_submissions, 0);
    assert!(summary.peak_in_flight <= 3, "peak was {}", summary.peak_in_flight);

    assert_eq!(
        lines,
        vec![
            "10.1.2.0\thost-0.example",
            "10.1.2.1\tone.example",
            "10.1.2.1\tuno.example",
            "10.1.2.2\tNXDOMAIN",
            "10.1.2.3\tNODATA",
            "10.1.2.4\tTEMPFAIL",
            "10.1.2.5\tTEMPFAIL",
            "10.1.2.6\tBADQUERY",
            "10.1.2.7\thost-7.example",
        ]
    );
}

#[tokio::test]
async fn resolution_skips_excluded_blocks() {
    let responder = spawn_responder(|addr| Reply::Names(vec![host_name(addr)])).await;

    let cfg: Config = Config::build(1, 16, Some("..1."), true).unwrap();
    let range: AddressRange = target::to_range(&["10.1.0.0/22"]).unwrap();
    let (summary, lines) = resolve_all(conf_for(&[&responder]), range.to_iter(cfg.exclusions), cfg.max_in_flight).await;

    assert_eq!(summary.completed, 768);
    assert_eq!(lines.len(), 768);
    assert!(
        !lines.iter().any(|line| line.starts_with("10.1.1.")),
        "excluded block was queried"
    );
    assert!(lines.contains(&"10.1.3.255\thost-255.example".to_string()));
}

#[tokio::test]
async fn resolution_honours_increment() {
    let responder = spawn_responder(|addr| Reply::Names(vec![host_name(addr)])).await;

    let range: AddressRange = target::to_range(&["192.0.2.0", "192.0.2.20"])
        .unwrap()
        .with_increment(7)
        .unwrap();
    let (_, lines) = resolve_all(conf_for(&[&responder]), range.to_iter(None), 2).await;

    assert_eq!(
        lines,
        vec![
            "192.0.2.0\thost-0.example",
            "192.0.2.14\thost-14.example",
            "192.0.2.7\thost-7.example",
        ]
    );
}

#[tokio::test]
async fn resolution_fails_over_to_next_server() {
    let broken = spawn_responder(|_| Reply::Rcode(2)).await;
    let healthy = spawn_responder(|addr| Reply::Names(vec![host_name(addr)])).await;

    let addr = Ipv4Addr::new(198, 51, 100, 9);
    let (summary, lines) = resolve_all(conf_for(&[&broken, &healthy]), [addr], 1).await;

    assert_eq!(summary.completed, 1);
    assert_eq!(lines, vec!["198.51.100.9\thost-9.example"]);
}

#[tokio::test]
async fn resolution_ignores_stray_replies() {
    let responder = spawn_responder(|addr| Reply::StrayThenNames(vec![host_name(addr)])).await;

    let addr = Ipv4Addr::new(198, 51, 100, 33);
    let (_, lines) = resolve_all(conf_for(&[&responder]), [addr], 1).await;

    assert_eq!(lines, vec!["198.51.100.33\thost-33.example"]);
}

#[tokio::test]
async fn resolution_reports_undecodable_reply() {
    let responder = spawn_responder(|_| Reply::Garbage).await;

    let addr = Ipv4Addr::new(198, 51, 100, 77);
    let (_, lines) = resolve_all(conf_for(&[&responder]), [addr], 1).await;

    assert_eq!(lines, vec!["198.51.100.77\tPROTOERR"]);
}

#[tokio::test]
async fn resolution_truncated_reply_is_not_nodata() {
    let responder = spawn_responder(|_| Reply::Truncated).await;

    let addr = Ipv4Addr::new(192, 0, 2, 9);
    let (_, lines) = resolve_all(conf_for(&[&responder]), [addr], 1).await;

    assert_eq!(lines, vec!["192.0.2.9\tTEMPFAIL"]);
}

#[tokio::test]
async fn resolution_truncated_reply_moves_to_next_server() {
    let truncating = spawn_responder(|_| Reply::Truncated).await;
    let healthy = spawn_responder(|addr| Reply::Names(vec![host_name(addr)])).await;

    let addr = Ipv4Addr::new(192, 0, 2, 10);
    let (summary, lines) = resolve_all(conf_for(&[&truncating, &healthy]), [addr], 1).await;

    assert_eq!(summary.completed, 1);
    assert_eq!(lines, vec!["192.0.2.10\thost-10.example"]);
}
