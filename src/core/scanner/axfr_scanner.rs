// src/core/scanner/axfr_scanner.rs

use crate::core::deadline::with_timeout;
use crate::core::error::ProbeError;
use crate::core::models::{ProbeResult, Target};
use crate::core::scanner::dns_scanner::is_no_records;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_resolver::proto::rr::{Name, RData, RecordType};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Stops reading a transfer that never ends.
const MAX_TRANSFER_RECORDS: usize = 10_000;
const AXFR_MESSAGE_ID: u16 = 0x4158;

/// Tries a zone transfer against every authoritative nameserver.
///
/// Refusals and per-server errors are the normal case and mean "not enabled";
/// only a failed NS lookup is an error.
pub async fn run_zone_transfer_scan(resolver: &TokioAsyncResolver, target: &Target, limit: Duration) -> ProbeResult {
    let zone = Name::from_ascii(format!("{}.", target)).map_err(|e| ProbeError::InvalidTarget(e.to_string()))?;
    let nameservers = lookup_nameservers(resolver, &zone).await?;
    info!(target = %target, nameservers = nameservers.len(), "Attempting zone transfers.");

    for nameserver in nameservers {
        let addr = match resolver.lookup_ip(nameserver.clone()).await {
            Ok(lookup) => match lookup.iter().next() {
                Some(ip) => SocketAddr::new(ip, 53),
                None => continue,
            },
            Err(e) => {
                warn!(%nameserver, error = %e, "Could not resolve nameserver.");
                continue;
            }
        };

        match with_timeout(limit, attempt_axfr(addr, &zone)).await {
            Ok(records) if !records.is_empty() => {
                info!(%nameserver, records = records.len(), "Zone transfer allowed.");
                return Ok(Some(format!(
                    "Zone transfer is enabled on nameserver {}:\n{}",
                    nameserver,
                    records.join("\n")
                )));
            }
            Ok(_) => debug!(%nameserver, "Zone transfer refused."),
            Err(e) => debug!(%nameserver, error = %e, "Zone transfer failed."),
        }
    }
    Ok(None)
}

async fn lookup_nameservers(resolver: &TokioAsyncResolver, zone: &Name) -> Result<Vec<Name>, ProbeError> {
    match resolver.lookup(zone.clone(), RecordType::NS).await {
        Ok(lookup) => Ok(lookup
            .iter()
            .filter_map(|rdata| match rdata {
                RData::NS(ns) => Some(ns.0.clone()),
                _ => None,
            })
            .collect()),
        Err(e) if is_no_records(&e) => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Sends one AXFR query over TCP and reads the answer stream.
///
/// The transfer is complete when the closing SOA arrives. A non-zero response
/// code, or a server that hangs up before sending anything, yields no records.
pub async fn attempt_axfr(addr: SocketAddr, zone: &Name) -> Result<Vec<String>, ProbeError> {
    let mut query = Message::new();
    query
        .set_id(AXFR_MESSAGE_ID)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(false)
        .add_query(Query::query(zone.clone(), RecordType::AXFR));
    let wire = query.to_vec().map_err(|e| ProbeError::Malformed(e.to_string()))?;
    let length = u16::try_from(wire.len()).map_err(|_| ProbeError::Malformed("query too large".to_string()))?;

    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(&wire).await?;

    let mut records = Vec::new();
    let mut soa_seen = 0;
    loop {
        let size = match stream.read_u16().await {
            Ok(size) => size,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        let mut buf = vec![0u8; usize::from(size)];
        stream.read_exact(&mut buf).await?;
        let response = Message::from_vec(&buf).map_err(|e| ProbeError::Malformed(e.to_string()))?;

        if response.response_code() != ResponseCode::NoError {
            debug!(%addr, code = %response.response_code(), "Transfer rejected.");
            return Ok(Vec::new());
        }
        if response.answers().is_empty() {
            break;
        }

        for record in response.answers() {
            if record.record_type() == RecordType::SOA {
                soa_seen += 1;
            }
            records.push(record.to_string());
        }
        if soa_seen >= 2 || records.len() >= MAX_TRANSFER_RECORDS {
            break;
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_resolver::proto::rr::Record;
    use hickory_resolver::proto::rr::rdata::{A, SOA};
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    fn zone() -> Name {
        Name::from_ascii("example.test.").unwrap()
    }

    fn soa() -> Record {
        let rdata = SOA::new(
            Name::from_ascii("ns1.example.test.").unwrap(),
            Name::from_ascii("admin.example.test.").unwrap(),
            1,
            3600,
            600,
            86400,
            300,
        );
        Record::from_rdata(zone(), 300, RData::SOA(rdata))
    }

    /// Serves exactly one AXFR request with the given code and answers.
    async fn fake_server(code: ResponseCode, answers: Vec<Record>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let size = socket.read_u16().await.unwrap();
            let mut buf = vec![0u8; size as usize];
            socket.read_exact(&mut buf).await.unwrap();
            let request = Message::from_vec(&buf).unwrap();
            assert_eq!(request.queries()[0].query_type(), RecordType::AXFR);

            let mut response = Message::new();
            response
                .set_id(request.id())
                .set_message_type(MessageType::Response)
                .set_op_code(OpCode::Query)
                .set_response_code(code)
                .add_query(request.queries()[0].clone())
                .add_answers(answers);
            let wire = response.to_vec().unwrap();
            socket.write_all(&(wire.len() as u16).to_be_bytes()).await.unwrap();
            socket.write_all(&wire).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn open_server_returns_the_zone() {
        let host = Record::from_rdata(
            Name::from_ascii("www.example.test.").unwrap(),
            300,
            RData::A(A(Ipv4Addr::new(192, 0, 2, 10))),
        );
        let addr = fake_server(ResponseCode::NoError, vec![soa(), host, soa()]).await;

        let records = attempt_axfr(addr, &zone()).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().any(|r| r.contains("192.0.2.10")));
    }

    #[tokio::test]
    async fn refused_transfer_yields_nothing() {
        let addr = fake_server(ResponseCode::Refused, Vec::new()).await;
        assert!(attempt_axfr(addr, &zone()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hang_up_without_answer_yields_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let size = socket.read_u16().await.unwrap();
            let mut buf = vec![0u8; size as usize];
            socket.read_exact(&mut buf).await.unwrap();
            drop(socket);
        });
        assert!(attempt_axfr(addr, &zone()).await.unwrap().is_empty());
    }
}
