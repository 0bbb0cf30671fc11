//! UDP and TCP dynamic-update listener.
//!
//! Both sockets accept the same traffic: TSIG-signed UPDATE and QUERY
//! messages. Signature checking happens on the raw bytes before any
//! operation runs; unsigned updates are rejected outright.

use crate::tsig::TsigAuth;
use anyhow::Context;
use dnsctl_core::engine::UpdateEngine;
use dnsctl_core::wire;
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::RecordType;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, info, warn};

/// Largest UDP datagram the listener will accept.
const MAX_UDP_MESSAGE: usize = 4096;

/// A bound pair of UDP and TCP DNS endpoints.
pub struct Listener {
    engine: Arc<UpdateEngine>,
    tsig: Arc<TsigAuth>,
    udp: Arc<UdpSocket>,
    tcp: TcpListener,
}

impl Listener {
    /// Bind both sockets on `addr`. Port 0 picks free ports, which the
    /// `*_local_addr` accessors expose.
    pub async fn bind(
        engine: UpdateEngine,
        tsig: TsigAuth,
        addr: SocketAddr,
    ) -> anyhow::Result<Self> {
        let udp = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("binding UDP socket on {addr}"))?;
        let tcp = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding TCP listener on {addr}"))?;
        Ok(Self {
            engine: Arc::new(engine),
            tsig: Arc::new(tsig),
            udp: Arc::new(udp),
            tcp,
        })
    }

    pub fn udp_local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.udp.local_addr().context("UDP local address")
    }

    pub fn tcp_local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.tcp.local_addr().context("TCP local address")
    }

    /// Serve both endpoints until one of them fails.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            udp = %self.udp_local_addr()?,
            tcp = %self.tcp_local_addr()?,
            "dynamic update listener running"
        );
        let udp = serve_udp(self.udp, self.engine.clone(), self.tsig.clone());
        let tcp = serve_tcp(self.tcp, self.engine, self.tsig);
        tokio::try_join!(udp, tcp)?;
        Ok(())
    }
}

async fn serve_udp(
    socket: Arc<UdpSocket>,
    engine: Arc<UpdateEngine>,
    tsig: Arc<TsigAuth>,
) -> anyhow::Result<()> {
    let mut buf = vec![0u8; MAX_UDP_MESSAGE];
    loop {
        let (len, peer) = socket.recv_from(&mut buf).await.context("UDP receive")?;
        let bytes = buf[..len].to_vec();
        let socket = socket.clone();
        let engine = engine.clone();
        let tsig = tsig.clone();
        tokio::spawn(async move {
            // malformed datagrams are dropped without a reply
            let message = match Message::from_vec(&bytes) {
                Ok(message) => message,
                Err(err) => {
                    debug!(%peer, %err, "dropping unparseable datagram");
                    return;
                }
            };
            if let Some(response) = handle_message(&engine, &tsig, message, &bytes).await {
                if let Err(err) = socket.send_to(&response, peer).await {
                    warn!(%peer, %err, "sending UDP response failed");
                }
            }
        });
    }
}

async fn serve_tcp(
    listener: TcpListener,
    engine: Arc<UpdateEngine>,
    tsig: Arc<TsigAuth>,
) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await.context("TCP accept")?;
        let engine = engine.clone();
        let tsig = tsig.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_tcp_conn(stream, &engine, &tsig).await {
                debug!(%peer, %err, "TCP connection closed");
            }
        });
    }
}

/// One TCP connection: length-prefixed messages until the peer hangs up.
async fn serve_tcp_conn(
    mut stream: TcpStream,
    engine: &UpdateEngine,
    tsig: &TsigAuth,
) -> anyhow::Result<()> {
    loop {
        let mut len_buf = [0u8; 2];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err).context("reading message length"),
        }
        let len = u16::from_be_bytes(len_buf) as usize;
        let mut bytes = vec![0u8; len];
        stream
            .read_exact(&mut bytes)
            .await
            .context("reading message body")?;

        // a malformed message closes the connection
        let message = match Message::from_vec(&bytes) {
            Ok(message) => message,
            Err(err) => {
                debug!(%err, "closing connection after malformed message");
                return Ok(());
            }
        };

        if let Some(response) = handle_message(engine, tsig, message, &bytes).await {
            let len = u16::try_from(response.len()).context("response too large for TCP")?;
            stream
                .write_all(&len.to_be_bytes())
                .await
                .context("writing response length")?;
            stream
                .write_all(&response)
                .await
                .context("writing response body")?;
        }
    }
}

fn has_tsig(message: &Message) -> bool {
    message
        .signature()
        .iter()
        .chain(message.additionals())
        .any(|record| record.record_type() == RecordType::TSIG)
}

/// Process one decoded message and produce the response bytes, or `None`
/// for traffic that deserves no reply (responses, empty question section).
/// `bytes` is the original wire form the signature was computed over.
async fn handle_message(
    engine: &UpdateEngine,
    tsig: &TsigAuth,
    message: Message,
    bytes: &[u8],
) -> Option<Vec<u8>> {
    if message.message_type() != MessageType::Query {
        return None;
    }
    if message.queries().is_empty() {
        return None;
    }

    let mut reply = Message::new();
    reply
        .set_id(message.id())
        .set_op_code(message.op_code())
        .set_message_type(MessageType::Response)
        .set_recursion_desired(message.recursion_desired())
        .add_queries(message.queries().to_vec());

    if !has_tsig(&message) {
        // Unsigned updates fail authentication; everything else is refused.
        let rcode = if message.op_code() == OpCode::Update {
            ResponseCode::NotAuth
        } else {
            ResponseCode::Refused
        };
        reply.set_response_code(rcode);
        return encode(&reply);
    }

    // only replies to verified requests are re-signed
    if let Err(err) = tsig.verify(bytes) {
        debug!(%err, "rejecting badly signed message");
        reply.set_response_code(ResponseCode::NotAuth);
        return encode(&reply);
    }

    match message.op_code() {
        OpCode::Update => match wire::decode_update(&message) {
            Ok(request) => {
                let outcome = engine.update(&request).await;
                reply.set_response_code(wire::response_code(outcome.rcode));
            }
            Err(err) => {
                debug!(%err, "undecodable update message");
                reply.set_response_code(ResponseCode::FormErr);
            }
        },
        OpCode::Query => {
            if message.queries().len() != 1 {
                reply.set_response_code(ResponseCode::NotImp);
            } else {
                let query = &message.queries()[0];
                let selector = wire::selector(query.query_type());
                let outcome = engine.lookup(&query.name().to_string(), selector).await;
                let answers: Result<Vec<_>, _> =
                    outcome.records.iter().map(wire::record_to_wire).collect();
                match answers {
                    Ok(answers) => {
                        reply.set_response_code(wire::response_code(outcome.rcode));
                        for answer in answers {
                            reply.add_answer(answer);
                        }
                    }
                    Err(err) => {
                        warn!(%err, "cannot encode answer record");
                        reply.set_response_code(ResponseCode::ServFail);
                    }
                }
            }
        }
        _ => {
            reply.set_response_code(ResponseCode::NotImp);
        }
    }

    sign_and_encode(tsig, reply)
}

fn sign_and_encode(tsig: &TsigAuth, mut reply: Message) -> Option<Vec<u8>> {
    if let Err(err) = tsig.sign(&mut reply) {
        warn!(%err, "signing response failed");
        return None;
    }
    encode(&reply)
}

fn encode(reply: &Message) -> Option<Vec<u8>> {
    match reply.to_vec() {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!(%err, "encoding response failed");
            None
        }
    }
}
