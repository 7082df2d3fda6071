#[cfg(test)]
mod conn_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::{mpsc, Mutex};
use util::Conn;

use crate::alert::*;
use crate::cipher_suite::*;
use crate::config::*;
use crate::content::ContentType;
use crate::crypto::signature_hash_algorithm::*;
use crate::crypto::*;
use crate::curve::named_curve::*;
use crate::error::*;
use crate::extension::extension_supported_elliptic_curves::ExtensionSupportedEllipticCurves;
use crate::extension::extension_supported_point_formats::*;
use crate::extension::extension_supported_signature_algorithms::ExtensionSupportedSignatureAlgorithms;
use crate::extension::extension_use_extended_master_secret::ExtensionUseExtendedMasterSecret;
use crate::extension::extension_use_srtp::{ExtensionUseSrtp, SrtpProtectionProfile};
use crate::extension::renegotiation_info::ExtensionRenegotiationInfo;
use crate::extension::Extension;
use crate::flight::Flight;
use crate::fragment_buffer::FragmentBuffer;
use crate::handshake::handshake_header::{HandshakeHeader, HANDSHAKE_HEADER_LENGTH};
use crate::handshake::handshake_message_certificate::HandshakeMessageCertificate;
use crate::handshake::handshake_message_certificate_request::*;
use crate::handshake::handshake_message_certificate_verify::HandshakeMessageCertificateVerify;
use crate::handshake::handshake_message_client_hello::HandshakeMessageClientHello;
use crate::handshake::handshake_message_client_key_exchange::HandshakeMessageClientKeyExchange;
use crate::handshake::handshake_message_finished::HandshakeMessageFinished;
use crate::handshake::handshake_message_hello_verify_request::HandshakeMessageHelloVerifyRequest;
use crate::handshake::handshake_message_server_hello::HandshakeMessageServerHello;
use crate::handshake::handshake_message_server_hello_done::HandshakeMessageServerHelloDone;
use crate::handshake::handshake_message_server_key_exchange::HandshakeMessageServerKeyExchange;
use crate::handshake::handshake_random::HandshakeRandom;
use crate::handshake::*;
use crate::prf::*;
use crate::record_layer::*;
use crate::state::State;

const INBOUND_BUFFER_SIZE: usize = 8192;
const COOKIE_LENGTH: usize = 20;
/// Handshake messages larger than this are fragmented across records.
const MAX_HANDSHAKE_FRAGMENT_LENGTH: usize = 1152;

type CookieHmac = Hmac<Sha256>;

/// DTLSConn is an established (or establishing) DTLS 1.2 connection over
/// a datagram Conn. The handshake runs inside `client`/`server`; after
/// that a pump task decrypts inbound records and `read`/`write` move
/// application data.
pub struct DTLSConn {
    conn: Arc<dyn Conn + Send + Sync>,
    state: Arc<Mutex<State>>,
    incoming_rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    closed: Arc<AtomicBool>,
    pump: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl DTLSConn {
    /// client performs a DTLS handshake in the client role.
    pub async fn client(conn: Arc<dyn Conn + Send + Sync>, config: Config) -> Result<Self> {
        Self::handshake(conn, config, true).await
    }

    /// server performs a DTLS handshake in the server role, including the
    /// stateless cookie exchange.
    pub async fn server(conn: Arc<dyn Conn + Send + Sync>, config: Config) -> Result<Self> {
        Self::handshake(conn, config, false).await
    }

    async fn handshake(
        conn: Arc<dyn Conn + Send + Sync>,
        config: Config,
        is_client: bool,
    ) -> Result<Self> {
        if config.certificates.is_empty() {
            return Err(Error::ErrNoCertificates);
        }

        let timeout = config.handshake_timeout;
        let mut driver = HandshakeDriver::new(Arc::clone(&conn), config, is_client);

        let outcome = tokio::time::timeout(timeout, async {
            if is_client {
                driver.run_client().await
            } else {
                driver.run_server().await
            }
        })
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                driver
                    .send_alert(AlertLevel::Fatal, AlertDescription::HandshakeFailure)
                    .await;
                return Err(err);
            }
            Err(_) => return Err(Error::ErrHandshakeTimeout),
        }

        log::debug!(
            "dtls handshake complete ({}), suite {}",
            if is_client { "client" } else { "server" },
            driver
                .state
                .cipher_suite
                .as_ref()
                .map(|c| c.id().to_string())
                .unwrap_or_default(),
        );

        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        for early in driver.early_application_data.drain(..) {
            let _ = incoming_tx.send(early);
        }

        let state = Arc::new(Mutex::new(driver.state));
        let closed = Arc::new(AtomicBool::new(false));

        let pump = tokio::spawn(run_pump(
            Arc::clone(&conn),
            Arc::clone(&state),
            Arc::clone(&closed),
            driver.final_flight.clone(),
            incoming_tx,
        ));

        Ok(DTLSConn {
            conn,
            state,
            incoming_rx: Mutex::new(incoming_rx),
            closed,
            pump: Mutex::new(Some(pump)),
        })
    }

    /// read awaits the next application-data payload.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut rx = self.incoming_rx.lock().await;
        match rx.recv().await {
            Some(data) => {
                if buf.len() < data.len() {
                    return Err(Error::ErrBufferTooSmall);
                }
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            None => Err(Error::ErrConnClosed),
        }
    }

    /// write sends one application-data record.
    pub async fn write(&self, data: &[u8]) -> Result<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ErrConnClosed);
        }

        let record = {
            let mut state = self.state.lock().await;
            seal_application_data(&mut state, data)?
        };
        self.conn
            .send(&record)
            .await
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(data.len())
    }

    /// export_keying_material per RFC 5705 (no context).
    pub async fn export_keying_material(&self, label: &str, length: usize) -> Result<Vec<u8>> {
        let state = self.state.lock().await;
        state.export_keying_material(label, length)
    }

    pub async fn selected_srtp_protection_profile(&self) -> SrtpProtectionProfile {
        let state = self.state.lock().await;
        state.srtp_protection_profile
    }

    /// The peer's certificate chain (leaf first), raw DER.
    pub async fn peer_certificates(&self) -> Vec<Vec<u8>> {
        let state = self.state.lock().await;
        state.peer_certificates.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// close sends close_notify and stops the pump.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let record = {
            let mut state = self.state.lock().await;
            let alert = Alert {
                alert_level: AlertLevel::Warning,
                alert_description: AlertDescription::CloseNotify,
            };
            seal_record(&mut state, ContentType::Alert, &alert.marshal())
        };
        if let Ok(record) = record {
            let _ = self.conn.send(&record).await;
        }

        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }
        Ok(())
    }
}

/// Seals one record at the current epoch, consuming a sequence number.
fn seal_record(state: &mut State, content_type: ContentType, payload: &[u8]) -> Result<Vec<u8>> {
    let epoch = state.local_epoch;
    let seq = state.local_sequence_number[epoch as usize];
    if seq > MAX_SEQUENCE_NUMBER {
        return Err(Error::ErrSequenceNumberOverflow);
    }
    state.local_sequence_number[epoch as usize] += 1;

    let header = RecordLayerHeader {
        content_type,
        protocol_version: PROTOCOL_VERSION1_2,
        epoch,
        sequence_number: seq,
        content_len: payload.len() as u16,
    };
    let mut record = header.marshal()?;
    record.extend_from_slice(payload);

    if epoch > 0 {
        let Some(cipher_suite) = &state.cipher_suite else {
            return Err(Error::ErrCipherSuiteNotInit);
        };
        record = cipher_suite.encrypt(&header, &record)?;
    }
    Ok(record)
}

fn seal_application_data(state: &mut State, data: &[u8]) -> Result<Vec<u8>> {
    if state.local_epoch == 0 {
        return Err(Error::ErrHandshakeInProgress);
    }
    seal_record(state, ContentType::ApplicationData, data)
}

/// Post-handshake record pump: decrypts inbound traffic, surfaces
/// application data, honors close_notify, and (server side) answers a
/// retransmitted client Finished with the stored final flight.
async fn run_pump(
    conn: Arc<dyn Conn + Send + Sync>,
    state: Arc<Mutex<State>>,
    closed: Arc<AtomicBool>,
    final_flight: Arc<Vec<Vec<u8>>>,
    incoming_tx: mpsc::UnboundedSender<Vec<u8>>,
) {
    let mut buf = vec![0u8; INBOUND_BUFFER_SIZE];
    loop {
        let n = match conn.recv(&mut buf).await {
            Ok(n) => n,
            Err(_) => break,
        };
        if closed.load(Ordering::SeqCst) {
            break;
        }

        let mut offset = 0;
        while offset + RECORD_LAYER_HEADER_SIZE <= n {
            let Ok(header) = RecordLayerHeader::unmarshal(&buf[offset..n]) else {
                break;
            };
            let record_len = RECORD_LAYER_HEADER_SIZE + header.content_len as usize;
            if offset + record_len > n {
                break;
            }
            let record = &buf[offset..offset + record_len];
            offset += record_len;

            let mut state = state.lock().await;

            let epoch_idx = (header.epoch as usize).min(state.replay_detector.len() - 1);
            if !state.replay_detector[epoch_idx].check(header.sequence_number) {
                continue;
            }

            let plaintext = if header.epoch > 0 {
                let Some(cipher_suite) = &state.cipher_suite else {
                    continue;
                };
                match cipher_suite.decrypt(record) {
                    Ok(p) => p,
                    Err(err) => {
                        log::debug!("discarded undecryptable record: {err}");
                        continue;
                    }
                }
            } else {
                record.to_vec()
            };
            state.replay_detector[epoch_idx].commit(header.sequence_number);

            let content = &plaintext[RECORD_LAYER_HEADER_SIZE..];
            match header.content_type {
                ContentType::ApplicationData => {
                    let _ = incoming_tx.send(content.to_vec());
                }
                ContentType::Alert => {
                    if let Ok(alert) = Alert::unmarshal(content) {
                        if alert.alert_description == AlertDescription::CloseNotify
                            || alert.alert_level == AlertLevel::Fatal
                        {
                            log::debug!("dtls connection closed by peer: {alert}");
                            closed.store(true, Ordering::SeqCst);
                            return;
                        }
                        log::debug!("dtls warning alert: {alert}");
                    }
                }
                ContentType::Handshake => {
                    // the peer lost our final flight; repeat it
                    if !final_flight.is_empty() {
                        for datagram in final_flight.iter() {
                            let _ = conn.send(datagram).await;
                        }
                    }
                }
                ContentType::ChangeCipherSpec => {
                    // duplicate of a processed CCS, ignore
                }
                ContentType::Invalid => {}
            }
        }
    }
    closed.store(true, Ordering::SeqCst);
}

/// One inbound handshake-relevant event.
enum Inbound {
    Message { epoch: u16, raw: Vec<u8> },
    ChangeCipherSpec,
}

/// HandshakeDriver owns the connection until the handshake resolves.
struct HandshakeDriver {
    conn: Arc<dyn Conn + Send + Sync>,
    config: Config,
    state: State,
    flight: Flight,

    fragment_buffer: FragmentBuffer,
    queued_messages: Vec<(u16, Vec<u8>)>,
    /// Encrypted records that arrived before the peer's CCS.
    pending_encrypted: Vec<Vec<u8>>,
    remote_ccs_seen: bool,

    /// Concatenated full handshake messages, the Finished/CV transcript.
    transcript: Vec<u8>,
    handshake_send_seq: u16,

    /// Verbatim datagrams of the last flight we sent.
    last_flight: Vec<Vec<u8>>,
    /// The final flight, kept for post-handshake retransmission.
    final_flight: Arc<Vec<Vec<u8>>>,

    cookie_secret: [u8; 32],
    early_application_data: Vec<Vec<u8>>,
}

impl HandshakeDriver {
    fn new(conn: Arc<dyn Conn + Send + Sync>, config: Config, is_client: bool) -> Self {
        let mut cookie_secret = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut cookie_secret);

        let mut state = State {
            is_client,
            ..Default::default()
        };
        state.local_random = HandshakeRandom::generate();

        HandshakeDriver {
            conn,
            config,
            state,
            flight: if is_client {
                Flight::Flight1
            } else {
                Flight::Flight0
            },
            fragment_buffer: FragmentBuffer::new(),
            queued_messages: vec![],
            pending_encrypted: vec![],
            remote_ccs_seen: false,
            transcript: vec![],
            handshake_send_seq: 0,
            last_flight: vec![],
            final_flight: Arc::new(vec![]),
            cookie_secret,
            early_application_data: vec![],
        }
    }

    fn cookie_for(&self, random: &HandshakeRandom) -> Vec<u8> {
        let mut mac = CookieHmac::new_from_slice(&self.cookie_secret)
            .expect("HMAC accepts any key length");
        mac.update(&random.marshal_fixed());
        mac.finalize().into_bytes()[..COOKIE_LENGTH].to_vec()
    }

    async fn send_alert(&mut self, level: AlertLevel, description: AlertDescription) {
        let alert = Alert {
            alert_level: level,
            alert_description: description,
        };
        if let Ok(record) = seal_record(&mut self.state, ContentType::Alert, &alert.marshal()) {
            let _ = self.conn.send(&record).await;
        }
    }

    /// Seals a complete handshake message into one or more records,
    /// assigning the next message sequence. Returns the records and the
    /// full message bytes (for the transcript).
    fn pack_handshake(&mut self, message: HandshakeMessage) -> Result<(Vec<Vec<u8>>, Vec<u8>)> {
        let handshake = Handshake::new(message, self.handshake_send_seq)?;
        self.handshake_send_seq += 1;
        let full = handshake.marshal()?;

        let body = &full[HANDSHAKE_HEADER_LENGTH..];
        let mut records = vec![];
        let mut offset = 0;
        loop {
            let fragment_len = (body.len() - offset).min(MAX_HANDSHAKE_FRAGMENT_LENGTH);
            let header = HandshakeHeader {
                fragment_offset: offset as u32,
                fragment_length: fragment_len as u32,
                ..handshake.handshake_header
            };
            let mut payload = header.marshal()?;
            payload.extend_from_slice(&body[offset..offset + fragment_len]);
            records.push(seal_record(
                &mut self.state,
                ContentType::Handshake,
                &payload,
            )?);

            offset += fragment_len;
            if offset >= body.len() {
                break;
            }
        }

        Ok((records, full))
    }

    async fn send_flight(&mut self, datagrams: Vec<Vec<u8>>) -> Result<()> {
        for datagram in &datagrams {
            self.conn
                .send(datagram)
                .await
                .map_err(|e| Error::Other(e.to_string()))?;
        }
        self.last_flight = datagrams;
        Ok(())
    }

    async fn resend_last_flight(&self) -> Result<()> {
        for datagram in &self.last_flight {
            self.conn
                .send(datagram)
                .await
                .map_err(|e| Error::Other(e.to_string()))?;
        }
        Ok(())
    }

    /// Awaits the next handshake message or CCS, retransmitting the last
    /// flight on every interval elapse with exponential backoff.
    async fn next_inbound(&mut self) -> Result<Inbound> {
        if !self.queued_messages.is_empty() {
            let (epoch, raw) = self.queued_messages.remove(0);
            return Ok(Inbound::Message { epoch, raw });
        }

        let mut interval = self.config.flight_interval;
        let mut buf = vec![0u8; INBOUND_BUFFER_SIZE];
        loop {
            match tokio::time::timeout(interval, self.conn.recv(&mut buf)).await {
                Ok(Ok(n)) => {
                    let saw_ccs = self.handle_datagram(&buf[..n]).await?;
                    if saw_ccs {
                        return Ok(Inbound::ChangeCipherSpec);
                    }
                    if !self.queued_messages.is_empty() {
                        let (epoch, raw) = self.queued_messages.remove(0);
                        return Ok(Inbound::Message { epoch, raw });
                    }
                }
                Ok(Err(e)) => return Err(Error::Other(e.to_string())),
                Err(_) => {
                    log::trace!("{} retransmit", self.flight);
                    self.resend_last_flight().await?;
                    interval = (interval * 2).min(self.config.handshake_timeout);
                }
            }
        }
    }

    /// Awaits the next handshake message, treating CCS as an internal
    /// state change.
    async fn next_message(&mut self) -> Result<(u16, Vec<u8>)> {
        loop {
            match self.next_inbound().await? {
                Inbound::Message { epoch, raw } => return Ok((epoch, raw)),
                Inbound::ChangeCipherSpec => continue,
            }
        }
    }

    /// Splits one datagram into records and processes each. Returns true
    /// if a ChangeCipherSpec advanced the remote epoch.
    async fn handle_datagram(&mut self, data: &[u8]) -> Result<bool> {
        let mut saw_ccs = false;
        let mut offset = 0;
        while offset + RECORD_LAYER_HEADER_SIZE <= data.len() {
            let header = match RecordLayerHeader::unmarshal(&data[offset..]) {
                Ok(h) => h,
                Err(_) => break,
            };
            let record_len = RECORD_LAYER_HEADER_SIZE + header.content_len as usize;
            if offset + record_len > data.len() {
                break;
            }
            let record = data[offset..offset + record_len].to_vec();
            offset += record_len;

            if self.handle_record(&record).await? {
                saw_ccs = true;
            }
        }
        Ok(saw_ccs)
    }

    async fn handle_record(&mut self, record: &[u8]) -> Result<bool> {
        let mut saw_ccs = false;
        let mut work = vec![record.to_vec()];

        while let Some(record) = work.pop() {
            let header = RecordLayerHeader::unmarshal(&record)?;

            let epoch_idx = (header.epoch as usize).min(self.state.replay_detector.len() - 1);
            if !self.state.replay_detector[epoch_idx].check(header.sequence_number) {
                continue;
            }

            let plaintext;
            if header.epoch > 0 {
                let cipher_suite = if self.remote_ccs_seen {
                    self.state.cipher_suite.as_ref()
                } else {
                    None
                };
                let Some(cipher_suite) = cipher_suite else {
                    // the encrypted Finished can outrun the CCS; hold it
                    self.pending_encrypted.push(record.to_vec());
                    continue;
                };
                match cipher_suite.decrypt(&record) {
                    Ok(p) => plaintext = p,
                    Err(err) => {
                        log::debug!("discarded undecryptable record during handshake: {err}");
                        continue;
                    }
                }
            } else {
                plaintext = record.to_vec();
            }
            let content = &plaintext[RECORD_LAYER_HEADER_SIZE..];
            self.state.replay_detector[epoch_idx].commit(header.sequence_number);

            match header.content_type {
                ContentType::Handshake => {
                    let stored = self.fragment_buffer.push(header.epoch, content)?;
                    // a stale re-push is a peer retransmit: answer with ours
                    if !stored && !self.last_flight.is_empty() {
                        self.resend_last_flight().await?;
                    }
                    while let Some((epoch, raw)) = self.fragment_buffer.pop() {
                        self.queued_messages.push((epoch, raw));
                    }
                }
                ContentType::ChangeCipherSpec => {
                    self.remote_ccs_seen = true;
                    saw_ccs = true;
                    // replay the records that outran the CCS
                    work.append(&mut self.pending_encrypted);
                }
                ContentType::Alert => {
                    let alert = Alert::unmarshal(content)?;
                    if alert.alert_description == AlertDescription::CloseNotify {
                        return Err(Error::ErrAlertCloseNotify);
                    } else if alert.alert_level == AlertLevel::Fatal {
                        return Err(Error::ErrFatalAlert(alert.alert_description.to_string()));
                    }
                    log::debug!("warning alert during handshake: {alert}");
                }
                ContentType::ApplicationData => {
                    self.early_application_data.push(content.to_vec());
                }
                ContentType::Invalid => {}
            }
        }
        Ok(saw_ccs)
    }

    fn parse_full_message(raw: &[u8]) -> Result<(HandshakeType, HandshakeMessage)> {
        let header = HandshakeHeader::unmarshal(raw)?;
        let body = &raw[HANDSHAKE_HEADER_LENGTH..];
        let message = HandshakeMessage::unmarshal(header.handshake_type, body)?;
        Ok((header.handshake_type, message))
    }

    fn client_hello_extensions(&self) -> Vec<Extension> {
        vec![
            Extension::SupportedEllipticCurves(ExtensionSupportedEllipticCurves {
                elliptic_curves: default_named_curves(),
            }),
            Extension::SupportedPointFormats(ExtensionSupportedPointFormats {
                point_formats: vec![ELLIPTIC_CURVE_POINT_FORMAT_UNCOMPRESSED],
            }),
            Extension::SupportedSignatureAlgorithms(ExtensionSupportedSignatureAlgorithms {
                signature_hash_algorithms: default_signature_schemes(),
            }),
            Extension::UseSrtp(ExtensionUseSrtp {
                protection_profiles: self.config.srtp_protection_profiles.clone(),
            }),
            Extension::UseExtendedMasterSecret(ExtensionUseExtendedMasterSecret {
                supported: true,
            }),
            Extension::RenegotiationInfo(ExtensionRenegotiationInfo {
                renegotiated_connection: 0,
            }),
        ]
    }

    // === client side ===

    async fn run_client(&mut self) -> Result<()> {
        // Flight 1: cookie-less ClientHello
        let client_hello = HandshakeMessageClientHello {
            random: self.state.local_random,
            cipher_suites: self.config.cipher_suites.clone(),
            extensions: self.client_hello_extensions(),
            ..Default::default()
        };
        let (records, full) =
            self.pack_handshake(HandshakeMessage::ClientHello(client_hello.clone()))?;
        // included in the transcript unless a cookie round replaces it
        self.transcript.extend_from_slice(&full);
        self.send_flight(records).await?;

        // Flight 2/4: HelloVerifyRequest, or straight to ServerHello
        let mut server_hello = None;
        while server_hello.is_none() {
            let (_, raw) = self.next_message().await?;
            match Self::parse_full_message(&raw)?.1 {
                HandshakeMessage::HelloVerifyRequest(hvr) => {
                    self.flight = Flight::Flight3;
                    // the cookied retry restarts the transcript
                    self.transcript.clear();
                    let mut retry = client_hello.clone();
                    retry.cookie = hvr.cookie;
                    let (records, full) =
                        self.pack_handshake(HandshakeMessage::ClientHello(retry))?;
                    self.transcript.extend_from_slice(&full);
                    self.send_flight(records).await?;
                }
                HandshakeMessage::ServerHello(sh) => {
                    self.transcript.extend_from_slice(&raw);
                    server_hello = Some(sh);
                }
                _ => return Err(Error::ErrUnhandledContextType),
            }
        }
        let Some(server_hello) = server_hello else {
            return Err(Error::ErrUnhandledContextType);
        };

        self.state.remote_random = server_hello.random;
        let mut cipher_suite = cipher_suite_for_id(server_hello.cipher_suite)?;
        for ext in &server_hello.extensions {
            match ext {
                Extension::UseSrtp(use_srtp) => {
                    let profile = use_srtp
                        .protection_profiles
                        .iter()
                        .find(|p| self.config.srtp_protection_profiles.contains(p));
                    match profile {
                        Some(p) => self.state.srtp_protection_profile = *p,
                        None => return Err(Error::ErrClientNoMatchingSrtpProfile),
                    }
                }
                Extension::UseExtendedMasterSecret(_) => {
                    self.state.extended_master_secret = true;
                }
                _ => {}
            }
        }
        if !self.state.extended_master_secret {
            return Err(Error::ErrClientRequiredButNoServerEms);
        }

        // remainder of flight 4
        let mut server_key_exchange = None;
        loop {
            let (_, raw) = self.next_message().await?;
            let (_, message) = Self::parse_full_message(&raw)?;
            match message {
                HandshakeMessage::Certificate(cert) => {
                    self.transcript.extend_from_slice(&raw);
                    self.state.peer_certificates = cert.certificate;
                }
                HandshakeMessage::ServerKeyExchange(ske) => {
                    self.transcript.extend_from_slice(&raw);
                    server_key_exchange = Some(ske);
                }
                HandshakeMessage::CertificateRequest(_) => {
                    self.transcript.extend_from_slice(&raw);
                }
                HandshakeMessage::ServerHelloDone(_) => {
                    self.transcript.extend_from_slice(&raw);
                    break;
                }
                _ => return Err(Error::ErrUnhandledContextType),
            }
        }
        let Some(server_key_exchange) = server_key_exchange else {
            return Err(Error::ErrUnhandledContextType);
        };
        if self.state.peer_certificates.is_empty() {
            return Err(Error::ErrCertificateRequired);
        }

        // authenticate the key exchange against the server certificate
        verify_key_signature(
            &self.state.local_random.marshal_fixed(),
            &self.state.remote_random.marshal_fixed(),
            &server_key_exchange.marshal_params()?,
            &server_key_exchange.algorithm,
            &server_key_exchange.signature,
            &self.state.peer_certificates[0],
        )?;

        let keypair = server_key_exchange.named_curve.generate_keypair()?;
        let pre_master_secret =
            elliptic_curve_pre_master_secret(&keypair, &server_key_exchange.public_key)?;

        self.flight = Flight::Flight5;

        let certificate = self.config.certificates[0].clone();
        let mut datagrams = vec![];

        // Certificate
        let (mut records, full) =
            self.pack_handshake(HandshakeMessage::Certificate(HandshakeMessageCertificate {
                certificate: certificate.certificate.clone(),
            }))?;
        self.transcript.extend_from_slice(&full);
        datagrams.append(&mut records);

        // ClientKeyExchange
        let (mut records, full) = self.pack_handshake(HandshakeMessage::ClientKeyExchange(
            HandshakeMessageClientKeyExchange {
                public_key: keypair.public_key.clone(),
            },
        ))?;
        self.transcript.extend_from_slice(&full);
        datagrams.append(&mut records);

        // master secret binds the session hash through ClientKeyExchange
        let hash = cipher_suite.hash_func();
        let session_hash = hash_transcript(&self.transcript, hash);
        let master_secret = prf_extended_master_secret(&pre_master_secret, &session_hash, hash)?;
        cipher_suite.init(
            &master_secret,
            &self.state.local_random.marshal_fixed(),
            &self.state.remote_random.marshal_fixed(),
            true,
        )?;
        self.state.master_secret = master_secret.clone();
        self.state.cipher_suite = Some(cipher_suite);

        // CertificateVerify over the transcript so far
        let signature = certificate.private_key.sign(&self.transcript)?;
        let (mut records, full) = self.pack_handshake(HandshakeMessage::CertificateVerify(
            HandshakeMessageCertificateVerify {
                algorithm: SignatureHashAlgorithm {
                    hash: HashAlgorithm::Sha256,
                    signature: certificate.private_key.signature_algorithm(),
                },
                signature,
            },
        ))?;
        self.transcript.extend_from_slice(&full);
        datagrams.append(&mut records);

        // ChangeCipherSpec, then the encrypted Finished
        datagrams.push(seal_record(
            &mut self.state,
            ContentType::ChangeCipherSpec,
            &[0x01],
        )?);
        self.state.local_epoch = 1;

        let verify_data = prf_verify_data_client(&master_secret, &self.transcript, hash)?;
        let (mut records, full) = self.pack_handshake(HandshakeMessage::Finished(
            HandshakeMessageFinished { verify_data },
        ))?;
        self.transcript.extend_from_slice(&full);
        datagrams.append(&mut records);

        self.send_flight(datagrams).await?;

        // Flight 6: server ChangeCipherSpec + Finished
        loop {
            let (_, raw) = self.next_message().await?;
            let (_, message) = Self::parse_full_message(&raw)?;
            if let HandshakeMessage::Finished(finished) = message {
                let expected =
                    prf_verify_data_server(&self.state.master_secret, &self.transcript, hash)?;
                if finished.verify_data != expected {
                    return Err(Error::ErrVerifyDataMismatch);
                }
                break;
            }
            return Err(Error::ErrUnhandledContextType);
        }

        Ok(())
    }

    // === server side ===

    async fn run_server(&mut self) -> Result<()> {
        // Flight 0: await the first ClientHello
        let client_hello = loop {
            let (_, raw) = self.next_message().await?;
            let (_, message) = Self::parse_full_message(&raw)?;
            let HandshakeMessage::ClientHello(ch) = message else {
                return Err(Error::ErrUnhandledContextType);
            };

            if ch.cookie.is_empty() {
                // Flight 2: stateless cookie; the retransmitted
                // cookie-less hello gets the same answer
                self.flight = Flight::Flight2;
                let cookie = self.cookie_for(&ch.random);
                let (records, _) = self.pack_handshake(HandshakeMessage::HelloVerifyRequest(
                    HandshakeMessageHelloVerifyRequest {
                        version: PROTOCOL_VERSION1_0,
                        cookie,
                    },
                ))?;
                self.send_flight(records).await?;
                continue;
            }

            if ch.cookie != self.cookie_for(&ch.random) {
                return Err(Error::ErrFatalAlert("cookie mismatch".to_owned()));
            }
            self.transcript.extend_from_slice(&raw);
            break ch;
        };

        self.state.remote_random = client_hello.random;

        // select the first mutual suite our certificate can serve
        let certificate = self.config.certificates[0].clone();
        let our_sig = certificate.private_key.signature_algorithm();
        let mut selected = None;
        for offered in &client_hello.cipher_suites {
            if !self.config.cipher_suites.contains(offered) {
                continue;
            }
            let suite = cipher_suite_for_id(*offered)?;
            if suite.certificate_type() == our_sig {
                selected = Some(suite);
                break;
            }
        }
        let Some(mut cipher_suite) = selected else {
            return Err(Error::ErrCipherSuiteNoIntersection);
        };

        // use_srtp: first of the client's offers we support
        let mut client_srtp = vec![];
        let mut client_curves = vec![NamedCurve::X25519, NamedCurve::P256];
        let mut client_ems = false;
        for ext in &client_hello.extensions {
            match ext {
                Extension::UseSrtp(use_srtp) => {
                    client_srtp = use_srtp.protection_profiles.clone();
                }
                Extension::SupportedEllipticCurves(curves) => {
                    client_curves = curves.elliptic_curves.clone();
                }
                Extension::UseExtendedMasterSecret(_) => client_ems = true,
                _ => {}
            }
        }
        if !client_ems {
            return Err(Error::ErrClientRequiredButNoServerEms);
        }
        let srtp_profile = client_srtp
            .iter()
            .find(|p| self.config.srtp_protection_profiles.contains(p))
            .copied();
        if !self.config.srtp_protection_profiles.is_empty() {
            match srtp_profile {
                Some(p) => self.state.srtp_protection_profile = p,
                None => return Err(Error::ErrClientNoMatchingSrtpProfile),
            }
        }

        let named_curve = *client_curves
            .iter()
            .find(|c| default_named_curves().contains(c))
            .ok_or(Error::ErrNoSupportedEllipticCurves)?;

        self.flight = Flight::Flight4;
        let mut datagrams = vec![];

        // ServerHello
        let mut extensions = vec![
            Extension::RenegotiationInfo(ExtensionRenegotiationInfo {
                renegotiated_connection: 0,
            }),
            Extension::UseExtendedMasterSecret(ExtensionUseExtendedMasterSecret {
                supported: true,
            }),
            Extension::SupportedPointFormats(ExtensionSupportedPointFormats {
                point_formats: vec![ELLIPTIC_CURVE_POINT_FORMAT_UNCOMPRESSED],
            }),
        ];
        if let Some(profile) = srtp_profile {
            extensions.push(Extension::UseSrtp(ExtensionUseSrtp {
                protection_profiles: vec![profile],
            }));
        }
        let (mut records, full) =
            self.pack_handshake(HandshakeMessage::ServerHello(HandshakeMessageServerHello {
                random: self.state.local_random,
                cipher_suite: cipher_suite.id(),
                extensions,
                ..Default::default()
            }))?;
        self.transcript.extend_from_slice(&full);
        datagrams.append(&mut records);

        // Certificate
        let (mut records, full) =
            self.pack_handshake(HandshakeMessage::Certificate(HandshakeMessageCertificate {
                certificate: certificate.certificate.clone(),
            }))?;
        self.transcript.extend_from_slice(&full);
        datagrams.append(&mut records);

        // ServerKeyExchange
        let keypair = named_curve.generate_keypair()?;
        let mut ske = HandshakeMessageServerKeyExchange {
            named_curve,
            public_key: keypair.public_key.clone(),
            algorithm: SignatureHashAlgorithm {
                hash: HashAlgorithm::Sha256,
                signature: our_sig,
            },
            signature: vec![],
        };
        ske.signature = generate_key_signature(
            &self.state.remote_random.marshal_fixed(),
            &self.state.local_random.marshal_fixed(),
            &ske.marshal_params()?,
            &certificate.private_key,
        )?;
        let (mut records, full) =
            self.pack_handshake(HandshakeMessage::ServerKeyExchange(ske))?;
        self.transcript.extend_from_slice(&full);
        datagrams.append(&mut records);

        // CertificateRequest: WebRTC requires mutual authentication
        if self.config.client_auth == ClientAuthType::RequireAnyClientCert {
            let (mut records, full) = self.pack_handshake(HandshakeMessage::CertificateRequest(
                HandshakeMessageCertificateRequest {
                    certificate_types: vec![
                        ClientCertificateType::EcdsaSign,
                        ClientCertificateType::RsaSign,
                    ],
                    signature_hash_algorithms: default_signature_schemes(),
                },
            ))?;
            self.transcript.extend_from_slice(&full);
            datagrams.append(&mut records);
        }

        // ServerHelloDone
        let (mut records, full) = self.pack_handshake(HandshakeMessage::ServerHelloDone(
            HandshakeMessageServerHelloDone,
        ))?;
        self.transcript.extend_from_slice(&full);
        datagrams.append(&mut records);

        self.send_flight(datagrams).await?;

        // Flight 5 from the client
        let hash = cipher_suite.hash_func();
        let mut client_certificate: Option<HandshakeMessageCertificate> = None;
        let mut certificate_verified = false;
        let mut master_secret = vec![];
        let mut cipher_suite = Some(cipher_suite);

        loop {
            let (_, raw) = self.next_message().await?;
            let (_, message) = Self::parse_full_message(&raw)?;
            match message {
                HandshakeMessage::Certificate(cert) => {
                    self.transcript.extend_from_slice(&raw);
                    client_certificate = Some(cert);
                }
                HandshakeMessage::ClientKeyExchange(cke) => {
                    self.transcript.extend_from_slice(&raw);
                    let pre_master_secret =
                        elliptic_curve_pre_master_secret(&keypair, &cke.public_key)?;
                    let session_hash = hash_transcript(&self.transcript, hash);
                    master_secret =
                        prf_extended_master_secret(&pre_master_secret, &session_hash, hash)?;

                    let mut suite = cipher_suite.take().ok_or(Error::ErrCipherSuiteUnset)?;
                    suite.init(
                        &master_secret,
                        &self.state.remote_random.marshal_fixed(),
                        &self.state.local_random.marshal_fixed(),
                        false,
                    )?;
                    self.state.master_secret = master_secret.clone();
                    self.state.cipher_suite = Some(suite);
                }
                HandshakeMessage::CertificateVerify(cv) => {
                    let Some(cert) = &client_certificate else {
                        return Err(Error::ErrCertificateVerifyNoCertificate);
                    };
                    if cert.certificate.is_empty() {
                        return Err(Error::ErrClientCertificateRequired);
                    }
                    // signature covers the transcript before this message
                    verify_certificate_verify(
                        &self.transcript,
                        &cv.algorithm,
                        &cv.signature,
                        &cert.certificate[0],
                    )?;
                    self.transcript.extend_from_slice(&raw);
                    certificate_verified = true;
                }
                HandshakeMessage::Finished(finished) => {
                    if self.config.client_auth == ClientAuthType::RequireAnyClientCert {
                        if client_certificate.is_none() {
                            return Err(Error::ErrClientCertificateRequired);
                        }
                        if !certificate_verified {
                            return Err(Error::ErrClientCertificateNotVerified);
                        }
                    }
                    let expected = prf_verify_data_client(&master_secret, &self.transcript, hash)?;
                    if finished.verify_data != expected {
                        return Err(Error::ErrVerifyDataMismatch);
                    }
                    self.transcript.extend_from_slice(&raw);
                    break;
                }
                _ => return Err(Error::ErrUnhandledContextType),
            }
        }
        if let Some(cert) = client_certificate {
            self.state.peer_certificates = cert.certificate;
        }

        // Flight 6: CCS + Finished
        self.flight = Flight::Flight6;
        let mut datagrams = vec![];
        datagrams.push(seal_record(
            &mut self.state,
            ContentType::ChangeCipherSpec,
            &[0x01],
        )?);
        self.state.local_epoch = 1;

        let verify_data = prf_verify_data_server(&master_secret, &self.transcript, hash)?;
        let (mut records, _) = self.pack_handshake(HandshakeMessage::Finished(
            HandshakeMessageFinished { verify_data },
        ))?;
        datagrams.append(&mut records);

        self.send_flight(datagrams.clone()).await?;
        self.final_flight = Arc::new(datagrams);

        Ok(())
    }
}
