//! MQTT client adapter.
//!
//! Implements [`MqttPort`] over a synchronous request/response view of the
//! broker session.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//!   `open_transport` resolves the broker and stages TLS material;
//!   `connect` starts the client and blocks on the CONNACK event up to the
//!   command timeout.
//! - **all other targets**: [`SimMqtt`], a recording client with
//!   scriptable failures for host-side tests.

use core::fmt::Write as _;

use log::{info, warn};

use crate::app::ports::{Endpoint, MqttConnectOptions, MqttError, MqttPort};

/// `mqtt://host:port` or `mqtts://host:port`.
pub fn broker_url(endpoint: &Endpoint<'_>) -> String {
    let scheme = if endpoint.security.is_tls() {
        "mqtts"
    } else {
        "mqtt"
    };
    let mut url = String::with_capacity(endpoint.host.len() + 16);
    let _ = write!(url, "{}://{}:{}", scheme, endpoint.host, endpoint.port);
    url
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspMqtt;

#[cfg(target_os = "espidf")]
mod esp {
    use std::net::ToSocketAddrs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };
    use esp_idf_svc::tls::X509;
    use log::{info, warn};

    use super::broker_url;
    use crate::app::ports::{Endpoint, MqttConnectOptions, MqttError, MqttPort, SocketSecurity};

    const CONNACK_POLL_MS: u32 = 10;

    /// NUL-terminated PEM buffers staged for the client.
    ///
    /// The ESP-IDF client keeps pointers into the PEM for its whole life, so
    /// each distinct blob is leaked once and reused across reconnects.
    #[derive(Default)]
    struct Pem {
        source: Vec<u8>,
        staged: Option<&'static [u8]>,
    }

    impl Pem {
        fn stage(&mut self, pem: &[u8]) -> Option<X509<'static>> {
            if pem.is_empty() {
                return None;
            }
            if self.source != pem || self.staged.is_none() {
                let mut buf = pem.to_vec();
                if buf.last() != Some(&0) {
                    buf.push(0);
                }
                self.source = pem.to_vec();
                self.staged = Some(Box::leak(buf.into_boxed_slice()));
            }
            self.staged.map(X509::pem_until_nul)
        }
    }

    #[derive(Default)]
    struct Staged {
        url: String,
        tls: bool,
        verify_name: bool,
        ca: Option<X509<'static>>,
        cert: Option<X509<'static>>,
        key: Option<X509<'static>>,
    }

    pub struct EspMqtt {
        client: Option<EspMqttClient<'static>>,
        connected: Arc<AtomicBool>,
        staged: Option<Staged>,
        ca: Pem,
        cert: Pem,
        key: Pem,
    }

    impl Default for EspMqtt {
        fn default() -> Self {
            Self::new()
        }
    }

    impl EspMqtt {
        pub fn new() -> Self {
            Self {
                client: None,
                connected: Arc::new(AtomicBool::new(false)),
                staged: None,
                ca: Pem::default(),
                cert: Pem::default(),
                key: Pem::default(),
            }
        }
    }

    impl MqttPort for EspMqtt {
        fn open_transport(&mut self, endpoint: &Endpoint<'_>) -> Result<(), MqttError> {
            (endpoint.host, endpoint.port)
                .to_socket_addrs()
                .map_err(|e| {
                    warn!("MQTT: cannot resolve {}: {}", endpoint.host, e);
                    MqttError::Transport
                })?
                .next()
                .ok_or(MqttError::Transport)?;

            let mut staged = Staged {
                url: broker_url(endpoint),
                tls: endpoint.security.is_tls(),
                ..Staged::default()
            };
            match endpoint.security {
                SocketSecurity::None => {}
                SocketSecurity::ServerNoAuth { ca, .. } => {
                    staged.ca = self.ca.stage(ca);
                }
                SocketSecurity::ServerAuth { ca, .. } => {
                    staged.ca = Some(self.ca.stage(ca).ok_or(MqttError::Transport)?);
                    staged.verify_name = true;
                }
                SocketSecurity::MutualAuth { ca, cert, key, .. } => {
                    staged.ca = Some(self.ca.stage(ca).ok_or(MqttError::Transport)?);
                    staged.cert = Some(self.cert.stage(cert).ok_or(MqttError::Transport)?);
                    staged.key = Some(self.key.stage(key).ok_or(MqttError::Transport)?);
                    staged.verify_name = true;
                }
            }
            info!("MQTT: transport staged for {} (tls={})", staged.url, staged.tls);
            self.staged = Some(staged);
            Ok(())
        }

        fn close_transport(&mut self) {
            self.client = None;
            self.staged = None;
            self.connected.store(false, Ordering::Release);
        }

        fn connect(&mut self, options: &MqttConnectOptions<'_>) -> Result<(), MqttError> {
            let staged = self.staged.as_ref().ok_or(MqttError::NotConnected)?;
            let conf = MqttClientConfiguration {
                client_id: Some(options.client_id),
                username: (!options.username.is_empty()).then_some(options.username),
                password: (!options.password.is_empty()).then_some(options.password),
                network_timeout: Duration::from_millis(u64::from(options.command_timeout_ms)),
                server_certificate: staged.ca,
                client_certificate: staged.cert,
                private_key: staged.key,
                skip_cert_common_name_check: staged.tls && !staged.verify_name,
                ..Default::default()
            };

            self.connected.store(false, Ordering::Release);
            let flag = Arc::clone(&self.connected);
            let client = EspMqttClient::new_cb(&staged.url, &conf, move |event| match event.payload() {
                EventPayload::Connected(_) => flag.store(true, Ordering::Release),
                EventPayload::Disconnected => flag.store(false, Ordering::Release),
                EventPayload::Error(e) => warn!("MQTT: client error {:?}", e),
                _ => {}
            })
            .map_err(|e| {
                warn!("MQTT: client start failed: {}", e);
                MqttError::Connect(e.code())
            })?;
            self.client = Some(client);

            let mut waited = 0;
            while !self.connected.load(Ordering::Acquire) {
                if waited >= options.command_timeout_ms {
                    self.client = None;
                    return Err(MqttError::Connect(-1));
                }
                FreeRtos::delay_ms(CONNACK_POLL_MS);
                waited += CONNACK_POLL_MS;
            }
            info!("MQTT: connected as {}", options.client_id);
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
            if !self.connected.load(Ordering::Acquire) {
                return Err(MqttError::NotConnected);
            }
            let client = self.client.as_mut().ok_or(MqttError::NotConnected)?;
            client
                .publish(topic, QoS::AtMostOnce, false, payload)
                .map(|_| ())
                .map_err(|e| {
                    warn!("MQTT: publish on {} failed: {}", topic, e);
                    MqttError::Publish
                })
        }

        fn yield_for(&mut self, timeout_ms: u32) -> Result<(), MqttError> {
            // Keep-alive runs on the client task; yielding gives it the CPU.
            FreeRtos::delay_ms(timeout_ms);
            if self.connected.load(Ordering::Acquire) {
                Ok(())
            } else {
                Err(MqttError::Yield)
            }
        }

        fn disconnect(&mut self) -> Result<(), MqttError> {
            let was_connected = self.connected.swap(false, Ordering::AcqRel);
            self.client = None;
            if was_connected {
                Ok(())
            } else {
                Err(MqttError::NotConnected)
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation client
// ───────────────────────────────────────────────────────────────

/// Recording client for host builds.
#[derive(Debug, Default)]
pub struct SimMqtt {
    transport_open: bool,
    connected: bool,
    url: String,
    published: Vec<(String, Vec<u8>)>,
    fail_transport: u32,
    fail_connect: u32,
    fail_publish: u32,
    fail_yield: u32,
}

impl SimMqtt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(topic, payload)` accepted so far.
    pub fn published(&self) -> &[(String, Vec<u8>)] {
        &self.published
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn fail_transport_next(&mut self, n: u32) {
        self.fail_transport = n;
    }

    pub fn fail_connect_next(&mut self, n: u32) {
        self.fail_connect = n;
    }

    pub fn fail_publish_next(&mut self, n: u32) {
        self.fail_publish = n;
    }

    pub fn fail_yield_next(&mut self, n: u32) {
        self.fail_yield = n;
    }

    /// Simulate the broker dropping the session.
    pub fn drop_session(&mut self) {
        self.connected = false;
    }
}

fn take_failure(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

impl MqttPort for SimMqtt {
    fn open_transport(&mut self, endpoint: &Endpoint<'_>) -> Result<(), MqttError> {
        if take_failure(&mut self.fail_transport) {
            return Err(MqttError::Transport);
        }
        self.url = broker_url(endpoint);
        self.transport_open = true;
        info!("MQTT(sim): socket open to {}", self.url);
        Ok(())
    }

    fn close_transport(&mut self) {
        self.transport_open = false;
        self.connected = false;
    }

    fn connect(&mut self, options: &MqttConnectOptions<'_>) -> Result<(), MqttError> {
        if !self.transport_open {
            return Err(MqttError::NotConnected);
        }
        if take_failure(&mut self.fail_connect) {
            return Err(MqttError::Connect(5));
        }
        self.connected = true;
        info!("MQTT(sim): connected as {}", options.client_id);
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
        if !self.connected {
            return Err(MqttError::NotConnected);
        }
        if take_failure(&mut self.fail_publish) {
            warn!("MQTT(sim): publish on {} rejected", topic);
            return Err(MqttError::Publish);
        }
        self.published.push((topic.to_owned(), payload.to_vec()));
        Ok(())
    }

    fn yield_for(&mut self, _timeout_ms: u32) -> Result<(), MqttError> {
        if !self.connected || take_failure(&mut self.fail_yield) {
            return Err(MqttError::Yield);
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), MqttError> {
        if !core::mem::take(&mut self.connected) {
            return Err(MqttError::NotConnected);
        }
        Ok(())
    }
}
