//! Device connection string.
//!
//! Format: `HostName=x;HostPort=x;ConnSecurity=x;MQClientId=x;MQUserName=x;MQUserPwd=x;`
//!
//! Every key is located independently by substring search, so order does
//! not matter and unknown keys are ignored.  A value runs up to the next
//! `;`; a value with no terminating `;` reads as empty.  A missing key
//! leaves its field `None`.

use log::warn;

use crate::app::ports::{Credential, CredentialPort, Endpoint, MqttConnectOptions, SocketSecurity};
use crate::error::{Error, Result};

/// Longest connection string accepted.
pub const MAX_CONNECTION_STRING_LEN: usize = 300;

/// Transport security level, `ConnSecurity=` in the connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnSecurity {
    None = 0,
    ServerNoAuth = 1,
    ServerAuth = 2,
    MutualAuth = 3,
}

impl ConnSecurity {
    /// Parse like C `atoi`: leading whitespace, optional sign, digits.
    pub fn from_field(raw: &str) -> Option<Self> {
        match atoi(raw) {
            0 => Some(Self::None),
            1 => Some(Self::ServerNoAuth),
            2 => Some(Self::ServerAuth),
            3 => Some(Self::MutualAuth),
            _ => None,
        }
    }
}

fn atoi(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (neg, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut n: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        n = n.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if neg { -n } else { n }
}

fn token(source: &str, name: &str) -> Option<String> {
    let start = source.find(name)? + name.len();
    let rest = &source[start..];
    let value = rest.find(';').map_or("", |end| &rest[..end]);
    Some(value.to_owned())
}

/// Parsed connection string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    pub host_name: Option<String>,
    pub host_port: Option<String>,
    pub conn_security: Option<String>,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl DeviceConfig {
    pub fn parse(source: &str) -> Result<Self> {
        if source.len() > MAX_CONNECTION_STRING_LEN {
            return Err(Error::Config("connection string too long"));
        }
        Ok(Self {
            host_name: token(source, "HostName="),
            host_port: token(source, "HostPort="),
            conn_security: token(source, "ConnSecurity="),
            client_id: token(source, "MQClientId="),
            username: token(source, "MQUserName="),
            password: token(source, "MQUserPwd="),
        })
    }

    pub fn security(&self) -> Result<ConnSecurity> {
        self.conn_security
            .as_deref()
            .and_then(ConnSecurity::from_field)
            .ok_or(Error::Config("ConnSecurity must be 0..=3"))
    }

    /// Broker port, `atoi` semantics.
    pub fn port(&self) -> Result<u16> {
        let raw = self.host_port.as_deref().ok_or(Error::Config("HostPort missing"))?;
        u16::try_from(atoi(raw)).map_err(|_| Error::Config("HostPort out of range"))
    }
}

/// TLS material loaded for the configured security level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    pub ca: Vec<u8>,
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

/// Everything the session needs to reach the broker, resolved at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub security: ConnSecurity,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub tls: TlsMaterial,
}

impl BrokerSettings {
    /// Load and resolve the provisioned connection string and keys.
    ///
    /// Server authentication needs a root CA; mutual authentication also
    /// needs the device certificate and key.
    pub fn load(credentials: &dyn CredentialPort) -> Result<Self> {
        let raw = credentials
            .credential(Credential::ConnectionString)
            .map_err(|_| Error::Config("connection string not provisioned"))?;
        let text = core::str::from_utf8(&raw).map_err(|_| Error::Config("connection string is not UTF-8"))?;
        let text = text.trim_end_matches(['\0', '\r', '\n']);
        let device = DeviceConfig::parse(text)?;

        let security = device.security()?;
        let host = device.host_name.clone().ok_or(Error::Config("HostName missing"))?;
        let port = device.port()?;
        let client_id = device.client_id.clone().ok_or(Error::Config("MQClientId missing"))?;

        let fetch = |which: Credential, what: &'static str| {
            credentials.credential(which).map_err(|e| {
                warn!("Config: {} unavailable: {}", which.key(), e);
                Error::Config(what)
            })
        };
        let tls = match security {
            ConnSecurity::None => TlsMaterial::default(),
            ConnSecurity::ServerNoAuth => TlsMaterial {
                ca: fetch(Credential::RootCa, "root CA missing").unwrap_or_default(),
                ..TlsMaterial::default()
            },
            ConnSecurity::ServerAuth => TlsMaterial {
                ca: fetch(Credential::RootCa, "root CA missing")?,
                ..TlsMaterial::default()
            },
            ConnSecurity::MutualAuth => TlsMaterial {
                ca: fetch(Credential::RootCa, "root CA missing")?,
                cert: fetch(Credential::DeviceCert, "device certificate missing")?,
                key: fetch(Credential::DeviceKey, "device key missing")?,
            },
        };

        Ok(Self {
            host,
            port,
            security,
            client_id,
            username: device.username.unwrap_or_default(),
            password: device.password.unwrap_or_default(),
            tls,
        })
    }

    pub fn endpoint(&self) -> Endpoint<'_> {
        let server_name = self.host.as_str();
        let ca = self.tls.ca.as_slice();
        let security = match self.security {
            ConnSecurity::None => SocketSecurity::None,
            ConnSecurity::ServerNoAuth => SocketSecurity::ServerNoAuth { server_name, ca },
            ConnSecurity::ServerAuth => SocketSecurity::ServerAuth { server_name, ca },
            ConnSecurity::MutualAuth => SocketSecurity::MutualAuth {
                server_name,
                ca,
                cert: self.tls.cert.as_slice(),
                key: self.tls.key.as_slice(),
            },
        };
        Endpoint {
            host: self.host.as_str(),
            port: self.port,
            security,
        }
    }

    pub fn connect_options(&self, command_timeout_ms: u32) -> MqttConnectOptions<'_> {
        MqttConnectOptions {
            client_id: &self.client_id,
            username: &self.username,
            password: &self.password,
            command_timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::ConfigError;

    const FULL: &str =
        "HostName=mqtt.example.com;HostPort=8883;ConnSecurity=2;MQClientId=node-7;MQUserName=alice;MQUserPwd=s3cret;";

    struct Store(Vec<(Credential, &'static [u8])>);

    impl CredentialPort for Store {
        fn credential(&self, which: Credential) -> core::result::Result<Vec<u8>, ConfigError> {
            self.0
                .iter()
                .find(|(k, _)| *k == which)
                .map(|(_, v)| v.to_vec())
                .ok_or(ConfigError::NotFound)
        }
    }

    #[test]
    fn parses_every_key() {
        let c = DeviceConfig::parse(FULL).unwrap();
        assert_eq!(c.host_name.as_deref(), Some("mqtt.example.com"));
        assert_eq!(c.port().unwrap(), 8883);
        assert_eq!(c.security().unwrap(), ConnSecurity::ServerAuth);
        assert_eq!(c.client_id.as_deref(), Some("node-7"));
        assert_eq!(c.username.as_deref(), Some("alice"));
        assert_eq!(c.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn keys_are_order_independent_and_optional() {
        let c = DeviceConfig::parse("MQClientId=x;ConnSecurity=0;HostPort=1883;HostName=h;").unwrap();
        assert_eq!(c.host_name.as_deref(), Some("h"));
        assert!(c.username.is_none());
        assert!(c.password.is_none());
    }

    #[test]
    fn unterminated_value_is_empty() {
        let c = DeviceConfig::parse("HostName=h;HostPort=1883").unwrap();
        assert_eq!(c.host_port.as_deref(), Some(""));
        assert_eq!(c.port().unwrap(), 0);
    }

    #[test]
    fn overlong_string_is_rejected() {
        let long = format!("HostName={};", "a".repeat(300));
        assert!(DeviceConfig::parse(&long).is_err());
    }

    #[test]
    fn security_levels() {
        assert_eq!(ConnSecurity::from_field("3"), Some(ConnSecurity::MutualAuth));
        assert_eq!(ConnSecurity::from_field(" 1x"), Some(ConnSecurity::ServerNoAuth));
        assert_eq!(ConnSecurity::from_field("abc"), Some(ConnSecurity::None));
        assert_eq!(ConnSecurity::from_field("4"), None);
        assert_eq!(ConnSecurity::from_field("-1"), None);
    }

    #[test]
    fn server_auth_requires_a_ca() {
        let store = Store(vec![(Credential::ConnectionString, FULL.as_bytes())]);
        assert_eq!(
            BrokerSettings::load(&store),
            Err(Error::Config("root CA missing"))
        );

        let store = Store(vec![
            (Credential::ConnectionString, FULL.as_bytes()),
            (Credential::RootCa, &b"-----BEGIN CERTIFICATE-----"[..]),
        ]);
        let s = BrokerSettings::load(&store).unwrap();
        let ep = s.endpoint();
        assert_eq!(ep.port, 8883);
        assert!(matches!(
            ep.security,
            SocketSecurity::ServerAuth { server_name: "mqtt.example.com", .. }
        ));
    }

    #[test]
    fn mutual_auth_requires_cert_and_key() {
        let conn = FULL.replace("ConnSecurity=2", "ConnSecurity=3");
        let conn: &'static str = Box::leak(conn.into_boxed_str());
        let store = Store(vec![
            (Credential::ConnectionString, conn.as_bytes()),
            (Credential::RootCa, &b"ca"[..]),
            (Credential::DeviceCert, &b"cert"[..]),
        ]);
        assert_eq!(
            BrokerSettings::load(&store),
            Err(Error::Config("device key missing"))
        );
    }

    #[test]
    fn plain_tcp_needs_no_keys() {
        let store = Store(vec![(
            Credential::ConnectionString,
            &b"HostName=10.0.0.2;HostPort=1883;ConnSecurity=0;MQClientId=n;\0\0"[..],
        )]);
        let s = BrokerSettings::load(&store).unwrap();
        assert_eq!(s.endpoint().security, SocketSecurity::None);
        let o = s.connect_options(5000);
        assert_eq!(o.client_id, "n");
        assert_eq!(o.username, "");
    }

    #[test]
    fn missing_connection_string_is_a_config_error() {
        let store = Store(vec![]);
        assert!(matches!(BrokerSettings::load(&store), Err(Error::Config(_))));
    }
}
