//! HostSettings — the description of one execution target.
//!
//! A settings list is the ordered contract for a run: the response at
//! index `i` of a [`crate::ResponseList`] always corresponds to the
//! settings record at index `i`.

use std::collections::BTreeMap;

/// Default SSH port used when a host string carries no port.
pub const DEFAULT_PORT: u16 = 22;

/// Connection settings for a single target.
///
/// Produced by a settings resolver and never mutated by the engine.
/// `host_string` is the canonical display form (`user@host:port`) used
/// when pairing responses with the targets that produced them.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HostSettings {
    /// Bare hostname or address.
    pub host: String,
    /// Canonical display form, e.g. `deploy@web1:22`.
    pub host_string: String,
    /// Port to connect on.
    pub port: u16,
    /// Login user, if any.
    pub user: Option<String>,
    /// Free-form extra fields carried through untouched.
    pub extras: BTreeMap<String, String>,
}

/// Ordered sequence of settings records; length == number of work units.
pub type SettingsList = Vec<HostSettings>;

impl HostSettings {
    /// Create settings for a bare host with the default port and no user.
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        let host_string = format!("{}:{}", host, DEFAULT_PORT);
        Self {
            host,
            host_string,
            port: DEFAULT_PORT,
            user: None,
            extras: BTreeMap::new(),
        }
    }

    /// Parse a host string of the form `[user@]host[:port]`.
    ///
    /// A trailing `:part` that does not parse as a port number is kept as
    /// part of the host. Missing pieces fall back to the defaults.
    pub fn parse(host_string: &str, default_user: Option<&str>, default_port: u16) -> Self {
        let (user, rest) = match host_string.split_once('@') {
            Some((user, rest)) if !user.is_empty() => (Some(user.to_string()), rest),
            _ => (default_user.map(str::to_string), host_string),
        };
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => match port_str.parse::<u16>() {
                Ok(port) if !host.is_empty() => (host.to_string(), port),
                _ => (rest.to_string(), default_port),
            },
            None => (rest.to_string(), default_port),
        };
        let host_string = match &user {
            Some(user) => format!("{}@{}:{}", user, host, port),
            None => format!("{}:{}", host, port),
        };
        Self {
            host,
            host_string,
            port,
            user,
            extras: BTreeMap::new(),
        }
    }

    /// Parse a host string with the standard defaults (no user, port 22).
    pub fn from_host_string(host_string: &str) -> Self {
        Self::parse(host_string, None, DEFAULT_PORT)
    }
}

impl std::fmt::Display for HostSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.host_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_host() {
        let s = HostSettings::from_host_string("web1");
        assert_eq!(s.host, "web1");
        assert_eq!(s.port, 22);
        assert_eq!(s.user, None);
        assert_eq!(s.host_string, "web1:22");
    }

    #[test]
    fn parse_full_host_string() {
        let s = HostSettings::from_host_string("deploy@web1:2222");
        assert_eq!(s.host, "web1");
        assert_eq!(s.port, 2222);
        assert_eq!(s.user.as_deref(), Some("deploy"));
        assert_eq!(s.host_string, "deploy@web1:2222");
    }

    #[test]
    fn parse_applies_defaults() {
        let s = HostSettings::parse("db1", Some("admin"), 2200);
        assert_eq!(s.user.as_deref(), Some("admin"));
        assert_eq!(s.port, 2200);
        assert_eq!(s.host_string, "admin@db1:2200");
    }

    #[test]
    fn explicit_user_beats_default() {
        let s = HostSettings::parse("root@db1", Some("admin"), 22);
        assert_eq!(s.user.as_deref(), Some("root"));
    }

    #[test]
    fn non_numeric_port_stays_in_host() {
        let s = HostSettings::from_host_string("web1:abc");
        assert_eq!(s.host, "web1:abc");
        assert_eq!(s.port, 22);
    }

    #[test]
    fn display_uses_host_string() {
        let s = HostSettings::from_host_string("deploy@web1");
        assert_eq!(s.to_string(), "deploy@web1:22");
    }
}
