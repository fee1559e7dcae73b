//! Core server data types shared by the registry, query engine and views.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ping value meaning "queried but unreachable".
///
/// A freshly created record carries ping 0 ("never queried") instead; the
/// merge rules in the query engine treat the two differently.
pub const PING_UNREACHABLE: u32 = 9999;

/// Identity of a server: exact host string plus port. No DNS resolution is
/// performed anywhere; two addresses are equal iff both fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid server address {input:?}: expected host:port")]
pub struct AddrParseError {
    pub input: String,
}

impl FromStr for ServerAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .filter(|(host, _)| !host.is_empty())
            .ok_or_else(|| AddrParseError {
                input: s.to_string(),
            })?;
        let port = port.parse::<u16>().map_err(|_| AddrParseError {
            input: s.to_string(),
        })?;

        Ok(Self::new(host, port))
    }
}

/// One entry of a server's player roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub score: i32,
}

/// Server-declared rule metadata: an ordered string-to-string mapping.
///
/// Servers may declare arbitrary keys; a handful of well-known ones get
/// accessors. Insertion order is the order the server reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    entries: Vec<(String, String)>,
}

impl RuleSet {
    /// Build from `[name, value]` pairs as reported by the server. A key
    /// repeated later in the list overwrites the earlier value but keeps
    /// its original position.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut rules = Self::default();
        for (name, value) in pairs {
            rules.set(name, value);
        }
        rules
    }

    pub fn set(&mut self, name: String, value: String) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn version(&self) -> Option<&str> {
        self.get("version")
    }

    pub fn web_url(&self) -> Option<&str> {
        self.get("weburl")
    }

    pub fn map_name(&self) -> Option<&str> {
        self.get("mapname")
    }
}

/// Extended-protocol extras: banner art and the community invite link.
/// Only servers speaking the extended protocol ever report these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraInfo {
    pub banner_light: Option<String>,
    pub banner_dark: Option<String>,
    pub discord_invite: Option<String>,
    pub logo: Option<String>,
}

/// Which stored collection a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Internet,
    Favorites,
    RecentlyJoined,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Internet => "internet",
            ListKind::Favorites => "favorites",
            ListKind::RecentlyJoined => "recently_joined",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable last-known snapshot of one server.
///
/// The address is the identity and never changes after creation; every
/// other field is overwritten piecemeal as query responses arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub addr: ServerAddr,
    pub hostname: String,
    pub game_mode: String,
    pub language: String,
    pub player_count: u32,
    pub max_players: u32,
    pub has_password: bool,
    /// User-supplied, kept only for reconnect convenience.
    pub password: String,
    pub version: String,
    pub ping: u32,
    pub using_omp: bool,
    pub partner: bool,
    pub rules: RuleSet,
    pub players: Vec<Player>,
    pub extra: Option<ExtraInfo>,
}

impl ServerRecord {
    /// A record with nothing known about it yet beyond its address.
    pub fn new(addr: ServerAddr) -> Self {
        Self {
            addr,
            hostname: String::new(),
            game_mode: String::new(),
            language: String::new(),
            player_count: 0,
            max_players: 0,
            has_password: false,
            password: String::new(),
            version: String::new(),
            ping: 0,
            using_omp: false,
            partner: false,
            rules: RuleSet::default(),
            players: Vec::new(),
            extra: None,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        self.ping >= PING_UNREACHABLE
    }
}
