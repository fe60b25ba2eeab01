use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AuthError, Result};

/// Username and password for one host.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login:    String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parsed `.netrc` file.
///
/// Supports `machine`, `default`, `login`, `password`, `account` and
/// `macdef` (whose body runs to the next blank line and is ignored).
#[derive(Debug, Default, Clone)]
pub struct Netrc {
    machines: HashMap<String, Credentials>,
    default:  Option<Credentials>,
}

#[derive(Default)]
struct Entry {
    host:     Option<String>,
    login:    Option<String>,
    password: Option<String>,
}

impl Netrc {
    const ENV: &str = "NETRC";

    /// `$NETRC` if set, otherwise `~/.netrc`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(Self::ENV) {
            return Ok(PathBuf::from(path));
        }
        home::home_dir()
            .map(|home| home.join(".netrc"))
            .ok_or(AuthError::NoHome)
    }

    pub fn load() -> Result<Self> { Self::from_path(Self::default_path()?) }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AuthError::NetrcMissing {
                    path: path.to_path_buf(),
                }
            } else {
                AuthError::NetrcRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut netrc = Self::default();
        let mut entry: Option<Entry> = None;
        let mut pending_key: Option<&str> = None;
        let mut in_macdef = false;

        for line in text.lines() {
            if in_macdef {
                if line.trim().is_empty() {
                    in_macdef = false;
                }
                continue;
            }

            for token in line.split_whitespace() {
                if let Some(key) = pending_key.take() {
                    match key {
                        "machine" => {
                            netrc.commit(entry.take());
                            entry = Some(Entry {
                                host: Some(token.to_string()),
                                ..Entry::default()
                            });
                        }
                        "login" => {
                            if let Some(e) = entry.as_mut() {
                                e.login = Some(token.to_string());
                            }
                        }
                        "password" => {
                            if let Some(e) = entry.as_mut() {
                                e.password = Some(token.to_string());
                            }
                        }
                        "macdef" => {
                            in_macdef = true;
                            break;
                        }
                        _ => {}
                    }
                    continue;
                }

                match token {
                    "default" => {
                        netrc.commit(entry.take());
                        entry = Some(Entry::default());
                    }
                    "machine" | "login" | "password" | "account" | "macdef" => {
                        pending_key = Some(token);
                    }
                    _ => {}
                }
            }
        }
        netrc.commit(entry);
        netrc
    }

    fn commit(&mut self, entry: Option<Entry>) {
        let Some(entry) = entry else { return };
        let credentials = Credentials {
            login:    entry.login.unwrap_or_default(),
            password: entry.password.unwrap_or_default(),
        };
        match entry.host {
            Some(host) => {
                self.machines.entry(host).or_insert(credentials);
            }
            None => self.default = Some(credentials),
        }
    }

    /// Credentials for `host`, falling back to the `default` entry.
    pub fn credentials(&self, host: &str) -> Result<&Credentials> {
        self.machines
            .get(host)
            .or(self.default.as_ref())
            .ok_or_else(|| AuthError::NoCredentials {
                host: host.to_string(),
            })
    }
}
