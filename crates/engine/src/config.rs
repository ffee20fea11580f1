use std::fmt;
use std::path::PathBuf;

/// Native configuration understood by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Credentials clients must present. Passed through untouched.
    pub authorization: Option<Authorization>,

    /// Whether to produce debug output.
    pub debug: bool,

    /// The host to listen for client connections on.
    pub host: String,

    /// Whether JetStream (persistent streams) is enabled.
    pub jetstream: bool,

    /// Whether the engine's own logging is suppressed.
    pub no_log: bool,

    /// Whether the engine ignores process signals sent to the host.
    pub no_sigs: bool,

    /// The port to listen for client connections on.
    pub port: u16,

    /// The name the engine advertises. The engine picks one when `None`.
    pub server_name: Option<String>,

    /// Directory for file-backed JetStream storage. `None` keeps file
    /// storage in a temporary directory removed together with the engine.
    pub store_dir: Option<PathBuf>,

    /// Whether to produce protocol traces.
    pub trace: bool,
}

/// Credentials configured on the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authorization {
    /// A single shared token.
    Token(String),

    /// Username and password pairs.
    Users {
        /// The users allowed to connect.
        users: Vec<User>,

        /// Username placed in the system account, if any.
        system_user: Option<String>,
    },

    /// Users identified by their public nkey.
    Nkeys(Vec<NkeyUser>),
}

/// A username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// The username.
    pub username: String,

    /// The password.
    pub password: String,
}

impl User {
    /// Creates a new user.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A user identified by a public nkey.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NkeyUser {
    /// The user's public nkey (starts with `U`).
    pub public_key: String,

    /// Subject permissions. `None` grants everything.
    pub permissions: Option<Permissions>,
}

impl NkeyUser {
    /// Creates an nkey user without permission restrictions.
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            permissions: None,
        }
    }

    /// Restricts the user to the given permissions.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }
}

/// Subject allow lists. An empty list denies that direction entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Permissions {
    /// Subjects the user may publish to.
    pub publish: Vec<String>,

    /// Subjects the user may subscribe to.
    pub subscribe: Vec<String>,
}
