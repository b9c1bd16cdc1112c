use std::env;

pub const DEFAULT_HOST: &str = "openapi.etsy.com";
pub const DEFAULT_PROTOCOL: &str = "https";

/// Application-wide access token/secret, used when a request carries none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub access_secret: Option<String>,
}

/// Settings shared by every request: application keys, target host and the
/// silent-errors switch consulted by [`Response::result`](crate::Response::result).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub api_secret: Option<String>,
    pub host: String,
    pub protocol: String,
    pub user_agent: Option<String>,
    pub silent_errors: bool,
    pub credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: None,
            host: DEFAULT_HOST.into(),
            protocol: DEFAULT_PROTOCOL.into(),
            user_agent: None,
            silent_errors: false,
            credentials: Credentials::default(),
        }
    }
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Build a configuration from `ETSY_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let access_token = env::var("ETSY_ACCESS_TOKEN").ok();
        let access_secret = env::var("ETSY_ACCESS_SECRET").ok();

        Self {
            api_key: env::var("ETSY_API_KEY").unwrap_or_default(),
            api_secret: env::var("ETSY_API_SECRET").ok(),
            host: env::var("ETSY_HOST").unwrap_or(defaults.host),
            protocol: env::var("ETSY_PROTOCOL").unwrap_or(defaults.protocol),
            user_agent: env::var("ETSY_USER_AGENT").ok(),
            silent_errors: env::var("ETSY_SILENT_ERRORS")
                .ok()
                .map(|s| parse_flag(&s))
                .unwrap_or(false),
            credentials: Credentials {
                access_token,
                access_secret,
            },
        }
    }

    pub fn with_api_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = Some(secret.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_silent_errors(mut self, silent: bool) -> Self {
        self.silent_errors = silent;
        self
    }

    pub fn with_credentials(mut self, access_token: Option<&str>, access_secret: Option<&str>) -> Self {
        self.credentials = Credentials {
            access_token: access_token.map(str::to_string),
            access_secret: access_secret.map(str::to_string),
        };
        self
    }

    /// `{protocol}://{host}` with no trailing slash.
    pub fn site(&self) -> String {
        format!(
            "{}://{}",
            self.protocol,
            self.host.trim_end_matches('/')
        )
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
