//! Server options.

use crate::dispatch::DispatchOptions;

/// The options for the server.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// The base HTTP URL of the server.
    ///
    /// If the server is running behind a reverse proxy, this should be set to the base URL of the
    /// proxy.
    ///
    /// If no base URL is set, the server will attempt to determine the base URL from its own TCP
    /// listener address.
    ///
    /// If `FORECOURT_BASE_URL` is set in the environment, it will be read and used as the base URL
    /// when calling `ServerOptions::from_env`.
    pub base_url: Option<http::Uri>,

    /// The dispatch options.
    ///
    /// The server never applies these itself: pass them to the dispatcher
    /// through `Dispatcher::with_options`.
    pub dispatch: DispatchOptions,
}

/// An error that can occur when trying to get the server options from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ServerOptionsFromEnvError {
    /// An environment variable was not unicode.
    #[error("environment variable {name} was not unicode")]
    NotUnicode {
        /// The name of the environment variable.
        name: &'static str,
    },

    /// An error occurred while trying to get the base URL from the environment.
    #[error("failed to parse the base URL from environment variable {name} (was `{url}`): {err}")]
    BaseUrl {
        /// The name of the environment variable.
        name: &'static str,

        /// The URL that was attempted to be parsed.
        url: String,

        /// The error that occurred.
        #[source]
        err: http::uri::InvalidUri,
    },
}

impl ServerOptions {
    /// The environment variable name for the base URL.
    pub const FORECOURT_BASE_URL: &'static str = "FORECOURT_BASE_URL";

    /// The environment variable name for the canonical index path.
    pub const FORECOURT_INDEX_PATH: &'static str = "FORECOURT_INDEX_PATH";

    /// The environment variable name for the views namespace prefix.
    pub const FORECOURT_VIEWS_PREFIX: &'static str = "FORECOURT_VIEWS_PREFIX";

    /// The environment variable name for the method-override field.
    pub const FORECOURT_METHOD_OVERRIDE_FIELD: &'static str = "FORECOURT_METHOD_OVERRIDE_FIELD";

    fn env_var(name: &'static str) -> Result<Option<String>, ServerOptionsFromEnvError> {
        match std::env::var(name) {
            Ok(value) => Ok(if value.is_empty() { None } else { Some(value) }),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => {
                Err(ServerOptionsFromEnvError::NotUnicode { name })
            }
        }
    }

    /// Get the server options from the environment.
    pub fn from_env() -> Result<Self, ServerOptionsFromEnvError> {
        tracing::info!("Reading server options from the environment...");

        let base_url = Self::env_var(Self::FORECOURT_BASE_URL)?
            .map(|url| {
                url.parse()
                    .map_err(|err| ServerOptionsFromEnvError::BaseUrl {
                        name: Self::FORECOURT_BASE_URL,
                        url: url.clone(),
                        err,
                    })
            })
            .transpose()?;

        match &base_url {
            Some(base_url) => {
                tracing::info!(
                    "{} was set: using `{base_url}` as the base URL.",
                    Self::FORECOURT_BASE_URL
                );
            }
            None => {
                tracing::warn!(
                    "{} was not set: base URL will be determined from the TCP listener address. This may not be what you want.",
                    Self::FORECOURT_BASE_URL
                );
            }
        };

        let mut dispatch = DispatchOptions::default();

        if let Some(index_path) = Self::env_var(Self::FORECOURT_INDEX_PATH)? {
            tracing::info!(
                "{} was set: using `{index_path}` as the canonical index path.",
                Self::FORECOURT_INDEX_PATH
            );

            dispatch.index_path = index_path;
        }

        if let Some(views_prefix) = Self::env_var(Self::FORECOURT_VIEWS_PREFIX)? {
            tracing::info!(
                "{} was set: using `{views_prefix}` as the views namespace prefix.",
                Self::FORECOURT_VIEWS_PREFIX
            );

            dispatch.views_prefix = views_prefix;
        }

        if let Some(field) = Self::env_var(Self::FORECOURT_METHOD_OVERRIDE_FIELD)? {
            tracing::info!(
                "{} was set: using `{field}` as the method-override field.",
                Self::FORECOURT_METHOD_OVERRIDE_FIELD
            );

            dispatch.method_override_field = field;
        }

        Ok(Self { base_url, dispatch })
    }
}
