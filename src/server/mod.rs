use std::{future::Future, net::SocketAddr, pin::Pin, sync::Arc};

mod dispatch_router;
mod options;

use axum::Router;
pub use dispatch_router::DispatchRouter;
pub use options::{ServerOptions, ServerOptionsFromEnvError};

use crate::dispatch::Dispatcher;

/// The server information.
///
/// This information is made available to handlers through request extensions.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// The base URL of the server.
    pub base_url: http::Uri,
}

/// A server builder.
pub struct ServerBuilder {
    /// The TCP listener that the server is using.
    listener: tokio::net::TcpListener,

    /// The graceful shutdown signal.
    graceful_shutdown: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,

    /// The options for the server.
    options: ServerOptions,
}

/// A running front-controller server.
pub struct Server {
    /// The TCP listener that the server is using.
    listener: tokio::net::TcpListener,

    /// The graceful shutdown signal.
    graceful_shutdown: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,

    /// The options for the server.
    options: ServerOptions,
}

/// An error that can occur when trying to serve the application.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// An error occurred while trying to serve the application.
    #[error("failed to serve the application: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while trying to get the local address of the listener.
    #[error("failed to get the local address of the listener: {0}")]
    LocalAddr(std::io::Error),
}

impl ServerBuilder {
    /// Set the options on the server.
    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the options on the server from the environment.
    pub fn with_options_from_env(mut self) -> Result<Self, ServerOptionsFromEnvError> {
        self.options = ServerOptions::from_env()?;

        Ok(self)
    }

    /// Set the graceful shutdown signal.
    pub fn with_graceful_shutdown(
        mut self,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> Self {
        self.graceful_shutdown = Some(Box::pin(signal));
        self
    }

    /// Set the graceful shutdown signal to `ctrl-c`.
    pub fn with_ctrl_c_graceful_shutdown(self) -> Self {
        self.with_graceful_shutdown(async move {
            tracing::info!("Listening for `ctrl-c` signal for graceful shutdown...");

            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to register for `ctrl-c` signal: {err}");
            }

            tracing::info!("Received `ctrl-c` signal, shutting down gracefully.");
        })
    }

    /// Build the server.
    pub fn build(self) -> Server {
        Server {
            listener: self.listener,
            graceful_shutdown: self.graceful_shutdown,
            options: self.options,
        }
    }
}

impl Server {
    /// Get a builder for the server.
    pub fn builder(listener: tokio::net::TcpListener) -> ServerBuilder {
        ServerBuilder {
            listener,
            graceful_shutdown: None,
            options: Default::default(),
        }
    }

    /// The server options.
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Serve the specified dispatcher.
    ///
    /// The dispatcher is used as-is: the `dispatch` field of the server
    /// options is never applied to it, so a dispatcher configured from the
    /// environment must be built with
    /// `Dispatcher::with_options(options.dispatch)` first.
    pub async fn serve(self, dispatcher: Dispatcher) -> Result<(), ServeError> {
        self.serve_with_router(DispatchRouter::new(dispatcher))
            .await
    }

    /// Serve the specified dispatch router.
    ///
    /// Use this method to add custom routes to the server before serving it.
    pub async fn serve_with_router(self, router: DispatchRouter) -> Result<(), ServeError> {
        let local_addr = self.listener.local_addr().map_err(ServeError::LocalAddr)?;

        tracing::info!("Front-controller server listening on TCP/{local_addr}.");

        let base_url = match self.options.base_url {
            Some(base_url) => base_url,
            None => Self::guess_base_url(local_addr),
        };

        let server_info = Arc::new(ServerInfo { base_url });

        tracing::info!(
            "Now serving front-controller server at `{}`...",
            server_info.base_url
        );

        let router: Router = router.into();
        let router = router.layer(axum::extract::Extension(server_info));

        let serve = axum::serve(self.listener, router);

        match self.graceful_shutdown {
            Some(signal) => serve.with_graceful_shutdown(signal).await,
            None => serve.await,
        }
        .map_err(Into::into)
    }

    /// Guess the base URL from the local address.
    fn guess_base_url(local_addr: SocketAddr) -> http::Uri {
        tracing::info!("No base URL set, guessing from local address `{local_addr}`...");

        if local_addr.ip().is_unspecified() {
            tracing::warn!(
                "Local address is unspecified, defaulting to localhost. This is likely not what you want."
            );

            format!("http://localhost:{}", local_addr.port())
                .parse()
                .expect("hardcoded URL is valid")
        } else {
            format!("http://{}:{}", local_addr.ip(), local_addr.port())
                .parse()
                .expect("hardcoded URL is valid")
        }
    }
}
