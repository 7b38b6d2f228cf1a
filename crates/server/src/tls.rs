//! TLS termination for the dispatch endpoint.
//!
//! Certificate and key come from PEM files named on the command line; a
//! loading failure aborts serve with the offending path in the error.

use crate::error::{Result, ServerError};
use axum::serve::Listener;
use rustls::ServerConfig;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;
use tracing::warn;

/// PEM locations for the server certificate chain and its private key.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

pub fn load_server_config(paths: &TlsPaths) -> Result<Arc<ServerConfig>> {
    let certs = CertificateDer::pem_file_iter(&paths.cert)
        .map_err(|err| ServerError::Tls(format!("{}: {err}", paths.cert.display())))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| ServerError::Tls(format!("{}: {err}", paths.cert.display())))?;
    let key = PrivateKeyDer::from_pem_file(&paths.key)
        .map_err(|err| ServerError::Tls(format!("{}: {err}", paths.key.display())))?;
    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| ServerError::Tls(err.to_string()))?;
    Ok(Arc::new(config))
}

/// TCP listener that terminates TLS before handing the stream to the
/// router. Handshakes run on the accept loop; a failed handshake drops
/// that connection and the loop keeps accepting.
pub struct TlsListener {
    inner: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    pub async fn bind(addr: SocketAddr, config: Arc<ServerConfig>) -> io::Result<Self> {
        Ok(TlsListener {
            inner: TcpListener::bind(addr).await?,
            acceptor: TlsAcceptor::from(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let (stream, peer) = match self.inner.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("accept failed: {err}");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };
            match self.acceptor.accept(stream).await {
                Ok(stream) => return (stream, peer),
                Err(err) => warn!("handshake with {peer} failed: {err}"),
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}
