use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use switchboard_server::TlsPaths;

pub async fn run(
    root: PathBuf,
    addr: SocketAddr,
    tls_cert: Option<PathBuf>,
    tls_key: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let engine = crate::demo::demo_engine(root)?;
    let tls = match (tls_cert, tls_key) {
        (Some(cert), Some(key)) => Some(TlsPaths { cert, key }),
        _ => None,
    };
    switchboard_server::serve(engine, addr, tls).await?;
    Ok(())
}
