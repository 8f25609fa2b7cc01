//! Static file server exposing the boot media of a working directory to BMCs
//!
//! Only the boot image and the PXE artifacts directory are reachable; every
//! other path (installer documents, credentials) answers 404.

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use provision_core::workdir::{BOOT_IMAGE, PXE_DIR};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::{Service, ServiceBuilder};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

type MediaBody = UnsyncBoxBody<Bytes, std::io::Error>;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),
}

/// Serves the boot image and PXE artifacts under `root` over plain HTTP
#[derive(Clone, Debug)]
pub struct FileServer {
    root: PathBuf,
    addr: SocketAddr,
}

/// A file server whose listener is bound and ready to accept
pub struct BoundFileServer {
    root: PathBuf,
    listener: TcpListener,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>, addr: SocketAddr) -> Self {
        Self {
            root: root.into(),
            addr,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn bind(self) -> Result<BoundFileServer, ServeError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServeError::Bind {
                addr: self.addr,
                source,
            })?;
        Ok(BoundFileServer {
            root: self.root,
            listener,
        })
    }

    /// Bind and serve until the accept loop fails
    pub async fn run(self) -> Result<(), ServeError> {
        self.bind().await?.serve().await
    }
}

impl BoundFileServer {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    pub async fn serve(self) -> Result<(), ServeError> {
        info!(
            addr = ?self.local_addr(),
            root = %self.root.display(),
            "File server listening"
        );

        let service = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .service(BootMedia::new(&self.root));

        loop {
            let (stream, peer_addr) = self.listener.accept().await.map_err(ServeError::Accept)?;
            let io = TokioIo::new(stream);
            let service = TowerToHyperService::new(service.clone());

            tokio::task::spawn(async move {
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Error serving file to {}: {}", peer_addr, e);
                }
            });
        }
    }
}

/// Whether `path` names the boot image or a file below the PXE directory
pub fn is_boot_media(path: &str) -> bool {
    let Some(relative) = path.strip_prefix('/') else {
        return false;
    };
    relative == BOOT_IMAGE
        || relative
            .strip_prefix(PXE_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|file| !file.is_empty())
}

/// `ServeDir` restricted to boot media paths
#[derive(Clone)]
struct BootMedia {
    files: ServeDir,
}

impl BootMedia {
    fn new(root: &Path) -> Self {
        Self {
            files: ServeDir::new(root),
        }
    }
}

fn not_found() -> Response<MediaBody> {
    let body = Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed_unsync();
    let mut resp = Response::new(body);
    *resp.status_mut() = StatusCode::NOT_FOUND;
    resp
}

impl<B> Service<Request<B>> for BootMedia
where
    B: Send + 'static,
{
    type Response = Response<MediaBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Service::<Request<B>>::poll_ready(&mut self.files, cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        if !is_boot_media(req.uri().path()) {
            debug!(path = %req.uri().path(), "Refusing request outside boot media");
            return Box::pin(async { Ok(not_found()) });
        }

        let response = self.files.call(req);
        Box::pin(async move {
            let resp = response.await?;
            Ok(resp.map(|body| body.boxed_unsync()))
        })
    }
}
