//! Socket Manager - listening sockets for Wayland connections

use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use wayland_server::ListeningSocket;

/// Information about a bound socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketInfo {
    /// Socket name relative to the runtime directory (e.g., "wayland-0")
    pub name: String,
    /// Full filesystem path
    pub path: PathBuf,
}

/// Owns the listening sockets clients connect through.
pub struct SocketManager {
    sockets: Vec<(ListeningSocket, SocketInfo)>,
    runtime_dir: PathBuf,
}

impl SocketManager {
    pub fn new(runtime_dir: impl AsRef<Path>) -> Result<Self> {
        let runtime_dir = runtime_dir.as_ref().to_path_buf();
        if !runtime_dir.exists() {
            std::fs::create_dir_all(&runtime_dir)
                .context("Failed to create runtime directory")?;
        }
        Ok(Self {
            sockets: Vec::new(),
            runtime_dir,
        })
    }

    /// Bind `name` inside the runtime directory, replacing a stale socket file.
    pub fn bind(&mut self, name: &str) -> Result<&SocketInfo> {
        let path = self.runtime_dir.join(name);
        let _ = std::fs::remove_file(&path);

        tracing::info!("Binding socket: {}", path.display());
        let socket = ListeningSocket::bind_absolute(path.clone())
            .with_context(|| format!("Failed to bind socket at {}", path.display()))?;

        self.sockets.push((socket, SocketInfo { name: name.to_string(), path }));
        Ok(&self.sockets[self.sockets.len() - 1].1)
    }

    pub fn sockets(&self) -> impl Iterator<Item = &SocketInfo> {
        self.sockets.iter().map(|(_, info)| info)
    }

    /// Accept one pending connection from any socket, if there is one.
    pub fn accept_any(&mut self) -> Option<UnixStream> {
        for (socket, info) in &mut self.sockets {
            match socket.accept() {
                Ok(Some(stream)) => return Some(stream),
                Ok(None) => {}
                Err(e) => tracing::warn!("accept on {} failed: {}", info.name, e),
            }
        }
        None
    }

    /// Close every socket and remove its file.
    pub fn close_all(&mut self) {
        tracing::info!("Closing {} socket(s)", self.sockets.len());
        for (_, info) in self.sockets.drain(..) {
            if info.path.exists() {
                if let Err(e) = std::fs::remove_file(&info.path) {
                    tracing::warn!("Failed to remove socket file {}: {}", info.path.display(), e);
                }
            }
        }
    }
}

impl Drop for SocketManager {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = SocketManager::new(dir.path()).unwrap();

        let info = manager.bind("wayland-test-0").unwrap().clone();
        assert_eq!(info.name, "wayland-test-0");
        assert!(info.path.exists());
        assert_eq!(manager.sockets().count(), 1);
        assert!(manager.accept_any().is_none());

        manager.close_all();
        assert!(!info.path.exists());
        assert_eq!(manager.sockets().count(), 0);
    }
}
