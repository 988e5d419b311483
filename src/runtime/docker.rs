use std::path::PathBuf;

use crate::container::{ContainerID, RunningContainer};

use super::{ContainerRuntime, Error, Result, http};

/// Default location of the Docker Engine API socket.
pub const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

#[derive(Debug, serde::Deserialize)]
struct ContainerSummary {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ContainerInspect {
    #[serde(rename = "State")]
    state: ContainerState,
}

#[derive(Debug, serde::Deserialize)]
struct ContainerState {
    #[serde(rename = "Pid", default)]
    pid: u32,
    #[serde(rename = "Running", default)]
    running: bool,
}

/// Queries the Docker Engine API for running containers.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    socket_path: PathBuf,
}

impl DockerRuntime {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    async fn list(&self) -> Result<Vec<ContainerSummary>> {
        const URI: &str = "/containers/json";
        let body = http::get(&self.socket_path, URI).await?;
        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            uri: URI.to_owned(),
            source,
        })
    }

    async fn inspect(&self, id: &ContainerID) -> Result<ContainerInspect> {
        let uri = format!("/containers/{id}/json");
        let body = http::get(&self.socket_path, &uri).await?;
        serde_json::from_slice(&body).map_err(|source| Error::Decode { uri, source })
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER_SOCKET)
    }
}

impl ContainerRuntime for DockerRuntime {
    async fn running_containers(&self) -> Result<Vec<RunningContainer>> {
        let summaries = self.list().await?;
        log::debug!("Docker reported {} running containers", summaries.len());

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = match ContainerID::new(&summary.id) {
                Ok(id) => id,
                Err(err) => {
                    log::warn!("skipping container: {}", err);
                    continue;
                }
            };
            let Some(name) = summary.names.into_iter().next() else {
                log::warn!("skipping container `{}`: no name reported", id.short());
                continue;
            };

            let inspect = match self.inspect(&id).await {
                Ok(inspect) => inspect,
                Err(err) => {
                    log::warn!("failed to inspect container `{}`: {}", id.short(), err);
                    continue;
                }
            };
            if !inspect.state.running || inspect.state.pid == 0 {
                log::debug!("container `{}` has no running init process", id.short());
                continue;
            }

            containers.push(RunningContainer {
                id,
                name,
                pid: inspect.state.pid,
            });
        }

        Ok(containers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixListener;

    /// Serves canned JSON bodies keyed by request path, one request per connection.
    fn serve(listener: UnixListener, routes: HashMap<String, (u16, String)>) {
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                let request = String::from_utf8_lossy(&buf);
                let path = request.split_whitespace().nth(1).unwrap_or("").to_owned();
                let (status, body) = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, r#"{"message":"not found"}"#.to_owned()));
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });
    }

    #[tokio::test]
    async fn test_lists_running_containers_with_pids() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("docker.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        let mut routes = HashMap::new();
        routes.insert(
            "/containers/json".to_owned(),
            (
                200,
                r#"[{"Id":"aaa111","Names":["/web"]},{"Id":"bbb222","Names":["/db"]},{"Id":"ccc333","Names":["/gone"]}]"#
                    .to_owned(),
            ),
        );
        routes.insert(
            "/containers/aaa111/json".to_owned(),
            (200, r#"{"State":{"Pid":4242,"Running":true}}"#.to_owned()),
        );
        routes.insert(
            "/containers/bbb222/json".to_owned(),
            (200, r#"{"State":{"Pid":0,"Running":false}}"#.to_owned()),
        );
        serve(listener, routes);

        let runtime = DockerRuntime::new(&socket);
        let containers = runtime.running_containers().await.unwrap();

        assert_eq!(
            containers,
            vec![RunningContainer {
                id: ContainerID::new("aaa111").unwrap(),
                name: "/web".to_owned(),
                pid: 4242,
            }]
        );
    }

    #[tokio::test]
    async fn test_listing_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("docker.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let mut routes = HashMap::new();
        routes.insert(
            "/containers/json".to_owned(),
            (500, r#"{"message":"daemon sad"}"#.to_owned()),
        );
        serve(listener, routes);

        let err = DockerRuntime::new(&socket)
            .running_containers()
            .await
            .unwrap_err();
        match err {
            Error::Status { status, body, .. } => {
                assert_eq!(status, hyper::StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.contains("daemon sad"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let err = DockerRuntime::new(dir.path().join("absent.sock"))
            .running_containers()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SocketConnect { .. }));
    }
}
