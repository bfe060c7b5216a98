//! Test fixtures for integration tests
//!
//! An in-process HLS origin built on axum. Each path maps to a scripted
//! [`Reply`]; every request is counted so tests can assert exactly which
//! fetches happened.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Scripted response for one path
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with the given body
    Body(Bytes),
    /// Empty response with this status
    Status(u16),
    /// `status` for the first `failures` requests, then 200 with `body`
    FailTimes {
        failures: u32,
        status: u16,
        body: Bytes,
    },
    /// 200 whose body breaks off with a transport error after `prefix`
    Truncated(Bytes),
}

impl Reply {
    pub fn text(body: &str) -> Self {
        Reply::Body(Bytes::copy_from_slice(body.as_bytes()))
    }
}

#[derive(Default)]
struct Origin {
    routes: DashMap<String, Reply>,
    hits: DashMap<String, u32>,
    /// Cancel this token when the path is requested, before replying
    cancel_on: Mutex<Option<(String, CancellationToken)>>,
}

/// Running fixture server; shut down on drop.
pub struct FixtureServer {
    addr: SocketAddr,
    origin: Arc<Origin>,
    shutdown: CancellationToken,
}

impl FixtureServer {
    pub async fn start() -> Self {
        let origin = Arc::new(Origin::default());
        let app = Router::new()
            .fallback(serve_fixture)
            .with_state(origin.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
                .unwrap();
        });

        Self {
            addr,
            origin,
            shutdown,
        }
    }

    pub fn route(&self, path: &str, reply: Reply) -> &Self {
        self.origin.routes.insert(path.to_string(), reply);
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn cancel_on(&self, path: &str, token: CancellationToken) {
        if let Ok(mut slot) = self.origin.cancel_on.lock() {
            *slot = Some((path.to_string(), token));
        }
    }

    pub fn hits(&self, path: &str) -> u32 {
        self.origin.hits.get(path).map(|h| *h).unwrap_or(0)
    }

    pub fn total_hits(&self) -> u32 {
        self.origin.hits.iter().map(|h| *h.value()).sum()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn serve_fixture(State(origin): State<Arc<Origin>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let hit = {
        let mut count = origin.hits.entry(path.clone()).or_insert(0);
        *count += 1;
        *count
    };

    if let Ok(slot) = origin.cancel_on.lock() {
        if let Some((trigger, token)) = slot.as_ref() {
            if *trigger == path {
                token.cancel();
            }
        }
    }

    let reply = origin.routes.get(&path).map(|r| r.clone());
    match reply {
        None => StatusCode::NOT_FOUND.into_response(),
        Some(Reply::Body(body)) => body.into_response(),
        Some(Reply::Status(code)) => status(code).into_response(),
        Some(Reply::FailTimes {
            failures,
            status: code,
            body,
        }) => {
            if hit <= failures {
                status(code).into_response()
            } else {
                body.into_response()
            }
        }
        Some(Reply::Truncated(prefix)) => {
            let chunks = futures::stream::iter(vec![
                Ok::<Bytes, io::Error>(prefix),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "origin hung up")),
            ]);
            Body::from_stream(chunks).into_response()
        }
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Master playlist with two stream variants, relative to `/vod/index.m3u8`
pub const MASTER_TWO_VARIANTS: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
720p.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=1400000,RESOLUTION=854x480
480p.m3u8
";

/// Master with one stream variant and an audio rendition
pub const MASTER_WITH_RENDITION: &str = "#EXTM3U
#EXT-X-VERSION:7
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"English\",LANGUAGE=\"en\",DEFAULT=YES,URI=\"audio/en.m3u8\"
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720,AUDIO=\"aud\"
720p.m3u8
";

/// VOD media playlist whose segments live under `<dir>/seg<i>.ts`
pub fn media_playlist(dir: &str, segments: usize) -> String {
    let mut out = String::from(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n#EXT-X-MEDIA-SEQUENCE:0\n#EXT-X-PLAYLIST-TYPE:VOD\n",
    );
    for i in 0..segments {
        out.push_str(&format!("#EXTINF:4.000,\n{}/seg{}.ts\n", dir, i));
    }
    out.push_str("#EXT-X-ENDLIST\n");
    out
}

/// fMP4 media playlist with an init map at `<dir>/init.mp4`
pub fn fmp4_playlist(dir: &str, segments: usize) -> String {
    let mut out = format!(
        "#EXTM3U\n#EXT-X-VERSION:7\n#EXT-X-TARGETDURATION:4\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXT-X-MAP:URI=\"{}/init.mp4\"\n",
        dir
    );
    for i in 0..segments {
        out.push_str(&format!("#EXTINF:4.000,\n{}/seg{}.m4s\n", dir, i));
    }
    out.push_str("#EXT-X-ENDLIST\n");
    out
}

/// Deterministic segment payload
pub fn segment_body(dir: &str, index: usize) -> Bytes {
    Bytes::from(format!("{}-segment-{}", dir, index).repeat(64))
}

/// Origin serving `MASTER_TWO_VARIANTS` with 3 segments per variant
pub async fn two_variant_origin() -> FixtureServer {
    let server = FixtureServer::start().await;
    server.route("/vod/index.m3u8", Reply::text(MASTER_TWO_VARIANTS));
    for dir in ["720p", "480p"] {
        server.route(
            &format!("/vod/{}.m3u8", dir),
            Reply::text(&media_playlist(dir, 3)),
        );
        for i in 0..3 {
            server.route(
                &format!("/vod/{}/seg{}.ts", dir, i),
                Reply::Body(segment_body(dir, i)),
            );
        }
    }
    server
}

/// Master whose variants sit in their own directories as `<dir>/index.m3u8`
pub const MASTER_SUBDIR_VARIANTS: &str = "#EXTM3U
#EXT-X-VERSION:7
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
720p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=1400000,RESOLUTION=854x480
480p/index.m3u8
";

/// fMP4 media playlist with bare segment names and an init map one level up
pub fn sibling_playlist(segments: usize) -> String {
    let mut out = String::from(
        "#EXTM3U\n#EXT-X-VERSION:7\n#EXT-X-TARGETDURATION:4\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXT-X-MAP:URI=\"../init.mp4\"\n",
    );
    for i in 0..segments {
        out.push_str(&format!("#EXTINF:4.000,\nseg{}.m4s\n", i));
    }
    out.push_str("#EXT-X-ENDLIST\n");
    out
}

/// Payload of the init segment shared by `subdir_variant_origin` variants
pub fn init_segment() -> Bytes {
    Bytes::from("ftypmoov".repeat(512))
}

/// Origin serving `MASTER_SUBDIR_VARIANTS`: every variant names its segments
/// `seg0.m4s..seg2.m4s` and shares `/vod/init.mp4`.
pub async fn subdir_variant_origin() -> FixtureServer {
    let server = FixtureServer::start().await;
    server.route("/vod/index.m3u8", Reply::text(MASTER_SUBDIR_VARIANTS));
    server.route("/vod/init.mp4", Reply::Body(init_segment()));
    for dir in ["720p", "480p"] {
        server.route(
            &format!("/vod/{}/index.m3u8", dir),
            Reply::text(&sibling_playlist(3)),
        );
        for i in 0..3 {
            server.route(
                &format!("/vod/{}/seg{}.m4s", dir, i),
                Reply::Body(segment_body(dir, i)),
            );
        }
    }
    server
}

/// Every regular file under `root`, relative and sorted
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_path_buf());
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

/// Files under `root` with the given extension
pub fn files_with_extension(root: &Path, ext: &str) -> Vec<PathBuf> {
    list_files(root)
        .into_iter()
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_server_replies_and_counts() {
        let server = FixtureServer::start().await;
        server.route("/a", Reply::text("hello"));
        server.route(
            "/flaky",
            Reply::FailTimes {
                failures: 1,
                status: 500,
                body: Bytes::from_static(b"ok"),
            },
        );

        let client = reqwest::Client::new();
        let a = client.get(server.url("/a")).send().await.unwrap();
        assert_eq!(a.text().await.unwrap(), "hello");

        let first = client.get(server.url("/flaky")).send().await.unwrap();
        assert_eq!(first.status().as_u16(), 500);
        let second = client.get(server.url("/flaky")).send().await.unwrap();
        assert_eq!(second.status().as_u16(), 200);

        let missing = client.get(server.url("/missing")).send().await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        assert_eq!(server.hits("/flaky"), 2);
        assert_eq!(server.total_hits(), 4);
    }

    #[test]
    fn test_media_playlist_fixture() {
        let playlist = media_playlist("720p", 2);
        assert!(playlist.starts_with("#EXTM3U"));
        assert!(playlist.contains("720p/seg1.ts"));
        assert!(playlist.trim_end().ends_with("#EXT-X-ENDLIST"));
    }
}
