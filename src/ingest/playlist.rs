//! Playlist classification and re-serialization
//!
//! Thin layer over `m3u8_rs` that exposes what the ingest engine needs:
//! the ordered variant references of a master playlist, the ordered segment
//! references of a media playlist, and the ability to rewrite those URIs
//! before writing the playlist back out.

use thiserror::Error;

/// Why a fetched body is not a usable playlist
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("empty response body")]
    Empty,

    #[error("missing #EXTM3U header")]
    MissingHeader,

    #[error("malformed playlist")]
    Malformed,
}

/// A fetched playlist, classified by its tags
#[derive(Debug, Clone)]
pub enum Playlist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

impl Playlist {
    /// Decode raw bytes into a master or media playlist.
    pub fn classify(bytes: &[u8]) -> Result<Self, ClassifyError> {
        let trimmed = strip_bom(bytes);
        if trimmed.iter().all(u8::is_ascii_whitespace) {
            return Err(ClassifyError::Empty);
        }
        if !trimmed.starts_with(b"#EXTM3U") {
            return Err(ClassifyError::MissingHeader);
        }
        match m3u8_rs::parse_playlist_res(trimmed) {
            Ok(m3u8_rs::Playlist::MasterPlaylist(inner)) => {
                Ok(Playlist::Master(MasterPlaylist { inner }))
            }
            Ok(m3u8_rs::Playlist::MediaPlaylist(inner)) => {
                Ok(Playlist::Media(MediaPlaylist { inner }))
            }
            Err(_) => Err(ClassifyError::Malformed),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Playlist::Master(_) => "master",
            Playlist::Media(_) => "media",
        }
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// What a variant reference points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantKind {
    /// `#EXT-X-STREAM-INF`
    Stream { bandwidth: u64 },
    /// `#EXT-X-I-FRAME-STREAM-INF`
    IFrame { bandwidth: u64 },
    /// `#EXT-X-MEDIA` with a URI (alternate audio, subtitles, ...)
    Rendition { media_type: String, group_id: String },
}

/// One child playlist referenced from a master playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRef {
    pub uri: String,
    pub kind: VariantKind,
}

/// One media segment referenced from a media playlist
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRef {
    pub uri: String,
    pub duration: f32,
}

#[derive(Debug, Clone)]
pub struct MasterPlaylist {
    inner: m3u8_rs::MasterPlaylist,
}

impl MasterPlaylist {
    /// Variant streams in playlist order, followed by renditions carrying a URI.
    pub fn variants(&self) -> Vec<VariantRef> {
        let streams = self.inner.variants.iter().map(|v| VariantRef {
            uri: v.uri.clone(),
            kind: if v.is_i_frame {
                VariantKind::IFrame {
                    bandwidth: v.bandwidth,
                }
            } else {
                VariantKind::Stream {
                    bandwidth: v.bandwidth,
                }
            },
        });
        let renditions = self.inner.alternatives.iter().filter_map(|alt| {
            alt.uri.as_ref().map(|uri| VariantRef {
                uri: uri.clone(),
                kind: VariantKind::Rendition {
                    media_type: alt.media_type.to_string(),
                    group_id: alt.group_id.clone(),
                },
            })
        });
        streams.chain(renditions).collect()
    }

    /// Replace every variant URI, visiting them in the order of [`variants`].
    ///
    /// [`variants`]: MasterPlaylist::variants
    pub fn rewrite_uris<F>(&mut self, mut rewrite: F)
    where
        F: FnMut(usize, &str) -> String,
    {
        let mut index = 0;
        for variant in self.inner.variants.iter_mut() {
            variant.uri = rewrite(index, &variant.uri);
            index += 1;
        }
        for alt in self.inner.alternatives.iter_mut() {
            if let Some(uri) = alt.uri.as_mut() {
                *uri = rewrite(index, uri);
                index += 1;
            }
        }
    }

    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.inner.write_to(&mut buf)?;
        Ok(buf)
    }
}

#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    inner: m3u8_rs::MediaPlaylist,
}

impl MediaPlaylist {
    pub fn segments(&self) -> Vec<SegmentRef> {
        self.inner
            .segments
            .iter()
            .map(|s| SegmentRef {
                uri: s.uri.clone(),
                duration: s.duration,
            })
            .collect()
    }

    /// Distinct `#EXT-X-MAP` initialization segment URIs, first-seen order.
    pub fn init_maps(&self) -> Vec<String> {
        let mut maps: Vec<String> = Vec::new();
        let header_map = self.header_map().and_then(|tag| {
            let rest = tag.rest.as_deref()?;
            uri_attr_range(rest).map(|range| rest[range].to_string())
        });
        let segment_maps = self
            .inner
            .segments
            .iter()
            .filter_map(|s| s.map.as_ref().map(|m| m.uri.clone()));
        for uri in header_map.into_iter().chain(segment_maps) {
            if !maps.contains(&uri) {
                maps.push(uri);
            }
        }
        maps
    }

    /// Replace every segment and init map URI.
    pub fn rewrite_uris<F>(&mut self, mut rewrite: F)
    where
        F: FnMut(&str) -> String,
    {
        if let Some(rest) = self.header_map_mut().and_then(|tag| tag.rest.as_mut()) {
            if let Some(range) = uri_attr_range(rest) {
                let uri = rewrite(&rest[range.clone()]);
                rest.replace_range(range, &uri);
            }
        }
        for segment in self.inner.segments.iter_mut() {
            segment.uri = rewrite(&segment.uri);
            if let Some(map) = segment.map.as_mut() {
                map.uri = rewrite(&map.uri);
            }
        }
    }

    // An EXT-X-MAP ahead of the first segment ends up in `unknown_tags`.
    fn header_map(&self) -> Option<&m3u8_rs::ExtTag> {
        self.inner.unknown_tags.iter().find(|t| t.tag == "X-MAP")
    }

    fn header_map_mut(&mut self) -> Option<&mut m3u8_rs::ExtTag> {
        self.inner.unknown_tags.iter_mut().find(|t| t.tag == "X-MAP")
    }

    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.inner.write_to(&mut buf)?;
        Ok(buf)
    }
}

/// Byte range of the quoted `URI` attribute value in a tag's attribute list.
fn uri_attr_range(attrs: &str) -> Option<std::ops::Range<usize>> {
    let mut from = 0;
    while let Some(pos) = attrs[from..].find("URI=\"") {
        let at = from + pos;
        let start = at + "URI=\"".len();
        if at == 0 || attrs[..at].ends_with(',') {
            let len = attrs[start..].find('"')?;
            return Some(start..start + len);
        }
        from = start;
    }
    None
}
