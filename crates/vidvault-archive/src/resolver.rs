//! Stream resolution: turn a manifest into a byte stream, failing over to
//! backup replicas when the primary cannot serve.
//!
//! Single placements honor byte ranges when the serving destination does;
//! chunked placements always stream the full content in strict chunk order,
//! reconstructed lazily one chunk at a time. A chunk that cannot be opened
//! anywhere ends the stream with a reconstruction error carrying the byte
//! offset reached so far.

use crate::destinations::Destinations;
use crate::error::ArchiveError;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use vidvault_core::{ByteRange, Manifest, ManifestState, Placement};
use vidvault_storage::{BlobStore, ByteStream};

pub type VideoStream = Pin<Box<dyn Stream<Item = Result<Bytes, ArchiveError>> + Send>>;

/// A resolved content stream plus what the transport layer needs to frame it.
pub struct ResolvedStream {
    pub stream: VideoStream,
    /// Exact number of bytes the stream will carry.
    pub declared_length: u64,
    /// Whether a requested range was applied. When false the stream carries
    /// the full content and the caller must not emit a partial response.
    pub range_honored: bool,
}

type Candidate = (Arc<dyn BlobStore>, Placement);

pub struct StreamResolver {
    destinations: Arc<Destinations>,
}

impl StreamResolver {
    pub fn new(destinations: Arc<Destinations>) -> Self {
        StreamResolver { destinations }
    }

    /// Resolve a manifest to a byte stream, optionally restricted to `range`.
    pub async fn resolve(
        &self,
        manifest: &Manifest,
        range: Option<ByteRange>,
    ) -> Result<ResolvedStream, ArchiveError> {
        if manifest.state != ManifestState::Available {
            return Err(ArchiveError::ContentUnavailable(format!(
                "video is {}",
                manifest.state
            )));
        }
        let primary_placement = manifest
            .placement
            .clone()
            .ok_or_else(|| ArchiveError::ContentUnavailable("no primary placement".to_string()))?;

        match primary_placement {
            Placement::Single { .. } => {
                let candidates = self.single_candidates(manifest, primary_placement);
                match self.resolve_single(candidates, range).await {
                    Err(ArchiveError::ContentUnavailable(_)) => {
                        // No single-object copy is readable. A chunk-shaped
                        // replica can still serve the full body, without
                        // range support.
                        let fallback = self.chunked_replicas(manifest);
                        if fallback.is_empty() {
                            return Err(ArchiveError::ContentUnavailable(
                                "no destination could serve the content".to_string(),
                            ));
                        }
                        tracing::warn!(
                            video_id = %manifest.video_id,
                            "No single-object copy readable, serving from a chunked replica"
                        );
                        resolve_chunked(fallback, manifest.total_size).await
                    }
                    other => other,
                }
            }
            Placement::Chunked { .. } => {
                let candidates = self.chunked_candidates(manifest, primary_placement);
                resolve_chunked(candidates, manifest.total_size).await
            }
        }
    }

    /// Destinations able to serve a single placement: the primary, then every
    /// succeeded replica that also stored the content as one object.
    fn single_candidates(&self, manifest: &Manifest, primary: Placement) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        if let Some(store) = self.destinations.get(&manifest.primary_destination) {
            candidates.push((store.clone(), primary));
        }
        for replica in manifest.succeeded_replicas() {
            let Some(store) = self.destinations.get(&replica.destination) else {
                continue;
            };
            match replica.placement.clone() {
                Some(placement @ Placement::Single { .. }) => {
                    candidates.push((store.clone(), placement));
                }
                _ => tracing::debug!(
                    destination = %replica.destination,
                    "Replica is chunk-shaped, held back for the full-stream fallback"
                ),
            }
        }
        candidates
    }

    /// Chunk-shaped succeeded replicas, for serving a single-placement video
    /// whose single-object copies are all unreadable. The first such replica
    /// sets the chunk boundaries; later ones join only when they match.
    fn chunked_replicas(&self, manifest: &Manifest) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = Vec::new();
        for replica in manifest.succeeded_replicas() {
            let Some(store) = self.destinations.get(&replica.destination) else {
                continue;
            };
            let Some(placement @ Placement::Chunked { .. }) = replica.placement.clone() else {
                continue;
            };
            match candidates.first() {
                Some((_, reference)) if !chunk_compatible(reference, &placement) => {
                    tracing::debug!(
                        destination = %replica.destination,
                        "Replica chunk boundaries differ, skipping for failover"
                    );
                }
                _ => candidates.push((store.clone(), placement)),
            }
        }
        candidates
    }

    /// Destinations able to serve per-chunk failover: replicas whose chunk
    /// boundaries match the primary's exactly.
    fn chunked_candidates(&self, manifest: &Manifest, primary: Placement) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for replica in manifest.succeeded_replicas() {
            let Some(store) = self.destinations.get(&replica.destination) else {
                continue;
            };
            match replica.placement.clone() {
                Some(placement) if chunk_compatible(&primary, &placement) => {
                    candidates.push((store.clone(), placement));
                }
                _ => tracing::debug!(
                    destination = %replica.destination,
                    "Replica chunk boundaries differ from primary, skipping for failover"
                ),
            }
        }
        if let Some(store) = self.destinations.get(&manifest.primary_destination) {
            candidates.insert(0, (store.clone(), primary));
        }
        candidates
    }

    async fn resolve_single(
        &self,
        candidates: Vec<Candidate>,
        range: Option<ByteRange>,
    ) -> Result<ResolvedStream, ArchiveError> {
        for (store, placement) in &candidates {
            let Placement::Single { blob } = placement else {
                continue;
            };
            // A range that clamps to nothing (start at or past the end of
            // the object) degrades to the full stream, as if unranged.
            let effective = if store.supports_ranges() {
                range.and_then(|r| r.clamp(blob.size))
            } else {
                None
            };
            let honored = effective.is_some();

            match store.get(blob, effective).await {
                Ok(stream) => {
                    let declared_length = match effective {
                        Some(r) => r.len(),
                        None => blob.size,
                    };
                    return Ok(ResolvedStream {
                        stream: Box::pin(stream.map(|item| item.map_err(ArchiveError::from))),
                        declared_length,
                        range_honored: honored,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        destination = %store.destination_id(),
                        key = %blob.key,
                        error = %e,
                        "Destination could not serve, failing over"
                    );
                }
            }
        }

        Err(ArchiveError::ContentUnavailable(
            "no destination could serve the content".to_string(),
        ))
    }
}

/// Whether `other` can substitute for `primary` chunk-for-chunk.
fn chunk_compatible(primary: &Placement, other: &Placement) -> bool {
    match (primary, other) {
        (Placement::Chunked { chunks: a }, Placement::Chunked { chunks: b }) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| x.index == y.index && x.blob.size == y.blob.size)
        }
        _ => false,
    }
}

struct ChunkCursor {
    candidates: Vec<Candidate>,
    chunk_count: u32,
    index: u32,
    offset: u64,
    inner: Option<ByteStream>,
}

async fn resolve_chunked(
    candidates: Vec<Candidate>,
    total_size: u64,
) -> Result<ResolvedStream, ArchiveError> {
    let chunk_count = match candidates.first() {
        Some((_, Placement::Chunked { chunks })) => chunks.len() as u32,
        _ => {
            return Err(ArchiveError::ContentUnavailable(
                "no destination could serve the content".to_string(),
            ))
        }
    };

    // Open the first chunk eagerly so a completely unreachable video fails
    // before any response bytes are committed.
    let first = open_chunk(&candidates, 0)
        .await
        .ok_or(ArchiveError::Reconstruction { offset: 0 })?;

    let cursor = ChunkCursor {
        candidates,
        chunk_count,
        index: 0,
        offset: 0,
        inner: Some(first),
    };

    let stream = futures::stream::try_unfold(cursor, |mut cursor| async move {
        loop {
            if let Some(inner) = cursor.inner.as_mut() {
                match inner.next().await {
                    Some(Ok(bytes)) => {
                        cursor.offset += bytes.len() as u64;
                        return Ok(Some((bytes, cursor)));
                    }
                    Some(Err(e)) => {
                        tracing::error!(
                            chunk = cursor.index,
                            offset = cursor.offset,
                            error = %e,
                            "Chunk read failed mid-stream"
                        );
                        return Err(ArchiveError::Reconstruction {
                            offset: cursor.offset,
                        });
                    }
                    None => {
                        cursor.inner = None;
                        cursor.index += 1;
                    }
                }
            }

            if cursor.index >= cursor.chunk_count {
                return Ok(None);
            }

            match open_chunk(&cursor.candidates, cursor.index).await {
                Some(stream) => cursor.inner = Some(stream),
                None => {
                    return Err(ArchiveError::Reconstruction {
                        offset: cursor.offset,
                    })
                }
            }
        }
    });

    Ok(ResolvedStream {
        stream: Box::pin(stream),
        declared_length: total_size,
        range_honored: false,
    })
}

/// Open one chunk, trying each candidate in order. A transient failure at a
/// candidate gets one immediate retry before moving on.
async fn open_chunk(candidates: &[Candidate], index: u32) -> Option<ByteStream> {
    for (store, placement) in candidates {
        let Some(chunk) = placement.chunk(index) else {
            continue;
        };
        for attempt in 0..2u8 {
            match store.get(&chunk.blob, None).await {
                Ok(stream) => return Some(stream),
                Err(e) if e.is_transient() && attempt == 0 => {
                    tracing::warn!(
                        destination = %store.destination_id(),
                        chunk = index,
                        error = %e,
                        "Chunk open failed, retrying"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        destination = %store.destination_id(),
                        chunk = index,
                        error = %e,
                        "Chunk open failed, trying next destination"
                    );
                    break;
                }
            }
        }
    }
    None
}
