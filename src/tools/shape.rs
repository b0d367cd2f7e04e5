//! Reshaping of raw catalog payloads into the flat records returned by the tools.
//!
//! Every field is optional on the way in, and `null` counts as missing. Missing values fall back
//! to `"Unknown"` for names, `0` for numbers, and empty collections, so one sparse item never
//! costs the rest of the page.

// self
use crate::_prelude::*;

const UNKNOWN: &str = "Unknown";

fn unknown() -> String {
	UNKNOWN.into()
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Page<T> {
	#[serde(default)]
	items: Option<Vec<Option<T>>>,
	#[serde(default)]
	total: Option<u64>,
}
impl<T> Default for Page<T> {
	fn default() -> Self {
		Self { items: None, total: None }
	}
}

#[derive(Debug, Deserialize)]
struct NamedRef {
	#[serde(default)]
	name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	artists: Option<Vec<Option<NamedRef>>>,
	#[serde(default)]
	album: Option<NamedRef>,
	#[serde(default)]
	duration_ms: Option<u64>,
	#[serde(default)]
	popularity: Option<u64>,
	#[serde(default)]
	preview_url: Option<String>,
	#[serde(default)]
	external_urls: Option<Map<String, Value>>,
	#[serde(default)]
	id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Followers {
	#[serde(default)]
	total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	genres: Option<Vec<Option<String>>>,
	#[serde(default)]
	popularity: Option<u64>,
	#[serde(default)]
	followers: Option<Followers>,
	#[serde(default)]
	external_urls: Option<Map<String, Value>>,
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	images: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct TrackSearch {
	#[serde(default)]
	tracks: Option<Page<RawTrack>>,
}

#[derive(Debug, Deserialize)]
struct ArtistSearch {
	#[serde(default)]
	artists: Option<Page<RawArtist>>,
}

#[derive(Debug, Deserialize)]
struct TopTracks {
	#[serde(default)]
	tracks: Option<Vec<Option<RawTrack>>>,
}

/// Flattened track record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
	/// Track title.
	pub name: String,
	/// Names of the performing artists, in upstream order.
	pub artists: Vec<String>,
	/// Album title.
	pub album: String,
	/// Duration in milliseconds.
	pub duration_ms: u64,
	/// Popularity score (0-100).
	pub popularity: u64,
	/// 30-second preview URL, when available.
	pub preview_url: Option<String>,
	/// External URLs keyed by platform.
	pub external_urls: Map<String, Value>,
	/// Catalog identifier.
	pub id: Option<String>,
}
impl From<RawTrack> for Track {
	fn from(raw: RawTrack) -> Self {
		Self {
			name: raw.name.unwrap_or_else(unknown),
			artists: raw
				.artists
				.unwrap_or_default()
				.into_iter()
				.flatten()
				.filter_map(|artist| artist.name)
				.collect(),
			album: raw.album.and_then(|album| album.name).unwrap_or_else(unknown),
			duration_ms: raw.duration_ms.unwrap_or_default(),
			popularity: raw.popularity.unwrap_or_default(),
			preview_url: raw.preview_url,
			external_urls: raw.external_urls.unwrap_or_default(),
			id: raw.id,
		}
	}
}

/// Flattened artist record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
	/// Artist name.
	pub name: String,
	/// Genre labels.
	pub genres: Vec<String>,
	/// Popularity score (0-100).
	pub popularity: u64,
	/// Follower count.
	pub followers: u64,
	/// External URLs keyed by platform.
	pub external_urls: Map<String, Value>,
	/// Catalog identifier.
	pub id: Option<String>,
	/// Image descriptors, passed through untouched.
	pub images: Vec<Value>,
}
impl From<RawArtist> for Artist {
	fn from(raw: RawArtist) -> Self {
		Self {
			name: raw.name.unwrap_or_else(unknown),
			genres: raw.genres.unwrap_or_default().into_iter().flatten().collect(),
			popularity: raw.popularity.unwrap_or_default(),
			followers: raw.followers.and_then(|followers| followers.total).unwrap_or_default(),
			external_urls: raw.external_urls.unwrap_or_default(),
			id: raw.id,
			images: raw.images.unwrap_or_default(),
		}
	}
}

/// Result of `search_tracks`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackResults {
	/// Matching tracks.
	pub tracks: Vec<Track>,
	/// Total number of matches reported upstream.
	pub total: u64,
}

/// Result of `search_artists`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistResults {
	/// Matching artists.
	pub artists: Vec<Artist>,
	/// Total number of matches reported upstream.
	pub total: u64,
}

/// Result of `get_artist_top_tracks`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTrackResults {
	/// Top tracks in upstream order.
	pub tracks: Vec<Track>,
}

/// Describes where a catalog payload stopped matching the expected shape.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("unexpected payload at `{path}`: {detail}")]
pub struct ShapeError {
	/// JSON path of the offending value.
	pub path: String,
	/// Deserializer message.
	pub detail: String,
}

fn decode<T>(payload: Value) -> Result<T, ShapeError>
where
	T: for<'de> Deserialize<'de>,
{
	serde_path_to_error::deserialize(payload)
		.map_err(|e| ShapeError { path: e.path().to_string(), detail: e.inner().to_string() })
}

/// Reshapes a `/search?type=track` payload.
pub fn track_results(payload: Value) -> Result<TrackResults, ShapeError> {
	let page = decode::<TrackSearch>(payload)?.tracks.unwrap_or_default();

	Ok(TrackResults {
		tracks: page.items.unwrap_or_default().into_iter().flatten().map(Track::from).collect(),
		total: page.total.unwrap_or_default(),
	})
}

/// Reshapes a `/search?type=artist` payload.
pub fn artist_results(payload: Value) -> Result<ArtistResults, ShapeError> {
	let page = decode::<ArtistSearch>(payload)?.artists.unwrap_or_default();

	Ok(ArtistResults {
		artists: page.items.unwrap_or_default().into_iter().flatten().map(Artist::from).collect(),
		total: page.total.unwrap_or_default(),
	})
}

/// Reshapes an `/artists/{id}/top-tracks` payload.
pub fn top_track_results(payload: Value) -> Result<TopTrackResults, ShapeError> {
	let top = decode::<TopTracks>(payload)?;

	Ok(TopTrackResults {
		tracks: top.tracks.unwrap_or_default().into_iter().flatten().map(Track::from).collect(),
	})
}
