//! Size-targeting search
//!
//! Re-encodes a source through a fixed list of presets, ordered from highest
//! to lowest quality, and keeps the first encoding that fits under a byte
//! ceiling. This is a greedy linear scan, so the number of encodes is bounded
//! by the preset list.
//!
//! Guarantees:
//! - a source already at or under the target is returned untouched and the
//!   encoder is never called
//! - the output is never larger than the source
//! - when every attempt fails, the source is returned

use std::fmt::{Debug, Display};

use tracing::debug;

/// JPEG quality ladder for image re-encoding
pub const IMAGE_QUALITY_PRESETS: [u8; 9] = [85, 75, 65, 55, 45, 35, 25, 15, 10];

/// Rasterization DPI ladder for PDF rebuilds
pub const PDF_DPI_PRESETS: [u32; 8] = [300, 200, 150, 100, 75, 50, 40, 30];

/// JPEG quality ladder applied at each DPI step of a PDF rebuild
pub const PDF_QUALITY_PRESETS: [u8; 9] = [95, 85, 75, 65, 55, 45, 35, 25, 15];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeUnit {
    Kb,
    #[default]
    Mb,
}

impl SizeUnit {
    /// Anything other than `kb` means megabytes
    pub fn from_form(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("kb") {
            SizeUnit::Kb
        } else {
            SizeUnit::Mb
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            SizeUnit::Kb => 1024.0,
            SizeUnit::Mb => 1024.0 * 1024.0,
        }
    }
}

/// A requested output ceiling such as "500 kb"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSize {
    pub size: f64,
    pub unit: SizeUnit,
}

impl TargetSize {
    pub fn new(size: f64, unit: SizeUnit) -> Self {
        Self { size, unit }
    }

    /// Ceiling in bytes. Negative and NaN sizes saturate to zero.
    pub fn bytes(&self) -> u64 {
        (self.size * self.unit.multiplier()).max(0.0) as u64
    }
}

/// How the search settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome<K> {
    /// Source already fit; nothing was encoded
    AlreadyUnderTarget,
    /// First preset whose output fit the target
    Reached(K),
    /// No preset fit; this one produced the smallest output
    Smallest(K),
    /// No preset fit and none beat the source (or all failed)
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct SizeSearchResult<K> {
    pub data: Vec<u8>,
    pub outcome: SearchOutcome<K>,
    /// Number of encoder invocations, failed ones included
    pub attempts: usize,
}

impl<K> SizeSearchResult<K> {
    pub fn reached_target(&self) -> bool {
        matches!(
            self.outcome,
            SearchOutcome::AlreadyUnderTarget | SearchOutcome::Reached(_)
        )
    }

    /// True when `data` is the untouched source
    pub fn is_original(&self) -> bool {
        matches!(
            self.outcome,
            SearchOutcome::AlreadyUnderTarget | SearchOutcome::Unchanged
        )
    }
}

/// Find an encoding of `source` at or under `target_bytes`
///
/// `presets` must be ordered from highest to lowest quality. Encoder errors
/// skip the preset.
pub fn search_under_target<K, E, F>(
    source: &[u8],
    target_bytes: u64,
    presets: &[K],
    mut encode: F,
) -> SizeSearchResult<K>
where
    K: Copy + Debug,
    E: Display,
    F: FnMut(K) -> Result<Vec<u8>, E>,
{
    if source.len() as u64 <= target_bytes {
        return SizeSearchResult {
            data: source.to_vec(),
            outcome: SearchOutcome::AlreadyUnderTarget,
            attempts: 0,
        };
    }

    let mut best: Option<(K, Vec<u8>)> = None;
    let mut attempts = 0;

    for &preset in presets {
        attempts += 1;
        let encoded = match encode(preset) {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!(?preset, "Preset failed to encode: {}", e);
                continue;
            }
        };

        let size = encoded.len() as u64;
        debug!(?preset, size, target_bytes, "Size search attempt");

        if size <= target_bytes {
            return SizeSearchResult {
                data: encoded,
                outcome: SearchOutcome::Reached(preset),
                attempts,
            };
        }

        let smaller = best
            .as_ref()
            .map_or(true, |(_, current)| encoded.len() < current.len());
        if smaller {
            best = Some((preset, encoded));
        }
    }

    match best {
        Some((preset, data)) if data.len() < source.len() => SizeSearchResult {
            data,
            outcome: SearchOutcome::Smallest(preset),
            attempts,
        },
        _ => SizeSearchResult {
            data: source.to_vec(),
            outcome: SearchOutcome::Unchanged,
            attempts,
        },
    }
}
