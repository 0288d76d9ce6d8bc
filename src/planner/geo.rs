//! Geohash support for geospatial function predicates
//!
//! Geo field values are stored as base-32 geohash strings. A bounding box is
//! covered by a set of geohash cells; each cell becomes one prefix range over
//! the field index. A scanned value is kept when its decoded cell touches the
//! box; the exact point test belongs to document-level evaluation.

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Longest geohash the cover will use
pub const MAX_PRECISION: usize = 12;

/// Name of the bounding box function
pub const WITHIN_BOUNDING_BOX: &str = "geo:within_bounding_box";

/// Axis-aligned box in degrees. Does not cross the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a box, rejecting out-of-range or inverted corners
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, String> {
        let lon_ok = |v: f64| (-180.0..=180.0).contains(&v);
        let lat_ok = |v: f64| (-90.0..=90.0).contains(&v);
        if !(lon_ok(min_lon) && lon_ok(max_lon) && lat_ok(min_lat) && lat_ok(max_lat)) {
            return Err("coordinates out of range".into());
        }
        if min_lon > max_lon || min_lat > max_lat {
            return Err("inverted bounding box".into());
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Parse `[minLon, minLat, maxLon, maxLat]`
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() != 4 {
            return Err(format!("expected 4 coordinates, got {}", args.len()));
        }
        let mut coords = [0.0f64; 4];
        for (slot, arg) in coords.iter_mut().zip(args) {
            *slot = arg
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a coordinate", arg))?;
        }
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    /// Returns true if the point lies inside the box (edges included)
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Returns true if the boxes share at least one point (edges included)
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }
}

fn axis_bits(precision: usize) -> (u32, u32) {
    let bits = (precision * 5) as u32;
    ((bits + 1) / 2, bits / 2)
}

fn cell_index(v: f64, min: f64, max: f64, bits: u32) -> u64 {
    let cells = 1u64 << bits;
    let scaled = ((v - min) / (max - min) * cells as f64).floor();
    if scaled <= 0.0 {
        0
    } else {
        (scaled as u64).min(cells - 1)
    }
}

fn hash_from_indices(ix: u64, iy: u64, precision: usize) -> String {
    let (lon_bits, lat_bits) = axis_bits(precision);
    let mut out = String::with_capacity(precision);
    let mut acc = 0usize;
    for i in 0..(precision * 5) as u32 {
        let bit = if i % 2 == 0 {
            (ix >> (lon_bits - 1 - i / 2)) & 1
        } else {
            (iy >> (lat_bits - 1 - i / 2)) & 1
        };
        acc = (acc << 1) | bit as usize;
        if i % 5 == 4 {
            out.push(BASE32[acc] as char);
            acc = 0;
        }
    }
    out
}

/// Encode a point at the given precision (1..=12 characters)
pub fn encode(lon: f64, lat: f64, precision: usize) -> String {
    let precision = precision.clamp(1, MAX_PRECISION);
    let (lon_bits, lat_bits) = axis_bits(precision);
    let ix = cell_index(lon, -180.0, 180.0, lon_bits);
    let iy = cell_index(lat, -90.0, 90.0, lat_bits);
    hash_from_indices(ix, iy, precision)
}

/// Decode a geohash to the bounds of its cell.
///
/// Hashes longer than [`MAX_PRECISION`] are truncated; their cell lies
/// inside the truncated one.
pub fn decode(hash: &str) -> Option<BoundingBox> {
    let hash = hash.get(..hash.len().min(MAX_PRECISION))?;
    if hash.is_empty() {
        return None;
    }
    let (mut ix, mut iy) = (0u64, 0u64);
    let mut i = 0u32;
    for c in hash.bytes() {
        let value = BASE32.iter().position(|&b| b == c)? as u64;
        for shift in (0..5).rev() {
            let bit = (value >> shift) & 1;
            if i % 2 == 0 {
                ix = (ix << 1) | bit;
            } else {
                iy = (iy << 1) | bit;
            }
            i += 1;
        }
    }
    let (lon_bits, lat_bits) = axis_bits(hash.len());
    let lon_step = 360.0 / (1u64 << lon_bits) as f64;
    let lat_step = 180.0 / (1u64 << lat_bits) as f64;
    Some(BoundingBox {
        min_lon: -180.0 + ix as f64 * lon_step,
        min_lat: -90.0 + iy as f64 * lat_step,
        max_lon: -180.0 + (ix + 1) as f64 * lon_step,
        max_lat: -90.0 + (iy + 1) as f64 * lat_step,
    })
}

/// Geohash cells covering `bbox`, sorted and de-duplicated.
///
/// Uses the finest precision whose cover has at most `max_cells` cells.
/// Returns `None` when even the precision 1 cover is larger than that.
pub fn cover(bbox: &BoundingBox, max_cells: usize) -> Option<Vec<String>> {
    let grid = |precision: usize| {
        let (lon_bits, lat_bits) = axis_bits(precision);
        let x0 = cell_index(bbox.min_lon, -180.0, 180.0, lon_bits);
        let x1 = cell_index(bbox.max_lon, -180.0, 180.0, lon_bits);
        let y0 = cell_index(bbox.min_lat, -90.0, 90.0, lat_bits);
        let y1 = cell_index(bbox.max_lat, -90.0, 90.0, lat_bits);
        (x0, x1, y0, y1)
    };
    let count = |(x0, x1, y0, y1): (u64, u64, u64, u64)| (x1 - x0 + 1).saturating_mul(y1 - y0 + 1);

    if count(grid(1)) > max_cells as u64 {
        return None;
    }
    let mut precision = 1;
    while precision < MAX_PRECISION && count(grid(precision + 1)) <= max_cells as u64 {
        precision += 1;
    }

    let (x0, x1, y0, y1) = grid(precision);
    let mut cells = Vec::new();
    for ix in x0..=x1 {
        for iy in y0..=y1 {
            cells.push(hash_from_indices(ix, iy, precision));
        }
    }
    cells.sort();
    cells.dedup();
    Some(cells)
}
