//! Encoded polyline codec
//!
//! Implements the delta/zig-zag/base-64-ish text encoding popularised by map APIs, generalised
//! to points of any fixed dimension. Each value is quantized to `10^-precision` units, encoded
//! as the difference from the same dimension of the previous point, zig-zag mapped to an
//! unsigned integer and emitted in 5-bit groups offset into printable ASCII (`?`..`~`).
//!
//! Small deltas therefore cost few characters. Callers that want to reuse the codec for
//! non-geographic data (e.g. elevation profiles) pre-scale their values into the same numeric
//! range as degrees.
//!
//! Quantization is lossy: anything below `10^-precision` is rounded away, and out-of-range or
//! non-finite values are clamped by the integer conversion rather than reported.

/// Default number of decimal digits kept by [`encode`] / [`decode`]
pub const DEFAULT_PRECISION: u32 = 5;

const CHAR_OFFSET: u8 = 63;
const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: u64 = 0x1f;
const CONTINUATION: u64 = 0x20;

/// Errors produced when decoding a malformed polyline
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolylineError {
    #[error("invalid character {byte:#04x} at position {position}")]
    InvalidCharacter { position: usize, byte: u8 },

    #[error("polyline ends in the middle of a value")]
    Truncated,

    #[error("value at position {position} overflows 64 bits")]
    Overflow { position: usize },

    #[error("{values} values cannot be grouped into points of dimension {dimension}")]
    DimensionMismatch { values: usize, dimension: usize },
}

/// Encode points with the default precision of 5 decimal digits
pub fn encode<const N: usize>(points: &[[f64; N]]) -> String {
    encode_with_precision(points, DEFAULT_PRECISION)
}

/// Decode a polyline produced by [`encode`]
pub fn decode<const N: usize>(encoded: &str) -> Result<Vec<[f64; N]>, PolylineError> {
    decode_with_precision(encoded, DEFAULT_PRECISION)
}

/// Encode points keeping `precision` decimal digits
pub fn encode_with_precision<const N: usize>(points: &[[f64; N]], precision: u32) -> String {
    let factor = 10f64.powi(precision as i32);
    let mut out = String::with_capacity(points.len() * N * 4);
    let mut previous = [0i64; N];

    for point in points {
        for (value, prev) in point.iter().zip(previous.iter_mut()) {
            let quantized = quantize(*value, factor);
            write_value(quantized.wrapping_sub(*prev), &mut out);
            *prev = quantized;
        }
    }

    out
}

/// Decode a polyline that was encoded keeping `precision` decimal digits
pub fn decode_with_precision<const N: usize>(
    encoded: &str,
    precision: u32,
) -> Result<Vec<[f64; N]>, PolylineError> {
    let factor = 10f64.powi(precision as i32);
    let bytes = encoded.as_bytes();
    let mut points = Vec::with_capacity(bytes.len() / (N * 2).max(1));
    let mut current = [0i64; N];
    let mut point = [0f64; N];
    let mut dimension = 0;
    let mut values = 0;
    let mut position = 0;

    while position < bytes.len() {
        let (delta, consumed) = read_value(bytes, position)?;
        position += consumed;
        values += 1;

        current[dimension] = current[dimension].wrapping_add(delta);
        point[dimension] = current[dimension] as f64 / factor;
        dimension += 1;

        if dimension == N {
            points.push(point);
            dimension = 0;
        }
    }

    if dimension != 0 {
        return Err(PolylineError::DimensionMismatch {
            values,
            dimension: N,
        });
    }

    Ok(points)
}

/// Round a value to the grid used by the codec, returning it in the original units
#[inline]
pub fn round_to_precision(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    quantize(value, factor) as f64 / factor
}

#[inline]
fn quantize(value: f64, factor: f64) -> i64 {
    // `as` saturates and maps NaN to 0
    (value * factor).round() as i64
}

fn write_value(delta: i64, out: &mut String) {
    // Zig-zag: small magnitudes of either sign map to small unsigned values
    let mut value = ((delta << 1) ^ (delta >> 63)) as u64;

    while value >= CONTINUATION {
        out.push(char::from(
            ((CONTINUATION | (value & CHUNK_MASK)) as u8) + CHAR_OFFSET,
        ));
        value >>= CHUNK_BITS;
    }
    out.push(char::from(value as u8 + CHAR_OFFSET));
}

fn read_value(bytes: &[u8], start: usize) -> Result<(i64, usize), PolylineError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    let mut position = start;

    loop {
        let byte = *bytes.get(position).ok_or(PolylineError::Truncated)?;
        if !(CHAR_OFFSET..=b'~').contains(&byte) {
            return Err(PolylineError::InvalidCharacter { position, byte });
        }
        if shift >= u64::BITS {
            return Err(PolylineError::Overflow { position: start });
        }

        let chunk = u64::from(byte - CHAR_OFFSET);
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;
        position += 1;

        if chunk < CONTINUATION {
            break;
        }
    }

    let value = ((result >> 1) as i64) ^ -((result & 1) as i64);
    Ok((value, position - start))
}
