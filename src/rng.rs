//! Seeded randomness for cosmetic draws.
//!
//! A render never touches global random state: the caller hands the
//! rasterizer an [`RngStream`] derived from a seed, so the dot texture of a
//! preview and of its export are reproducible from that seed alone.

/// Stream name used by the rasterizer's background texture.
pub const DOT_TEXTURE_STREAM: &str = "dot-texture";

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const XORSHIFT_STAR: u64 = 0x2545_F491_4F6C_DD1D;
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Root of all streams for one render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngService {
    seed: u64,
}

/// xorshift64* generator. The state is never zero.
#[derive(Debug, Clone, Copy)]
pub struct RngStream {
    state: u64,
}

impl RngService {
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    pub fn derive_stream(&self, stream_id: u64) -> RngStream {
        RngStream::from_state(mix(self.seed ^ stream_id))
    }

    pub fn derive_stream_by_name(&self, name: &str) -> RngStream {
        self.derive_stream(name_hash(name))
    }

    pub fn dot_texture(&self) -> RngStream {
        self.derive_stream_by_name(DOT_TEXTURE_STREAM)
    }
}

impl RngStream {
    fn from_state(state: u64) -> Self {
        Self {
            state: if state == 0 { GOLDEN_GAMMA } else { state },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(XORSHIFT_STAR)
    }

    /// High half of the next output; the low bits of xorshift64* are weaker.
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform in `[0, 1)` with 24 bits of precision, so it never rounds up to 1.
    pub fn next_f32_01(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }

    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32_01()
    }

    /// Uniform integer in `[min, max]`. An empty or inverted range yields `min`.
    pub fn range_u32_inclusive(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        let span = u64::from(max - min) + 1;
        // multiply-shift keeps the result below `span` without a modulo
        min + ((u64::from(self.next_u32()) * span) >> 32) as u32
    }
}

// SplitMix64 finaliser: spreads nearby seeds and stream ids across the state space.
fn mix(x: u64) -> u64 {
    let mut z = x.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// FNV-1a over the stream name.
fn name_hash(name: &str) -> u64 {
    name.bytes().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_state_is_replaced() {
        let mut s = RngStream::from_state(0);
        assert_ne!(s.next_u64(), 0);
    }

    #[test]
    fn names_hash_apart() {
        assert_ne!(name_hash(DOT_TEXTURE_STREAM), name_hash("glow"));
        assert_eq!(name_hash(""), FNV_OFFSET);
    }
}
