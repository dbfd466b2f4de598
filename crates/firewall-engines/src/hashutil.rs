//! Small hashing helpers shared by the engines.

use sha2::{Digest, Sha256};

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Shannon entropy in bits/byte over a raw byte slice.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u32; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_of_uniform_bytes_is_zero() {
        assert_eq!(shannon_entropy(b"aaaaaaaa"), 0.0);
    }

    #[test]
    fn entropy_of_empty_is_zero() {
        assert_eq!(shannon_entropy(b""), 0.0);
    }

    #[test]
    fn entropy_of_random_looking_hex_is_high() {
        // 64 hex chars of "random" digits -> 16 distinct symbols, roughly
        // uniform -> close to log2(16) = 4.0 bits/byte.
        let s = b"3f8a01c7e4b2d9506af13c8e7b0924d5e1a6c3f8901b7d4e25a6f8c03b1d9e47";
        let e = shannon_entropy(s);
        assert!(e > 3.5, "expected high entropy, got {e}");
    }
}
