use rand::Rng;
use std::sync::Arc;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const PNR_LENGTH: usize = 6;

/// Random booking code. Uniqueness is enforced by the store, not here.
pub fn generate_pnr() -> String {
    let mut rng = rand::thread_rng();
    (0..PNR_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Source of candidate booking codes.
pub type PnrGenerator = Arc<dyn Fn() -> String + Send + Sync>;

pub fn is_valid_pnr(code: &str) -> bool {
    code.len() == PNR_LENGTH && code.bytes().all(|b| ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_use_alphabet() {
        for _ in 0..200 {
            let pnr = generate_pnr();
            assert!(is_valid_pnr(&pnr), "{}", pnr);
        }
    }

    #[test]
    fn test_rejects_malformed_codes() {
        assert!(!is_valid_pnr("abc123"));
        assert!(!is_valid_pnr("ABC12"));
        assert!(!is_valid_pnr("ABC-12"));
    }
}
