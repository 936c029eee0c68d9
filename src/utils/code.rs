use rand::Rng;

// No 0/O or 1/I so codes survive being read over the phone.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

/// Human-facing reservation code, e.g. `TR-7KQ2MZ`.
pub fn confirmation_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("TR-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        let code = confirmation_code();
        assert_eq!(code.len(), 3 + CODE_LEN);
        assert!(code.starts_with("TR-"));
        assert!(code[3..].bytes().all(|b| ALPHABET.contains(&b)));
    }
}
