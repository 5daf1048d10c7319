use sha2::{Digest, Sha256};

const POOL: [&str; 8] = [
    "Momentum is real; keep the edits small and verified.",
    "The last changes held. Push the next step.",
    "Errors are piling up; read before writing again.",
    "Pressure is building. Narrow the scope.",
    "Stable ground. Land the current change before widening it.",
    "The toolchain is talking; listen to the failures first.",
    "Clean streak. Stay on the same line of attack.",
    "Uncertain footing. Confirm assumptions against the files.",
];

/// Pick a rationale line. Same inputs always give the same line.
pub(crate) fn select(streak: u32, errors: u32, pressure: f64, history_len: usize) -> &'static str {
    let seed = format!("{streak}:{errors}:{pressure:.3}:{history_len}");
    let digest = Sha256::digest(seed.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let index = u64::from_be_bytes(head) % POOL.len() as u64;
    POOL[usize::try_from(index).unwrap_or(0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_stable() {
        assert_eq!(select(2, 1, 47.5, 9), select(2, 1, 47.5, 9));
        assert!(POOL.contains(&select(0, 0, 50.0, 0)));
    }
}
