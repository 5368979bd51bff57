//! DNA nearest-neighbor parameters.
//!
//! The Thermodynamics of DNA Structural Motifs
//! SantaLucia and Hicks, 2004
//! Annu.Rev.Biophs.Biomol.Struct.33:415-40
//!
//! Enthalpies in kcal/mol, entropies in cal/(K mol), 1 M NaCl.

pub const GAS_CONSTANT: f64 = 1.9872e-3;
pub const KELVIN: f64 = 273.15;

/// Molarity of pure water; reference state for mole fractions.
pub const WATER_MOLARITY: f64 = 55.14;

/// Strand association (helix initiation), applied once per extra strand.
pub const INIT: (f64, f64) = (0.2, -5.7);

/// Penalty for every helix end closed by an A·T pair.
pub const TERMINAL_AT: (f64, f64) = (2.2, 6.9);

/// Per-stack entropy salt correction factor, multiplied by ln[Na+].
pub const SALT_ENTROPY_FACTOR: f64 = 0.368;

pub const MIN_HAIRPIN_LOOP: usize = 3;

/// Watson-Crick stack 5'-xy-3' / 3'-x'y'-5'.
pub fn stack(x: u8, y: u8) -> (f64, f64) {
    match (x, y) {
        (b'A', b'A') | (b'T', b'T') => (-7.6, -21.3),
        (b'A', b'T') => (-7.2, -20.4),
        (b'T', b'A') => (-7.2, -21.3),
        (b'C', b'A') | (b'T', b'G') => (-8.5, -22.7),
        (b'G', b'T') | (b'A', b'C') => (-8.4, -22.4),
        (b'C', b'T') | (b'A', b'G') => (-7.8, -21.0),
        (b'G', b'A') | (b'T', b'C') => (-8.2, -22.2),
        (b'C', b'G') => (-10.6, -27.2),
        (b'G', b'C') => (-9.8, -24.4),
        (b'G', b'G') | (b'C', b'C') => (-8.0, -19.9),
        _ => (0.0, 0.0),
    }
}

/// Hairpin loop entropies for loops of 3..=30 nt (enthalpy is zero).
const HAIRPIN_LOOP_ENTROPY: [f64; 28] = [
    -11.3, -11.3, -10.6, -12.9, -13.5, -13.9, -14.5, -14.8, -15.5, -16.1, -16.1, -16.4, -16.8,
    -17.1, -17.4, -17.7, -18.1, -18.4, -18.7, -18.7, -19.0, -19.3, -19.7, -19.7, -19.7, -20.0,
    -20.0, -20.3,
];

pub const MAX_TABULATED_HAIRPIN: usize = MIN_HAIRPIN_LOOP + HAIRPIN_LOOP_ENTROPY.len() - 1;

pub fn hairpin_loop_entropy(len: usize) -> Option<f64> {
    if !(MIN_HAIRPIN_LOOP..=MAX_TABULATED_HAIRPIN).contains(&len) {
        return None;
    }
    Some(HAIRPIN_LOOP_ENTROPY[len - MIN_HAIRPIN_LOOP])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_symmetry() {
        // 5'-CA-3'/3'-GT-5' read from the other strand is 5'-TG-3'
        assert_eq!(stack(b'C', b'A'), stack(b'T', b'G'));
        assert_eq!(stack(b'G', b'A'), stack(b'T', b'C'));
        assert_eq!(stack(b'C', b'G'), (-10.6, -27.2));
    }

    #[test]
    fn test_hairpin_table_bounds() {
        assert_eq!(MAX_TABULATED_HAIRPIN, 30);
        assert_eq!(hairpin_loop_entropy(3), Some(-11.3));
        assert_eq!(hairpin_loop_entropy(30), Some(-20.3));
        assert_eq!(hairpin_loop_entropy(2), None);
        assert_eq!(hairpin_loop_entropy(31), None);
    }
}
