use crate::error::{Result, SaberPlishError};
use bio::alphabets::dna;
use saberplish_thermo::{is_dna_base, Strand};
use serde::{Deserialize, Serialize};

/// Spacer between the hybridizing part of the probe and the primer.
pub const SPACER: &str = "TT";

/// Layout of a SABER-PLISH probe across the two bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeParams {
    pub probe_len: usize,
    /// Shift of the split point from the centre. Negative values move
    /// hybridization onto the ImmunoSaber bridge.
    pub pos: i64,
    pub toehold: bool,
    pub toe_len: usize,
    pub stem_len: usize,
}

impl Default for ProbeParams {
    fn default() -> Self {
        Self {
            probe_len: 42,
            pos: 0,
            toehold: false,
            toe_len: 4,
            stem_len: 25,
        }
    }
}

impl ProbeParams {
    pub fn name(&self) -> String {
        let name = format!("saber-plish({})", self.pos);
        match self.toehold {
            true => format!("{name}-th({},{})", self.toe_len, self.stem_len),
            false => name,
        }
    }

    /// Lengths taken from the ImmunoSaber and SaberFISH bridges.
    pub fn split(&self) -> Result<(usize, usize)> {
        let probe_len = i64::try_from(self.probe_len).map_err(|_| {
            SaberPlishError::InvalidParameter(format!("probe_len {} too large", self.probe_len))
        })?;
        let out_of_range = || {
            SaberPlishError::InvalidParameter(format!(
                "pos {} is out of range for probe_len {}",
                self.pos, self.probe_len
            ))
        };
        let is_len = (probe_len / 2).checked_sub(self.pos).ok_or_else(out_of_range)?;
        let sf_len = probe_len.checked_sub(is_len).ok_or_else(out_of_range)?;
        if is_len <= 0 || sf_len <= 0 {
            return Err(SaberPlishError::InvalidParameter(format!(
                "pos {} leaves {is_len} nt on the ImmunoSaber bridge and {sf_len} nt on the SaberFISH bridge for probe_len {}",
                self.pos, self.probe_len
            )));
        }
        Ok((is_len as usize, sf_len as usize))
    }

    fn check_toehold(&self) -> Result<()> {
        let fits = self
            .toe_len
            .checked_add(self.stem_len)
            .is_some_and(|hairpin| hairpin < self.probe_len);
        if self.toehold && !fits {
            return Err(SaberPlishError::InvalidParameter(format!(
                "toe_len {} + stem_len {} must be shorter than probe_len {}",
                self.toe_len, self.stem_len, self.probe_len
            )));
        }
        Ok(())
    }
}

pub fn revcomp(seq: &str) -> String {
    dna::revcomp(seq.as_bytes())
        .into_iter()
        .map(char::from)
        .collect()
}

fn normalize(seq: &str, what: &str) -> Result<String> {
    let seq = seq.trim().to_ascii_uppercase();
    if let Some(bad) = seq.bytes().find(|b| !is_dna_base(*b)) {
        return Err(SaberPlishError::InvalidSequence(format!(
            "{what} contains '{}'",
            bad as char
        )));
    }
    Ok(seq)
}

/// Build the probe strand: the reverse complement of the junction between
/// `is_bridge` and `sf_bridge`, optionally folded back on itself into a
/// toehold hairpin, followed by [`SPACER`] and `primer`.
pub fn build_probe(
    is_bridge: &str,
    sf_bridge: &str,
    primer: &str,
    params: &ProbeParams,
) -> Result<Strand> {
    params.check_toehold()?;
    let (is_len, sf_len) = params.split()?;

    let is_bridge = normalize(is_bridge, "ImmunoSaber bridge")?;
    let sf_bridge = normalize(sf_bridge, "SaberFISH bridge")?;
    let primer = normalize(primer, "primer")?;
    if is_len > is_bridge.len() {
        return Err(SaberPlishError::InvalidParameter(format!(
            "{is_len} nt requested from an ImmunoSaber bridge of {} nt",
            is_bridge.len()
        )));
    }
    if sf_len > sf_bridge.len() {
        return Err(SaberPlishError::InvalidParameter(format!(
            "{sf_len} nt requested from a SaberFISH bridge of {} nt",
            sf_bridge.len()
        )));
    }

    let target = format!(
        "{}{}",
        &is_bridge[is_bridge.len() - is_len..],
        &sf_bridge[..sf_len]
    );
    let mut probe = revcomp(&target);
    assert_eq!(
        probe.len(),
        params.probe_len,
        "probe length {} differs from probe_len {} (pos {}, sf_len {sf_len})",
        probe.len(),
        params.probe_len,
        params.pos
    );

    if params.toehold {
        let stem_end = params.toe_len + params.stem_len;
        let toe = &probe[..params.toe_len];
        let stem = &probe[params.toe_len..stem_end];
        let loop_ = &probe[stem_end..];
        probe = format!("{toe}{stem}{loop_}{}", revcomp(stem));
    }

    let strand = Strand::new(&format!("{probe}{SPACER}{primer}"), &params.name())
        .map_err(|e| SaberPlishError::InvalidSequence(e.to_string()))?;
    Ok(strand)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn dna(len: std::ops::Range<usize>) -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!['A', 'C', 'G', 'T']), len)
            .prop_map(|bases| bases.into_iter().collect())
    }

    proptest! {
        #[test]
        fn core_covers_the_junction(
            b1 in dna(20..40),
            b2 in dna(20..40),
            primer in dna(0..12),
            probe_len in 2..40usize,
            pos in -20..20i64,
        ) {
            let params = ProbeParams { probe_len, pos, ..Default::default() };
            let is_len = probe_len as i64 / 2 - pos;
            let sf_len = probe_len as i64 - is_len;
            prop_assume!(is_len > 0 && sf_len > 0);
            prop_assume!(is_len as usize <= b1.len() && sf_len as usize <= b2.len());

            let probe = build_probe(&b1, &b2, &primer, &params).unwrap();
            prop_assert_eq!(probe.len(), probe_len + SPACER.len() + primer.len());

            let core = &probe.sequence()[..probe_len];
            let target = format!(
                "{}{}",
                &b1[b1.len() - is_len as usize..],
                &b2[..sf_len as usize]
            );
            prop_assert_eq!(revcomp(core), target);
            prop_assert_eq!(revcomp(&revcomp(core)), core);
        }

        #[test]
        fn split_outside_bridges_is_rejected(
            b1 in dna(4..10),
            b2 in dna(4..10),
            probe_len in 2..40usize,
            pos in -25..25i64,
        ) {
            let is_len = probe_len as i64 / 2 - pos;
            let sf_len = probe_len as i64 - is_len;
            prop_assume!(
                is_len <= 0 || sf_len <= 0 || is_len as usize > b1.len() || sf_len as usize > b2.len()
            );
            let params = ProbeParams { probe_len, pos, ..Default::default() };
            let result = build_probe(&b1, &b2, "", &params);
            prop_assert!(matches!(result, Err(SaberPlishError::InvalidParameter(_))));
        }

        #[test]
        fn toehold_stem_folds_back(
            b1 in dna(25..30),
            b2 in dna(25..30),
            probe_len in 10..40usize,
            toe_len in 0..5usize,
            stem_len in 1..10usize,
        ) {
            prop_assume!(toe_len + stem_len < probe_len);
            let params = ProbeParams {
                probe_len,
                pos: 0,
                toehold: true,
                toe_len,
                stem_len,
            };
            let probe = build_probe(&b1, &b2, "ACGT", &params).unwrap();
            let core = &probe.sequence()[..probe_len + stem_len];
            prop_assert_eq!(
                &core[core.len() - stem_len..],
                revcomp(&core[toe_len..toe_len + stem_len])
            );
            prop_assert!(probe.sequence().ends_with("TTACGT"));
        }

        #[test]
        fn oversized_toehold_is_rejected(
            probe_len in 2..50usize,
            toe_len in 0..30usize,
            stem_len in 0..30usize,
        ) {
            prop_assume!(toe_len + stem_len >= probe_len);
            let params = ProbeParams {
                probe_len,
                pos: 0,
                toehold: true,
                toe_len,
                stem_len,
            };
            // rejected before the bridges are read
            let result = build_probe("", "??", "", &params);
            prop_assert!(matches!(result, Err(SaberPlishError::InvalidParameter(_))));
        }
    }
}
