//! Helix-level structure enumeration for a single complex.
//!
//! A structure is a set of perfectly complementary helices. Candidates are the
//! maximal complementary runs between every pair of strand slots (and within
//! each slot); a structure picks a compatible subset of them.

use crate::{
    model::Model,
    params::MIN_HAIRPIN_LOOP,
    strand::{is_complementary, Complex},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const BRACKETS: [(char, char); 4] = [('(', ')'), ('[', ']'), ('{', '}'), ('<', '>')];

/// Pairs `(a, i + k)` with `(b, j - k)` for `k` in `0..len`; `a <= b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Helix {
    pub a: usize,
    pub i: usize,
    pub b: usize,
    pub j: usize,
    pub len: usize,
    pub dg: f64,
}

impl Helix {
    #[inline(always)]
    fn is_intramolecular(&self) -> bool {
        self.a == self.b
    }

    fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.len).flat_map(move |k| [(self.a, self.i + k), (self.b, self.j - k)])
    }

    /// Unpaired bases closed by an intramolecular helix.
    #[inline(always)]
    fn loop_len(&self) -> usize {
        self.j + 1 - self.i - 2 * self.len
    }

    #[inline(always)]
    fn encloses(&self, pos: usize) -> bool {
        self.i <= pos && pos <= self.j
    }

    #[inline(always)]
    fn in_loop(&self, pos: usize) -> bool {
        self.i + self.len <= pos && pos + self.len <= self.j
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfeStructure {
    /// Extended dot-bracket, strands separated by `+`.
    pub structure: String,
    /// kcal/mol
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexResult {
    pub pfunc: f64,
    pub log_pfunc: f64,
    /// -RT ln Q in kcal/mol
    pub free_energy: f64,
    pub structures_enumerated: usize,
    pub mfe: Vec<MfeStructure>,
}

fn helix_dg(model: &Model, seq: &[u8], i: usize, len: usize) -> f64 {
    let stacks: f64 = (0..len - 1)
        .map(|k| model.stack_dg(seq[i + k], seq[i + k + 1]))
        .sum();
    stacks + model.terminal_dg(seq[i]) + model.terminal_dg(seq[i + len - 1])
}

/// Maximal complementary runs between slot `a` and slot `b` (`a <= b`), best first.
pub(crate) fn find_helices(model: &Model, seqs: &[&[u8]], a: usize, b: usize) -> Vec<Helix> {
    let sa = seqs[a];
    let sb = seqs[b];
    let min_len = model.limits.min_helix_length;
    let intra = a == b;
    let mut ret = vec![];

    // pairs (i, j) and (i + 1, j - 1) share the anti-diagonal i + j
    for d in 0..(sa.len() + sb.len() - 1) {
        let i_min = d.saturating_sub(sb.len() - 1);
        let i_max = d.min(sa.len() - 1);
        let mut run_start: Option<usize> = None;
        for i in i_min..=i_max + 1 {
            let pairs = i <= i_max && {
                let j = d - i;
                let loop_ok = !intra || (j > i && j - i > MIN_HAIRPIN_LOOP);
                loop_ok && is_complementary(sa[i], sb[j])
            };
            match (pairs, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    let len = i - start;
                    run_start = None;
                    if len < min_len {
                        continue;
                    }
                    let mut helix = Helix {
                        a,
                        i: start,
                        b,
                        j: d - start,
                        len,
                        dg: helix_dg(model, sa, start, len),
                    };
                    if intra {
                        match model.hairpin_dg(helix.loop_len()) {
                            Some(loop_dg) => helix.dg += loop_dg,
                            None => continue,
                        }
                    }
                    ret.push(helix);
                }
                _ => {}
            }
        }
    }

    ret.sort_by(|x, y| x.dg.total_cmp(&y.dg));
    ret.truncate(model.limits.max_helices_per_pair);
    ret
}

/// No pseudoknot between `intra` and `other` on the slot `intra` lives on.
fn nests(intra: &Helix, other: &Helix) -> bool {
    let on_slot: Vec<usize> = other
        .positions()
        .filter(|(slot, _)| *slot == intra.a)
        .map(|(_, pos)| pos)
        .collect();
    if on_slot.is_empty() {
        return true;
    }
    let outside = on_slot.iter().all(|p| !intra.encloses(*p));
    if outside {
        return true;
    }
    other.is_intramolecular() && on_slot.iter().all(|p| intra.in_loop(*p))
}

fn compatible(h: &Helix, g: &Helix) -> bool {
    if h.is_intramolecular() && !nests(h, g) {
        return false;
    }
    if g.is_intramolecular() && !nests(g, h) {
        return false;
    }
    if !h.is_intramolecular() && h.a == g.a && h.b == g.b {
        // two helices between the same strands must nest
        return (h.i < g.i) == (g.j < h.j);
    }
    true
}

fn is_connected(n_slots: usize, chosen: &[Helix]) -> bool {
    let mut parent: Vec<usize> = (0..n_slots).collect();
    fn find(parent: &mut [usize], x: usize) -> usize {
        let mut root = x;
        while parent[root] != root {
            root = parent[root];
        }
        parent[x] = root;
        root
    }
    for h in chosen.iter().filter(|h| !h.is_intramolecular()) {
        let ra = find(&mut parent, h.a);
        let rb = find(&mut parent, h.b);
        parent[ra] = rb;
    }
    let root = find(&mut parent, 0);
    (1..n_slots).all(|s| find(&mut parent, s) == root)
}

fn ln_add(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

fn ln_factorial(n: usize) -> f64 {
    (2..=n).map(|k| (k as f64).ln()).sum()
}

struct Enumerator<'a> {
    candidates: &'a [Helix],
    max_helices: usize,
    n_slots: usize,
    base_dg: f64,
    rt: f64,
    used: Vec<Vec<bool>>,
    chosen: Vec<Helix>,
    log_q: f64,
    count: usize,
    best: Option<(f64, Vec<Helix>)>,
}

impl Enumerator<'_> {
    fn visit(&mut self) {
        if !is_connected(self.n_slots, &self.chosen) {
            return;
        }
        let dg = self.base_dg + self.chosen.iter().map(|h| h.dg).sum::<f64>();
        self.log_q = ln_add(self.log_q, -dg / self.rt);
        self.count += 1;
        let better = match &self.best {
            Some((best_dg, _)) => dg < *best_dg,
            None => true,
        };
        if better {
            self.best = Some((dg, self.chosen.clone()));
        }
    }

    fn fits(&self, h: &Helix) -> bool {
        h.positions().all(|(slot, pos)| !self.used[slot][pos])
            && self.chosen.iter().all(|g| compatible(h, g))
    }

    fn mark(&mut self, h: &Helix, value: bool) {
        for (slot, pos) in h.positions() {
            self.used[slot][pos] = value;
        }
    }

    fn descend(&mut self, start: usize) {
        self.visit();
        if self.chosen.len() >= self.max_helices {
            return;
        }
        for idx in start..self.candidates.len() {
            let h = self.candidates[idx];
            if !self.fits(&h) {
                continue;
            }
            self.mark(&h, true);
            self.chosen.push(h);
            self.descend(idx + 1);
            self.chosen.pop();
            self.mark(&h, false);
        }
    }
}

/// Extended dot-bracket for `helices` on strands of the given lengths.
pub(crate) fn dot_bracket(lengths: &[usize], helices: &[Helix]) -> String {
    let offsets: Vec<usize> = lengths
        .iter()
        .scan(0, |acc, len| {
            let start = *acc;
            *acc += len;
            Some(start)
        })
        .collect();
    let total: usize = lengths.iter().sum();

    let mut pairs: Vec<(usize, usize)> = helices
        .iter()
        .flat_map(|h| {
            let offsets = &offsets;
            (0..h.len).map(move |k| {
                let x = offsets[h.a] + h.i + k;
                let y = offsets[h.b] + h.j - k;
                (x.min(y), x.max(y))
            })
        })
        .collect();
    pairs.sort_unstable();

    let mut chars = vec!['.'; total];
    let mut levels: Vec<Vec<(usize, usize)>> = vec![vec![]; BRACKETS.len()];
    for (x, y) in pairs {
        let crosses = |&(p, q): &(usize, usize)| (x < p && p < y && y < q) || (p < x && x < q && q < y);
        let level = levels
            .iter()
            .position(|lvl| !lvl.iter().any(crosses))
            .unwrap_or(BRACKETS.len() - 1);
        levels[level].push((x, y));
        chars[x] = BRACKETS[level].0;
        chars[y] = BRACKETS[level].1;
    }

    let mut ret = String::with_capacity(total + lengths.len());
    for (slot, len) in lengths.iter().enumerate() {
        if slot > 0 {
            ret.push('+');
        }
        ret.extend(&chars[offsets[slot]..offsets[slot] + len]);
    }
    ret
}

/// Partition function and MFE of one complex.
pub fn fold_complex(complex: &Complex, model: &Model, with_mfe: bool) -> ComplexResult {
    let seqs: Vec<&[u8]> = complex.strands().iter().map(|s| s.as_bytes()).collect();
    let n = seqs.len();
    if n == 0 {
        return ComplexResult {
            pfunc: 0.0,
            log_pfunc: f64::NEG_INFINITY,
            free_energy: f64::INFINITY,
            structures_enumerated: 0,
            mfe: vec![],
        };
    }

    let mut candidates = vec![];
    for a in 0..n {
        for b in a..n {
            candidates.extend(find_helices(model, &seqs, a, b));
        }
    }
    candidates.sort_by(|x, y| x.dg.total_cmp(&y.dg));

    let mut enumerator = Enumerator {
        candidates: &candidates,
        max_helices: model.limits.max_helices,
        n_slots: n,
        base_dg: model.association_dg() * (n.saturating_sub(1)) as f64,
        rt: model.rt(),
        used: seqs.iter().map(|s| vec![false; s.len()]).collect(),
        chosen: vec![],
        log_q: f64::NEG_INFINITY,
        count: 0,
        best: None,
    };
    enumerator.descend(0);

    // identical strands make relabelled structures indistinguishable
    let symmetry: f64 = complex
        .strands()
        .chunk_by(|x, y| x == y)
        .map(|group| ln_factorial(group.len()))
        .sum();
    let log_pfunc = enumerator.log_q - symmetry;
    let rt = model.rt();

    let mfe = match (&enumerator.best, with_mfe) {
        (Some((energy, helices)), true) => {
            let lengths: Vec<usize> = seqs.iter().map(|s| s.len()).collect();
            vec![MfeStructure {
                structure: dot_bracket(&lengths, helices),
                energy: *energy,
            }]
        }
        _ => vec![],
    };

    debug!(
        complex = %complex,
        candidates = candidates.len(),
        structures = enumerator.count,
        log_pfunc,
        "folded complex"
    );

    ComplexResult {
        pfunc: log_pfunc.exp(),
        log_pfunc,
        free_energy: -rt * log_pfunc,
        structures_enumerated: enumerator.count,
        mfe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strand::Strand;

    fn strand(seq: &str, name: &str) -> Strand {
        Strand::new(seq, name).unwrap()
    }

    fn revcomp(seq: &str) -> String {
        seq.bytes()
            .rev()
            .map(|b| crate::strand::complement(b) as char)
            .collect()
    }

    #[test]
    fn test_find_duplex_helix() {
        let model = Model::default();
        let top = b"GGATCCAGTC".as_slice();
        let bottom_s = revcomp("GGATCCAGTC");
        let bottom = bottom_s.as_bytes();
        let helices = find_helices(&model, &[top, bottom], 0, 1);
        let full = helices[0];
        assert_eq!(full.len, 10);
        assert_eq!((full.i, full.j), (0, 9));
        assert!(full.dg < 0.0);
    }

    #[test]
    fn test_hairpin_respects_min_loop() {
        let model = Model::default();
        // GGGG..CCCC with a two-base loop can not close
        let seq = b"GGGGAACCCC".as_slice();
        assert!(find_helices(&model, &[seq], 0, 0).iter().all(|h| h.loop_len() >= 3));
        let seq = b"GGGGAAAACCCC".as_slice();
        let helices = find_helices(&model, &[seq], 0, 0);
        assert_eq!(helices[0].len, 4);
        assert_eq!(helices[0].loop_len(), 4);
    }

    #[test]
    fn test_dot_bracket_hairpin_and_duplex() {
        let hairpin = Helix {
            a: 0,
            i: 0,
            b: 0,
            j: 11,
            len: 4,
            dg: -1.0,
        };
        assert_eq!(dot_bracket(&[12], &[hairpin]), "((((....))))");

        let duplex = Helix {
            a: 0,
            i: 1,
            b: 1,
            j: 3,
            len: 3,
            dg: -1.0,
        };
        assert_eq!(dot_bracket(&[5, 5], &[duplex]), ".(((.+.))).");
    }

    #[test]
    fn test_dot_bracket_marks_crossing_pairs() {
        let first = Helix {
            a: 0,
            i: 0,
            b: 0,
            j: 9,
            len: 2,
            dg: -1.0,
        };
        let second = Helix {
            a: 0,
            i: 4,
            b: 0,
            j: 13,
            len: 2,
            dg: -1.0,
        };
        let db = dot_bracket(&[14], &[first, second]);
        assert_eq!(db, "((..[[..))..]]");
    }

    #[test]
    fn test_duplex_complex_prefers_full_helix() {
        let model = Model::default();
        let top = strand("GGATCCAGTCAGGTCA", "top");
        let bottom = strand(&revcomp("GGATCCAGTCAGGTCA"), "bottom");
        let result = fold_complex(&Complex::new([top, bottom]), &model, true);
        let mfe = &result.mfe[0];
        assert!(mfe.energy < -10.0);
        assert!(result.free_energy <= mfe.energy + 1e-9);
        let (left, right) = mfe.structure.split_once('+').unwrap();
        assert!(left.chars().all(|c| c == '('));
        assert!(right.chars().all(|c| c == ')'));
    }

    #[test]
    fn test_monomer_includes_open_chain() {
        let model = Model::default();
        let result = fold_complex(&Complex::new([strand("AAAAAAAAAA", "polyA")]), &model, true);
        assert_eq!(result.structures_enumerated, 1);
        assert_eq!(result.log_pfunc, 0.0);
        assert_eq!(result.mfe[0].structure, "..........");
        assert_eq!(result.mfe[0].energy, 0.0);
    }

    #[test]
    fn test_unpairable_dimer_has_no_structure() {
        let model = Model::default();
        let a = strand("AAAAAAAAAA", "a");
        let c = strand("CCCCCCCCCC", "c");
        let result = fold_complex(&Complex::new([a, c]), &model, true);
        assert_eq!(result.structures_enumerated, 0);
        assert_eq!(result.pfunc, 0.0);
        assert!(result.mfe.is_empty());
    }

    #[test]
    fn test_empty_complex_has_no_structure() {
        let empty: Complex = serde_json::from_str("[]").unwrap();
        let result = fold_complex(&empty, &Model::default(), true);
        assert_eq!(result.structures_enumerated, 0);
        assert_eq!(result.pfunc, 0.0);
        assert!(result.mfe.is_empty());
        assert_eq!(fold_complex(&Complex::new(vec![]), &Model::default(), false).pfunc, 0.0);
    }

    #[test]
    fn test_homodimer_symmetry_correction() {
        let model = Model::default();
        let s = strand("GGATCCGGATCC", "pal");
        let dimer = fold_complex(&Complex::new([s.clone(), s]), &model, false);
        assert!(dimer.mfe.is_empty());
        assert!(dimer.structures_enumerated > 0);
        assert!(dimer.log_pfunc.is_finite());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::strand::Strand;
    use proptest::prelude::*;

    fn dna(len: std::ops::Range<usize>) -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!['A', 'C', 'G', 'T']), len)
            .prop_map(|bases| bases.into_iter().collect())
    }

    fn balanced(structure: &str) -> bool {
        let mut stacks = vec![0i64; BRACKETS.len()];
        for c in structure.chars() {
            if let Some(k) = BRACKETS.iter().position(|(open, _)| *open == c) {
                stacks[k] += 1;
            } else if let Some(k) = BRACKETS.iter().position(|(_, close)| *close == c) {
                stacks[k] -= 1;
                if stacks[k] < 0 {
                    return false;
                }
            }
        }
        stacks.iter().all(|depth| *depth == 0)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn mfe_is_balanced_with_one_nick(a in dna(6..20), b in dna(6..20)) {
            let complex = Complex::new([
                Strand::new(&a, "a").unwrap(),
                Strand::new(&b, "b").unwrap(),
            ]);
            let result = fold_complex(&complex, &Model::default(), true);
            for mfe in &result.mfe {
                prop_assert_eq!(mfe.structure.matches('+').count(), 1);
                prop_assert_eq!(mfe.structure.len(), a.len() + b.len() + 1);
                prop_assert!(balanced(&mfe.structure));
                prop_assert!(result.free_energy <= mfe.energy + 1e-9);
            }
        }

        #[test]
        fn complex_identity_ignores_order(a in dna(4..10), b in dna(4..10), c in dna(4..10)) {
            let a = Strand::new(&a, "a").unwrap();
            let b = Strand::new(&b, "b").unwrap();
            let c = Strand::new(&c, "c").unwrap();
            let abc = Complex::new([a.clone(), b.clone(), c.clone()]);
            let cab = Complex::new([c, a, b]);
            prop_assert_eq!(abc.name(), cab.name());
            prop_assert_eq!(abc, cab);
        }
    }
}
