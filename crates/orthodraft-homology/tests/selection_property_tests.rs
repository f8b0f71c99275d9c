use orthodraft_homology::{select, Criterion, HomologyRecord, SelectionThresholds};
use proptest::prelude::*;

/// Whole-number percentages so the predicates below can be checked in
/// integer arithmetic.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    identity: f64,
    diff_pct: u64,
    e_value: f64,
    coverage_pct: u64,
    bit_score: f64,
}

impl Bounds {
    fn thresholds(&self) -> SelectionThresholds {
        SelectionThresholds::new(
            self.identity,
            self.diff_pct as f64,
            self.e_value,
            self.coverage_pct as f64,
            self.bit_score,
        )
        .expect("strategy stays within valid ranges")
    }
}

/// Which criteria `r` fails, computed independently of the library.
fn expected_failures(r: &HomologyRecord, b: &Bounds) -> Vec<Criterion> {
    let qlen = r.query_len as u128;
    let slen = r.subject_len as u128;
    let mut failed = Vec::new();
    if r.pct_identity < b.identity {
        failed.push(Criterion::Identity);
    }
    // |slen - qlen| / qlen <= d / 100
    if qlen.abs_diff(slen) * 100 > b.diff_pct as u128 * qlen {
        failed.push(Criterion::LengthDifference);
    }
    // align / qlen >= c / 100
    if (r.align_len as u128) * 100 < b.coverage_pct as u128 * qlen {
        failed.push(Criterion::Coverage);
    }
    if r.bit_score < b.bit_score {
        failed.push(Criterion::BitScore);
    }
    if r.e_value > b.e_value {
        failed.push(Criterion::EValue);
    }
    failed
}

fn hit(
    q: usize,
    s: usize,
    (qlen, slen, align): (u64, u64, u64),
    identity: f64,
    e_value: f64,
    bit_score: f64,
) -> HomologyRecord {
    HomologyRecord {
        query_id: format!("Q{q}"),
        query_len: qlen,
        subject_id: format!("S{s}"),
        subject_len: slen,
        align_len: align,
        n_identical: 0,
        pct_identity: identity,
        score: bit_score * 2.0,
        e_value,
        bit_score,
    }
}

fn record_strategy() -> impl Strategy<Value = HomologyRecord> {
    (
        0usize..6,
        0usize..6,
        (1u64..2_000, 1u64..2_000, 0u64..2_000),
        0.0f64..=100.0,
        prop_oneof![Just(0.0f64), 1e-200f64..1.0],
        0.0f64..1_000.0,
    )
        .prop_map(|(q, s, lens, identity, e, bit)| hit(q, s, lens, identity, e, bit))
}

fn bounds_strategy() -> impl Strategy<Value = Bounds> {
    (
        0.0f64..=100.0,
        0u64..=100,
        0.0f64..=1.0,
        0u64..=100,
        0.0f64..=500.0,
    )
        .prop_map(|(identity, diff_pct, e_value, coverage_pct, bit_score)| Bounds {
            identity,
            diff_pct,
            e_value,
            coverage_pct,
            bit_score,
        })
}

/// A record sitting exactly on every bound at once.
fn on_every_bound(b: &Bounds, k: u64, upper_length: bool) -> HomologyRecord {
    let qlen = 100 * k;
    let slen = if upper_length {
        k * (100 + b.diff_pct)
    } else {
        k * (100 - b.diff_pct)
    };
    hit(0, 0, (qlen, slen, k * b.coverage_pct), b.identity, b.e_value, b.bit_score)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn candidate_iff_no_criterion_fails(
        records in prop::collection::vec(record_strategy(), 1..40),
        b in bounds_strategy(),
    ) {
        let t = b.thresholds();
        let sel = select(&records, &t).unwrap();
        for r in &records {
            let failed = expected_failures(r, &b);
            for c in Criterion::ALL {
                prop_assert_eq!(
                    sel.rejections.bucket(c).contains(r),
                    failed.contains(&c),
                    "{} for {:?}", c, r
                );
            }
        }
        // a pair is a candidate iff some hit for it fails nothing
        for r in &records {
            let backed = records.iter().any(|o| {
                o.query_id == r.query_id
                    && o.subject_id == r.subject_id
                    && expected_failures(o, &b).is_empty()
            });
            prop_assert_eq!(sel.candidates.contains(&r.query_id, &r.subject_id), backed);
        }
        let passing = records.iter().filter(|r| expected_failures(r, &b).is_empty()).count();
        prop_assert_eq!(sel.selected, passing);
    }

    #[test]
    fn records_on_every_bound_are_selected(
        b in bounds_strategy(),
        k in 1u64..20,
        upper_length in any::<bool>(),
    ) {
        let r = on_every_bound(&b, k, upper_length);
        prop_assert!(expected_failures(&r, &b).is_empty());
        let sel = select(std::slice::from_ref(&r), &b.thresholds()).unwrap();
        prop_assert_eq!(sel.selected, 1);
        prop_assert!(sel.candidates.contains("Q0", "S0"));
    }

    #[test]
    fn one_step_past_a_bound_is_rejected(
        b in bounds_strategy(),
        k in 1u64..20,
    ) {
        let t = b.thresholds();
        let edge = on_every_bound(&b, k, true);

        let mut longer = edge.clone();
        longer.subject_len += 1;
        let sel = select(&[longer.clone()], &t).unwrap();
        prop_assert!(sel.rejections.bucket(Criterion::LengthDifference).contains(&longer));

        if edge.align_len > 0 {
            let mut shorter = edge.clone();
            shorter.align_len -= 1;
            let sel = select(&[shorter.clone()], &t).unwrap();
            prop_assert!(sel.rejections.bucket(Criterion::Coverage).contains(&shorter));
        }

        if b.bit_score > 0.0 {
            let mut weaker = edge.clone();
            weaker.bit_score = f64::from_bits(b.bit_score.to_bits() - 1);
            let sel = select(&[weaker.clone()], &t).unwrap();
            prop_assert!(sel.rejections.bucket(Criterion::BitScore).contains(&weaker));
        }

        let mut worse = edge;
        worse.e_value = f64::from_bits(b.e_value.to_bits() + 1);
        let sel = select(&[worse.clone()], &t).unwrap();
        prop_assert!(sel.rejections.bucket(Criterion::EValue).contains(&worse));
    }

    #[test]
    fn selection_is_idempotent(
        records in prop::collection::vec(record_strategy(), 1..40),
        b in bounds_strategy(),
    ) {
        let t = b.thresholds();
        let first = select(&records, &t).unwrap();
        let second = select(&records, &t).unwrap();
        prop_assert_eq!(first.candidates.as_sets(), second.candidates.as_sets());
        prop_assert_eq!(first, second);
    }
}
