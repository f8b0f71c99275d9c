//! Single-organism builds against files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use orthodraft_homology::SelectionThresholds;
use orthodraft_network::ReactionNetwork;
use orthodraft_pipeline::{
    AlignmentError, BuildError, CheckpointStore, EvidenceSource, OrganismBuild, OrganismConfig,
    OrganismSummary, SearchOutcome, SequenceSearch, Stage, DRAFT_FILE, REJECTIONS_LOG,
};

const REFERENCE: &str = "R1\tgA OR gB\tfirst\nR2\tgC\nR3\t(gD)\n";

const HITS: &str = "\
# query,qlen,subject,slen,length,nident,pident,score,evalue,bitscore
gA,100,p1,100,100,90,90,500,1e-80,400
gB,100,p2,105,95,85,88,480,1e-70,380
gC,100,p3,100,100,90,90,500,1e-80,400
gD,100,p4,100,100,40,40,500,1e-80,400
not,a,record
";

const CORRESPONDENCE: &str = "geneX\tp1\ngeneY\tP2\n";

struct Fixture {
    _dir: tempfile::TempDir,
    work_dir: PathBuf,
    reference: ReactionNetwork,
    organism: OrganismConfig,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("reference.tsv"), REFERENCE).unwrap();
    fs::write(root.join("hits.csv"), HITS).unwrap();
    fs::write(root.join("corr.tsv"), CORRESPONDENCE).unwrap();
    Fixture {
        work_dir: root.join("work"),
        reference: ReactionNetwork::read_path(&root.join("reference.tsv")).unwrap(),
        organism: OrganismConfig {
            name: "target".into(),
            correspondence: root.join("corr.tsv"),
            evidence: EvidenceSource::Hits(root.join("hits.csv")),
        },
        _dir: dir,
    }
}

struct NeverCalled;

impl SequenceSearch for NeverCalled {
    fn search(&self, _q: &Path, _s: &Path) -> Result<SearchOutcome, AlignmentError> {
        panic!("hits-file evidence must not run the aligner")
    }
}

fn build(
    f: &Fixture,
    thresholds: SelectionThresholds,
    resume: bool,
) -> Result<OrganismSummary, BuildError> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    OrganismBuild {
        organism: &f.organism,
        reference: &f.reference,
        thresholds,
        work_dir: &f.work_dir,
        resume,
        searcher: &NeverCalled,
        search_pool: &pool,
    }
    .run()
}

#[test]
fn builds_draft_from_hits_file() {
    let f = fixture();
    let s = build(&f, SelectionThresholds::default(), false).unwrap();

    assert_eq!(s.resumed_from, None);
    assert_eq!(s.genes_searched, 4);
    assert_eq!(s.hits_skipped_lines, 1);
    assert_eq!(s.hits_considered, 4);
    assert_eq!(s.hits_selected, 3);
    assert_eq!(s.rejections["Identity"], 1);
    assert_eq!(s.drafted_reactions, 2);
    assert_eq!(s.dropped_no_ortholog, 1);
    assert_eq!(s.dropped_no_correspondence, 1);
    assert_eq!(s.final_reactions, 1);

    let draft = ReactionNetwork::read_path(&s.draft_path).unwrap();
    assert_eq!(draft.id, "target_draft");
    let r1 = draft.reaction("R1").unwrap();
    assert_eq!(r1.gene_rule.atoms(), ["geneX".to_string(), "geneY".to_string()]);
    assert_eq!(r1.name.as_deref(), Some("first"));

    let log = fs::read_to_string(f.work_dir.join("target").join(REJECTIONS_LOG)).unwrap();
    assert!(log.contains("Identity (1)"), "{log}");
    assert!(f.work_dir.join("target").join(DRAFT_FILE).is_file());
}

#[test]
fn resume_reuses_checkpoints_until_thresholds_change() {
    let f = fixture();
    let first = build(&f, SelectionThresholds::default(), false).unwrap();

    let again = build(&f, SelectionThresholds::default(), true).unwrap();
    assert_eq!(again.resumed_from, Some(Stage::Finalized));
    assert_eq!(again.reaction_ids, first.reaction_ids);

    let mut strict = SelectionThresholds::default();
    strict.set_min_identity(95.0).unwrap();
    let rerun = build(&f, strict, true).unwrap();
    assert_eq!(rerun.resumed_from, Some(Stage::Aligned));
    assert_eq!(rerun.hits_selected, 0);
    assert_eq!(rerun.final_reactions, 0);
    assert_eq!(rerun.dropped_no_ortholog, 3);

    let store = CheckpointStore::new(&f.work_dir, "target");
    assert_eq!(store.latest(), Some(Stage::Finalized));
}

#[test]
fn without_resume_everything_is_recomputed() {
    let f = fixture();
    build(&f, SelectionThresholds::default(), false).unwrap();
    let s = build(&f, SelectionThresholds::default(), false).unwrap();
    assert_eq!(s.resumed_from, None);
}

#[test]
fn missing_correspondence_fails_before_any_work() {
    let mut f = fixture();
    f.organism.correspondence = f.work_dir.join("nope.tsv");
    let err = build(&f, SelectionThresholds::default(), false).unwrap_err();
    assert!(matches!(err, BuildError::MissingInput { what: "correspondence file", .. }));
    assert!(!f.work_dir.join("target").exists());
}

#[test]
fn empty_hits_file_is_no_evidence() {
    let f = fixture();
    if let EvidenceSource::Hits(path) = &f.organism.evidence {
        fs::write(path, "# nothing here\n").unwrap();
    }
    let err = build(&f, SelectionThresholds::default(), false).unwrap_err();
    assert!(matches!(err, BuildError::NoEvidence));
}

#[test]
fn search_evidence_runs_one_call_per_query() {
    struct Echo;
    impl SequenceSearch for Echo {
        fn search(&self, query: &Path, _s: &Path) -> Result<SearchOutcome, AlignmentError> {
            let text = fs::read_to_string(query)?;
            let id = text.lines().next().unwrap_or("").trim_start_matches('>').to_string();
            Ok(match id.as_str() {
                "gA" => SearchOutcome::Hits(vec!["gA,100,p1,100,100,90,90,500,1e-80,400".into()]),
                "gC" => SearchOutcome::TimedOut,
                _ => SearchOutcome::Hits(vec![]),
            })
        }
    }

    let mut f = fixture();
    let root = f.work_dir.parent().unwrap().to_path_buf();
    fs::write(root.join("ref.faa"), ">gA\nMKV\n>gB\nMKL\n>gC\nMAA\n").unwrap();
    fs::write(root.join("target.faa"), ">p1\nMKV\n").unwrap();
    f.organism.evidence = EvidenceSource::Search {
        queries: root.join("ref.faa"),
        subject: root.join("target.faa"),
    };

    let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
    let s = OrganismBuild {
        organism: &f.organism,
        reference: &f.reference,
        thresholds: SelectionThresholds::default(),
        work_dir: &f.work_dir,
        resume: false,
        searcher: &Echo,
        search_pool: &pool,
    }
    .run()
    .unwrap();

    assert_eq!(s.genes_searched, 3);
    assert_eq!(s.genes_timed_out, 1);
    assert_eq!(s.genes_without_hits, 1);
    assert_eq!(s.hits_selected, 1);
    assert_eq!(s.reaction_ids.iter().collect::<Vec<_>>(), ["R1"]);
}
