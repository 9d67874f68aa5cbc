//! Persistence tests: extractor and labeller directories survive a
//! write/read cycle, and broken directories fail with the right error.

mod common;

use opinion_args::classifier::LogisticModel;
use opinion_args::document::TermId;
use opinion_args::error::{ModelError, OpinionError};
use opinion_args::link::{MODEL_FILE, PROPERTIES_FILE};
use opinion_args::pipeline::{ArgumentExtractor, PipelineConfig, PipelineTrainer, Role};
use opinion_args::{LinkLabeller, SpanLabeller};

use common::{criticized, model, training_corpus};

#[test]
fn link_labeller_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let labeller = LinkLabeller::new(
        model(-1.0, &[("node.named", 3.0), ("path.sbjD", 0.5)]),
        Some(vec!["NN".to_string(), "PRP".to_string()]),
    );
    labeller.write_to(dir.path()).unwrap();
    let loaded: LinkLabeller = LinkLabeller::read_from(dir.path()).unwrap();
    assert_eq!(loaded, labeller);

    let doc = criticized();
    assert_eq!(
        loaded.label(&doc, TermId(4)),
        labeller.label(&doc, TermId(4))
    );
}

#[test]
fn unrestricted_link_labeller_stays_unrestricted() {
    let dir = tempfile::TempDir::new().unwrap();
    let labeller = LinkLabeller::new(model(0.0, &[]), None);
    labeller.write_to(dir.path()).unwrap();
    let loaded: LinkLabeller = LinkLabeller::read_from(dir.path()).unwrap();
    assert!(loaded.pos_prefixes().is_none());
}

#[test]
fn missing_model_fails_to_load() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join(PROPERTIES_FILE), "pos=NN\n").unwrap();
    let result = LinkLabeller::<LogisticModel>::read_from(dir.path());
    assert!(matches!(result, Err(ModelError::MissingPath { .. })));
    let result = SpanLabeller::<LogisticModel>::read_from(dir.path());
    assert!(matches!(result, Err(ModelError::MissingPath { .. })));
}

#[test]
fn malformed_properties_fail_to_load() {
    let dir = tempfile::TempDir::new().unwrap();
    LinkLabeller::new(model(0.0, &[]), None)
        .write_to(dir.path())
        .unwrap();
    std::fs::write(dir.path().join(PROPERTIES_FILE), "# comment\nnot a property\n").unwrap();
    let result = LinkLabeller::<LogisticModel>::read_from(dir.path());
    assert!(matches!(
        result,
        Err(ModelError::MalformedProperties { line: 2, .. })
    ));
}

#[test]
fn corrupt_model_is_a_serialization_error() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join(MODEL_FILE), "{ not json").unwrap();
    let result = SpanLabeller::<LogisticModel>::read_from(dir.path());
    assert!(matches!(result, Err(ModelError::Serialization { .. })));
}

#[test]
fn trained_extractor_round_trip() {
    let config = PipelineConfig {
        link_grid_size: 1,
        span_grid_size: 1,
        analyze: false,
        target_unique: true,
        ..PipelineConfig::default()
    };
    let mut trainer = PipelineTrainer::new(config, &Role::ALL);
    for annotated in training_corpus() {
        trainer.add(&annotated.document, &annotated.opinions);
    }
    let extractor: ArgumentExtractor = trainer.finish().unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    extractor.write_to(dir.path()).unwrap();
    for role in Role::ALL {
        assert!(dir.path().join(role.link_dir()).join(MODEL_FILE).exists());
        assert!(dir.path().join(role.span_dir()).join(MODEL_FILE).exists());
    }

    let loaded: ArgumentExtractor = ArgumentExtractor::read_from(dir.path()).unwrap();
    assert_eq!(loaded.config(), extractor.config());
    let doc = criticized();
    assert_eq!(
        loaded.extract(&doc, TermId(4)),
        extractor.extract(&doc, TermId(4))
    );
}

#[test]
fn missing_span_model_in_extractor_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    LinkLabeller::new(model(0.0, &[]), None)
        .write_to(&dir.path().join(Role::Target.link_dir()))
        .unwrap();
    std::fs::create_dir_all(dir.path().join(Role::Target.span_dir())).unwrap();
    let result = ArgumentExtractor::<LogisticModel>::read_from(dir.path());
    assert!(matches!(
        result,
        Err(OpinionError::Model(ModelError::MissingPath { .. }))
    ));
}
