//! Shared documents and models for integration tests.

#![allow(dead_code)]

use opinion_args::classifier::{LogisticModel, Parameters};
use opinion_args::document::{Document, RESOURCE_BBN, TermId};
use opinion_args::pipeline::{AnnotatedDocument, GoldOpinion};

/// "John and Mary strongly criticized the plan ."
pub fn criticized() -> Document {
    let mut b = Document::builder("it:criticized");
    let john = b.term("John", "John", "R", "NNP");
    let and = b.term("and", "and", "C", "CC");
    let mary = b.term("Mary", "Mary", "R", "NNP");
    let strongly = b.term("strongly", "strongly", "A", "RB");
    let criticized = b.term("criticized", "criticize", "V", "VBD");
    let the = b.term("the", "the", "D", "DT");
    let plan = b.term("plan", "plan", "N", "NN");
    let stop = b.term(".", ".", "O", ".");
    b.dep(criticized, john, "SBJ")
        .dep(john, and, "COORD")
        .dep(and, mary, "CONJ")
        .dep(criticized, strongly, "ADV")
        .dep(criticized, plan, "OBJ")
        .dep(plan, the, "NMOD")
        .dep(criticized, stop, "P");
    b.predicate(
        &[criticized],
        &[("A0", &[john, and, mary]), ("A1", &[the, plan])],
    );
    b.entity(&[john], Some("PERSON"))
        .entity(&[mary], Some("PERSON"));
    b.term_ref(john, RESOURCE_BBN, "PERSON")
        .term_ref(mary, RESOURCE_BBN, "PERSON");
    b.build().unwrap()
}

/// A lone interjection: nothing to select.
pub fn fragment() -> Document {
    let mut b = Document::builder("it:fragment");
    b.term("Wow", "wow", "O", "UH");
    b.build().unwrap()
}

const NAMES: [&str; 10] = [
    "Alice", "Bruno", "Carla", "Dmitri", "Elena", "Farid", "Greta", "Hugo", "Ines", "Jonas",
];

/// "<Name> criticized the plan [of Acme] ." with its gold opinion.
///
/// Term layout: 0 name, 1 criticized, 2 the, 3 plan, then optionally 4 of,
/// 5 Acme, and the final stop. The gold target is always "the plan".
pub fn training_sentence(index: usize, with_of: bool) -> AnnotatedDocument {
    let mut b = Document::builder(format!("it:train:{index}"));
    let name = b.term(NAMES[index % NAMES.len()], NAMES[index % NAMES.len()], "R", "NNP");
    let verb = b.term("criticized", "criticize", "V", "VBD");
    let the = b.term("the", "the", "D", "DT");
    let plan = b.term("plan", "plan", "N", "NN");
    let mut a1 = vec![the, plan];
    if with_of {
        let of = b.term("of", "of", "P", "IN");
        let acme = b.term("Acme", "Acme", "R", "NNP");
        b.dep(plan, of, "NMOD").dep(of, acme, "PMOD");
        b.entity(&[acme], Some("ORGANIZATION"));
        a1.extend([of, acme]);
    }
    let stop = b.term(".", ".", "O", ".");
    b.dep(verb, name, "SBJ")
        .dep(verb, plan, "OBJ")
        .dep(plan, the, "NMOD")
        .dep(verb, stop, "P");
    b.predicate(&[verb], &[("A0", &[name]), ("A1", &a1)]);
    b.entity(&[name], Some("PERSON"));
    b.term_ref(name, RESOURCE_BBN, "PERSON");

    AnnotatedDocument {
        document: b.build().unwrap(),
        opinions: vec![GoldOpinion {
            expression: vec![verb],
            holder: Some(vec![name]),
            target: Some(vec![the, plan]),
        }],
    }
}

/// Ten training documents, every other one with an "of" attachment.
pub fn training_corpus() -> Vec<AnnotatedDocument> {
    (0..10).map(|i| training_sentence(i, i % 2 == 1)).collect()
}

pub fn model(bias: f32, weights: &[(&str, f32)]) -> LogisticModel {
    LogisticModel::from_weights(
        Parameters::default(),
        bias,
        weights.iter().map(|&(name, w)| (name.to_string(), w)),
    )
}

pub fn ids(raw: &[usize]) -> Vec<TermId> {
    raw.iter().copied().map(TermId).collect()
}
