//! Hand-annotated documents shared by unit tests.

use super::*;

/// "John and Mary strongly criticized the plan ."
///
/// ```text
/// criticized ─SBJ→ John ─COORD→ and ─CONJ→ Mary
///            ─ADV→ strongly
///            ─OBJ→ plan ─NMOD→ the
///            ─P→ .
/// ```
pub fn criticized() -> Document {
    let mut b = Document::builder("doc:criticized");
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
        &[
            ("A0", &[john, and, mary]),
            ("A1", &[the, plan]),
            ("AM-MNR", &[strongly]),
        ],
    );
    b.entity(&[john], Some("PERSON"))
        .entity(&[mary], Some("PERSON"));

    b.term_ref(john, RESOURCE_BBN, "PERSON")
        .term_ref(john, RESOURCE_WN_SST, "noun.person")
        .term_ref(mary, RESOURCE_BBN, "PERSON")
        .term_ref(mary, RESOURCE_WN_SST, "noun.person")
        .term_ref(criticized, RESOURCE_WN_SYNSET, "00863513-v")
        .term_ref(criticized, RESOURCE_WN_SST, "verb.communication")
        .term_ref(plan, RESOURCE_WN_SYNSET, "05898568-n")
        .term_ref(plan, RESOURCE_WN_SST, "noun.cognition");

    b.build().expect("fixture is well formed")
}

/// "The plan was rejected by the board ."
///
/// Passive verb chain: `was ─VC→ rejected`.
pub fn passive() -> Document {
    let mut b = Document::builder("doc:passive");
    let the = b.term("The", "the", "D", "DT");
    let plan = b.term("plan", "plan", "N", "NN");
    let was = b.term("was", "be", "V", "VBD");
    let rejected = b.term("rejected", "reject", "V", "VBN");
    let by = b.term("by", "by", "P", "IN");
    let the2 = b.term("the", "the", "D", "DT");
    let board = b.term("board", "board", "N", "NN");
    let stop = b.term(".", ".", "O", ".");

    b.dep(was, plan, "SBJ")
        .dep(plan, the, "NMOD")
        .dep(was, rejected, "VC")
        .dep(rejected, by, "LGS")
        .dep(by, board, "PMOD")
        .dep(board, the2, "NMOD")
        .dep(was, stop, "P");

    b.predicate(&[rejected], &[("A1", &[the, plan]), ("A0", &[by, the2, board])]);

    b.build().expect("fixture is well formed")
}

/// "John said that plans failed and Mary claimed it ."
///
/// The verb governing the expression is coordinated with a sister clause:
///
/// ```text
/// said ─SBJ→ John
///      ─OBJ→ that ─SUB→ failed ─SBJ→ plans
///      ─COORD→ and ─CONJ→ claimed ─SBJ→ Mary
///                                 ─OBJ→ it
///      ─P→ .
/// ```
pub fn coordinated_clauses() -> Document {
    let mut b = Document::builder("doc:coordinated-clauses");
    let john = b.term("John", "John", "R", "NNP");
    let said = b.term("said", "say", "V", "VBD");
    let that = b.term("that", "that", "P", "IN");
    let plans = b.term("plans", "plan", "N", "NNS");
    let failed = b.term("failed", "fail", "V", "VBD");
    let and = b.term("and", "and", "C", "CC");
    let mary = b.term("Mary", "Mary", "R", "NNP");
    let claimed = b.term("claimed", "claim", "V", "VBD");
    let it = b.term("it", "it", "Q", "PRP");
    let stop = b.term(".", ".", "O", ".");

    b.dep(said, john, "SBJ")
        .dep(said, that, "OBJ")
        .dep(that, failed, "SUB")
        .dep(failed, plans, "SBJ")
        .dep(said, and, "COORD")
        .dep(and, claimed, "CONJ")
        .dep(claimed, mary, "SBJ")
        .dep(claimed, it, "OBJ")
        .dep(said, stop, "P");

    b.predicate(&[said], &[("A0", &[john]), ("A1", &[that, plans, failed])])
        .predicate(&[failed], &[("A1", &[plans])])
        .predicate(&[claimed], &[("A0", &[mary]), ("A1", &[it])]);

    b.build().expect("fixture is well formed")
}

/// A single-term fragment: "Wow".
pub fn fragment() -> Document {
    let mut b = Document::builder("doc:fragment");
    b.term("Wow", "wow", "O", "UH");
    b.build().expect("fixture is well formed")
}
