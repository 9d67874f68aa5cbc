//! Supervised training of an [`ArgumentExtractor`] from gold opinions.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::Model;
use crate::document::{Document, TermId, tree};
use crate::error::{DocumentError, DocumentResult, OpinionResult};
use crate::expand::SpanTrainer;
use crate::link::LinkTrainer;
use crate::span::{Span, split_span};
use crate::srl::SrlGraphCache;

use super::{ArgumentExtractor, PipelineConfig, Role, RoleLabellers, expression_head};

/// A gold opinion: expression span plus optional holder and target spans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldOpinion {
    pub expression: Vec<TermId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<Vec<TermId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec<TermId>>,
}

impl GoldOpinion {
    pub fn argument(&self, role: Role) -> Option<&[TermId]> {
        match role {
            Role::Holder => self.holder.as_deref(),
            Role::Target => self.target.as_deref(),
        }
    }
}

/// A document with its gold opinions, as stored in a training corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    pub document: Document,
    #[serde(default)]
    pub opinions: Vec<GoldOpinion>,
}

impl AnnotatedDocument {
    /// Read a JSON array of annotated documents.
    pub fn read_corpus(path: &Path) -> DocumentResult<Vec<Self>> {
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| DocumentError::Parse {
            message: format!("{}: {e}", path.display()),
        })
    }
}

/// Collects link and span examples for the enabled roles.
#[derive(Debug)]
pub struct PipelineTrainer {
    config: PipelineConfig,
    link: BTreeMap<Role, LinkTrainer>,
    span: BTreeMap<Role, SpanTrainer>,
    documents: usize,
}

impl PipelineTrainer {
    /// Trainer for the given roles. With `joint_span`, every role feeds the
    /// span trainer of the first role.
    pub fn new(config: PipelineConfig, roles: &[Role]) -> Self {
        let link = roles
            .iter()
            .map(|&role| (role, LinkTrainer::new(Some(config.pos(role).to_vec()))))
            .collect();
        let span = roles
            .iter()
            .map(|&role| (role, SpanTrainer::new()))
            .collect();
        Self {
            config,
            link,
            span,
            documents: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn link_trainer(&self, role: Role) -> Option<&LinkTrainer> {
        self.link.get(&role)
    }

    pub fn span_trainer(&self, role: Role) -> Option<&SpanTrainer> {
        self.span.get(&self.span_role(role)?)
    }

    /// Role whose span trainer collects examples for `role`.
    fn span_role(&self, role: Role) -> Option<Role> {
        if !self.link.contains_key(&role) {
            return None;
        }
        if self.config.joint_span {
            self.link.keys().next().copied()
        } else {
            Some(role)
        }
    }

    /// Add the gold opinions of one document.
    ///
    /// Opinions sharing an expression head are pooled; gold argument spans
    /// are split at their heads so each head trains its own expansion. Cached
    /// SRL graphs of the document are released afterwards.
    pub fn add(&mut self, doc: &Document, opinions: &[GoldOpinion]) {
        let mut by_head: BTreeMap<TermId, BTreeMap<Role, Vec<Span>>> = BTreeMap::new();
        for opinion in opinions {
            let Some(head) = expression_head(doc, &opinion.expression) else {
                tracing::debug!(
                    document = doc.id(),
                    expression = %doc.text_of(&opinion.expression),
                    "expression without head skipped"
                );
                continue;
            };
            let spans = by_head.entry(head).or_default();
            for role in Role::ALL {
                let Some(terms) = opinion.argument(role) else {
                    continue;
                };
                let heads = tree::extract_heads(doc, terms, Some(self.config.pos(role)));
                let gold = Span::new(terms.iter().copied(), None);
                spans
                    .entry(role)
                    .or_default()
                    .extend(split_span(doc, &gold, &heads));
            }
        }

        for (expression_head, spans) in &by_head {
            for role in Role::ALL {
                let gold = spans.get(&role).map(Vec::as_slice).unwrap_or_default();
                self.add_arguments(doc, *expression_head, role, gold);
            }
        }
        SrlGraphCache::global().release(doc.id());
        self.documents += 1;
    }

    fn add_arguments(
        &mut self,
        doc: &Document,
        expression_head: TermId,
        role: Role,
        gold: &[Span],
    ) {
        let Some(span_role) = self.span_role(role) else {
            return;
        };
        let (heads, spans): (Vec<TermId>, Vec<&Span>) = gold
            .iter()
            .filter_map(|span| span.resolve_head(doc).map(|head| (head, span)))
            .unzip();

        if let Some(link) = self.link.get_mut(&role) {
            link.add(doc, expression_head, &heads);
        }
        if let Some(trainer) = self.span.get_mut(&span_role) {
            for (i, span) in spans.iter().enumerate() {
                let others: Vec<TermId> = heads
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &h)| h)
                    .collect();
                trainer.add(doc, heads[i], &others, span.terms());
            }
        }
    }

    /// Train every labeller and assemble the extractor.
    pub fn finish<M: Model + Clone>(mut self) -> OpinionResult<ArgumentExtractor<M>> {
        let grid = self.config.link_grid_size;
        let span_grid = self.config.span_grid_size;
        let analyze = self.config.analyze;
        tracing::info!(documents = self.documents, roles = self.link.len(), "training extractor");

        let mut trained_spans = BTreeMap::new();
        let roles: Vec<Role> = self.link.keys().copied().collect();
        for &role in &roles {
            if let Some(trainer) = self.span.remove(&role) {
                let span_role = self.span_role(role).unwrap_or(role);
                if span_role == role {
                    tracing::info!(%role, joint = self.config.joint_span, "training span labeller");
                    trained_spans.insert(role, trainer.finish::<M>(span_grid, analyze)?);
                }
            }
        }

        let mut pairs = BTreeMap::new();
        for role in roles {
            let Some(trainer) = self.link.remove(&role) else {
                continue;
            };
            tracing::info!(%role, "training link labeller");
            let link = trainer.finish::<M>(grid, analyze)?;
            let span_role = if self.config.joint_span {
                *trained_spans.keys().next().unwrap_or(&role)
            } else {
                role
            };
            let span = trained_spans.get(&span_role).cloned();
            pairs.insert(role, RoleLabellers::pair(role, Some(link), span)?);
        }

        let holder = pairs.remove(&Role::Holder).flatten();
        let target = pairs.remove(&Role::Target).flatten();
        Ok(ArgumentExtractor::new(self.config, holder, target))
    }
}
