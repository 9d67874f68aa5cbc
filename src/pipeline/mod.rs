//! Holder/target extraction pipeline.
//!
//! An [`ArgumentExtractor`] owns up to two labeller pairs, one per [`Role`],
//! and runs link labelling, clustering and span expansion for an opinion
//! expression. Extractors persist as a directory:
//!
//! ```text
//! <dir>/pipeline.toml
//! <dir>/holder-link/{model,properties}
//! <dir>/holder-span/model
//! <dir>/target-link/{model,properties}
//! <dir>/target-span/model
//! ```

pub mod trainer;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arguments::find_arguments;
use crate::classifier::{Classifier, LogisticModel, Model};
use crate::document::{Document, TermId, tree};
use crate::error::{ConfigError, ConfigResult, OpinionResult};
use crate::expand::SpanLabeller;
use crate::link::LinkLabeller;
use crate::span::Span;
use crate::srl::SrlGraphCache;

pub use trainer::{AnnotatedDocument, GoldOpinion, PipelineTrainer};

/// Config file name inside an extractor directory.
pub const CONFIG_FILE: &str = "pipeline.toml";

/// Extended POS prefixes of opinion expression heads.
pub const EXPRESSION_POS: [&str; 4] = ["NN", "VB", "JJ", "R"];

/// Argument kind extracted for an opinion expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Holder,
    Target,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Holder, Role::Target];

    pub fn name(self) -> &'static str {
        match self {
            Role::Holder => "holder",
            Role::Target => "target",
        }
    }

    /// Directory of the role's link labeller.
    pub fn link_dir(self) -> String {
        format!("{}-link", self.name())
    }

    /// Directory of the role's span labeller.
    pub fn span_dir(self) -> String {
        format!("{}-span", self.name())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pipeline settings, persisted as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Keep only the best coordination cluster of holders.
    #[serde(default)]
    pub holder_unique: bool,
    /// Keep only the best coordination cluster of targets.
    #[serde(default)]
    pub target_unique: bool,
    /// Grid size for link classifier training.
    #[serde(default = "default_grid_size")]
    pub link_grid_size: usize,
    /// Grid size for span classifier training.
    #[serde(default = "default_grid_size")]
    pub span_grid_size: usize,
    /// Log feature statistics and cross-validation during training.
    #[serde(default = "default_true")]
    pub analyze: bool,
    /// Train one span classifier shared by holders and targets.
    #[serde(default = "default_true")]
    pub joint_span: bool,
    /// Extended POS prefixes of holder heads.
    #[serde(default = "default_holder_pos")]
    pub holder_pos: Vec<String>,
    /// Extended POS prefixes of target heads.
    #[serde(default = "default_target_pos")]
    pub target_pos: Vec<String>,
}

fn default_grid_size() -> usize {
    25
}
fn default_true() -> bool {
    true
}
fn default_holder_pos() -> Vec<String> {
    ["NN", "PRP", "JJP", "DTP", "WP"].map(String::from).to_vec()
}
fn default_target_pos() -> Vec<String> {
    let mut pos = default_holder_pos();
    pos.push("VB".into());
    pos
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            holder_unique: false,
            target_unique: false,
            link_grid_size: default_grid_size(),
            span_grid_size: default_grid_size(),
            analyze: true,
            joint_span: true,
            holder_pos: default_holder_pos(),
            target_pos: default_target_pos(),
        }
    }
}

impl PipelineConfig {
    pub fn unique(&self, role: Role) -> bool {
        match role {
            Role::Holder => self.holder_unique,
            Role::Target => self.target_unique,
        }
    }

    /// Head POS prefixes of the role.
    pub fn pos(&self, role: Role) -> &[String] {
        match role {
            Role::Holder => &self.holder_pos,
            Role::Target => &self.target_pos,
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Link and span labeller of one role.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleLabellers<C = LogisticModel> {
    pub link: LinkLabeller<C>,
    pub span: SpanLabeller<C>,
}

impl<C> RoleLabellers<C> {
    /// Pair up optional labellers, failing when only one side is present.
    pub fn pair(
        role: Role,
        link: Option<LinkLabeller<C>>,
        span: Option<SpanLabeller<C>>,
    ) -> ConfigResult<Option<Self>> {
        let unpaired = |present, missing| ConfigError::UnpairedLabeller {
            role: role.name().to_string(),
            present,
            missing,
        };
        match (link, span) {
            (Some(link), Some(span)) => Ok(Some(Self { link, span })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(unpaired("link", "span")),
            (None, Some(_)) => Err(unpaired("span", "link")),
        }
    }
}

/// Holder and target spans found for one expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arguments {
    pub holder: Vec<Span>,
    pub target: Vec<Span>,
}

impl Arguments {
    pub fn get(&self, role: Role) -> &[Span] {
        match role {
            Role::Holder => &self.holder,
            Role::Target => &self.target,
        }
    }

    fn get_mut(&mut self, role: Role) -> &mut Vec<Span> {
        match role {
            Role::Holder => &mut self.holder,
            Role::Target => &mut self.target,
        }
    }
}

/// Head of an opinion expression span: the last matching head in document
/// order.
pub fn expression_head(doc: &Document, expression: &[TermId]) -> Option<TermId> {
    tree::extract_heads(doc, expression, Some(&EXPRESSION_POS[..]))
        .last()
        .copied()
}

/// Extracts opinion holders and targets.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentExtractor<C = LogisticModel> {
    config: PipelineConfig,
    holder: Option<RoleLabellers<C>>,
    target: Option<RoleLabellers<C>>,
}

impl<C: Classifier> ArgumentExtractor<C> {
    pub fn new(
        config: PipelineConfig,
        holder: Option<RoleLabellers<C>>,
        target: Option<RoleLabellers<C>>,
    ) -> Self {
        Self {
            config,
            holder,
            target,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn labellers(&self, role: Role) -> Option<&RoleLabellers<C>> {
        match role {
            Role::Holder => self.holder.as_ref(),
            Role::Target => self.target.as_ref(),
        }
    }

    /// Arguments of the expression rooted at `expression_head`.
    ///
    /// Roles without labellers yield no spans.
    pub fn extract(&self, doc: &Document, expression_head: TermId) -> Arguments {
        let mut arguments = Arguments::default();
        for role in Role::ALL {
            if let Some(labellers) = self.labellers(role) {
                *arguments.get_mut(role) = find_arguments(
                    doc,
                    expression_head,
                    &labellers.link,
                    &labellers.span,
                    self.config.unique(role),
                );
            }
        }
        tracing::debug!(
            document = doc.id(),
            %expression_head,
            holders = arguments.holder.len(),
            targets = arguments.target.len(),
            "arguments extracted"
        );
        arguments
    }

    /// Arguments of an expression given as a span, if it has a head.
    pub fn extract_expression(&self, doc: &Document, expression: &[TermId]) -> Option<Arguments> {
        expression_head(doc, expression).map(|head| self.extract(doc, head))
    }

    /// Drop cached per-document state once a document is done.
    pub fn release(&self, doc: &Document) {
        SrlGraphCache::global().release(doc.id());
    }
}

impl<C: Model> ArgumentExtractor<C> {
    /// Load an extractor directory. A missing `pipeline.toml` means defaults.
    pub fn read_from(dir: &Path) -> OpinionResult<Self> {
        let config_path = dir.join(CONFIG_FILE);
        let config = if config_path.exists() {
            PipelineConfig::load(&config_path)?
        } else {
            PipelineConfig::default()
        };

        let mut pairs = Vec::with_capacity(2);
        for role in Role::ALL {
            let link_dir = dir.join(role.link_dir());
            let span_dir = dir.join(role.span_dir());
            let link = if link_dir.exists() {
                Some(LinkLabeller::read_from(&link_dir)?)
            } else {
                None
            };
            let span = if span_dir.exists() {
                Some(SpanLabeller::read_from(&span_dir)?)
            } else {
                None
            };
            pairs.push(RoleLabellers::pair(role, link, span)?);
        }
        let target = pairs.pop().flatten();
        let holder = pairs.pop().flatten();
        tracing::info!(
            path = %dir.display(),
            holder = holder.is_some(),
            target = target.is_some(),
            "extractor loaded"
        );
        Ok(Self::new(config, holder, target))
    }

    pub fn write_to(&self, dir: &Path) -> OpinionResult<()> {
        self.config.save(&dir.join(CONFIG_FILE))?;
        for role in Role::ALL {
            if let Some(labellers) = self.labellers(role) {
                labellers.link.write_to(&dir.join(role.link_dir()))?;
                labellers.span.write_to(&dir.join(role.span_dir()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Parameters;
    use crate::document::{DocumentData, fixtures};
    use crate::error::OpinionError;

    fn model(bias: f32, weights: &[(&str, f32)]) -> LogisticModel {
        LogisticModel::from_weights(
            Parameters::default(),
            bias,
            weights.iter().map(|&(name, w)| (name.to_string(), w)),
        )
    }

    fn holder_pair() -> RoleLabellers {
        RoleLabellers {
            link: LinkLabeller::new(
                model(-2.5, &[("node.named", 5.0)]),
                Some(default_holder_pos()),
            ),
            span: SpanLabeller::new(model(-5.0, &[])),
        }
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = PipelineConfig {
            holder_unique: true,
            ..PipelineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
        assert_eq!(config.pos(Role::Target).last().map(String::as_str), Some("VB"));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: PipelineConfig = toml::from_str("target_unique = true\n").unwrap();
        assert!(config.target_unique);
        assert_eq!(config.link_grid_size, 25);
        assert!(config.joint_span);
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "link_grid_size = \"many\"").unwrap();
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn unpaired_labellers_are_rejected() {
        let pair = holder_pair();
        let err = RoleLabellers::pair(Role::Holder, Some(pair.link), None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnpairedLabeller {
                present: "link",
                missing: "span",
                ..
            }
        ));
        assert!(
            RoleLabellers::<LogisticModel>::pair(Role::Target, None, None)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn extract_fills_configured_roles_only() {
        let doc = fixtures::criticized();
        let config = PipelineConfig {
            holder_unique: true,
            ..PipelineConfig::default()
        };
        let extractor = ArgumentExtractor::new(config, Some(holder_pair()), None);
        let arguments = extractor.extract(&doc, TermId(4));
        assert_eq!(arguments.holder.len(), 1);
        assert_eq!(arguments.holder[0].terms(), [0, 1, 2].map(TermId).as_slice());
        assert!(arguments.target.is_empty());
        extractor.release(&doc);
    }

    #[test]
    fn release_evicts_graphs_built_during_extraction() {
        let mut data = DocumentData::from(fixtures::criticized());
        data.id = "doc:extract-release".to_string();
        let doc = Document::try_from(data).unwrap();
        let extractor =
            ArgumentExtractor::new(PipelineConfig::default(), Some(holder_pair()), None);
        extractor.extract(&doc, TermId(4));
        assert!(SrlGraphCache::global().contains(doc.id()));
        extractor.release(&doc);
        assert!(!SrlGraphCache::global().contains(doc.id()));
    }

    #[test]
    fn expression_head_prefers_last_head() {
        let doc = fixtures::criticized();
        assert_eq!(
            expression_head(&doc, &[TermId(3), TermId(4)]),
            Some(TermId(4))
        );
        assert_eq!(expression_head(&doc, &[TermId(7)]), None);
    }

    #[test]
    fn extractor_directory_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let extractor =
            ArgumentExtractor::new(PipelineConfig::default(), Some(holder_pair()), None);
        extractor.write_to(dir.path()).unwrap();
        assert!(dir.path().join("holder-link").join("properties").exists());
        assert!(!dir.path().join("target-link").exists());
        let loaded: ArgumentExtractor = ArgumentExtractor::read_from(dir.path()).unwrap();
        assert_eq!(loaded, extractor);
    }

    #[test]
    fn directory_with_half_a_pair_fails() {
        let dir = tempfile::tempdir().unwrap();
        holder_pair()
            .link
            .write_to(&dir.path().join(Role::Holder.link_dir()))
            .unwrap();
        let result = ArgumentExtractor::<LogisticModel>::read_from(dir.path());
        assert!(matches!(
            result,
            Err(OpinionError::Config(ConfigError::UnpairedLabeller { .. }))
        ));
    }
}
