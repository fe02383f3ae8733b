//! Module metadata: identifiers, parsers, validators and source ordering
//!
//! A repository can serve module descriptors in more than one format. Each
//! format is represented by a [`MetadataSource`] pairing a parser with a
//! validator; the mutable [`MetadataSourceSet`] is frozen into an immutable
//! [`MetadataSourceOrder`] when a resolver is built.

use crate::error::{RepoError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifier for a module (a versioned component)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

/// Identifier for a single artifact file belonging to a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId {
    pub module: ModuleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    pub extension: String,
}

impl ArtifactId {
    pub fn new(module: ModuleId, extension: impl Into<String>) -> Self {
        Self {
            module,
            classifier: None,
            extension: extension.into(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// File name of this artifact within its module directory
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.module.name, self.module.version, classifier, self.extension
            ),
            None => format!(
                "{}-{}.{}",
                self.module.name, self.module.version, self.extension
            ),
        }
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.module, self.file_name())
    }
}

/// Constructs module identifiers from their parts
///
/// Injected into parsers so that identifier construction stays a single,
/// replaceable capability rather than ad-hoc struct literals.
pub trait ModuleIdFactory: Send + Sync {
    fn module(&self, group: &str, name: &str, version: &str) -> ModuleId;
}

/// Default identifier factory
#[derive(Debug, Default)]
pub struct DefaultModuleIdFactory;

impl ModuleIdFactory for DefaultModuleIdFactory {
    fn module(&self, group: &str, name: &str, version: &str) -> ModuleId {
        ModuleId {
            group: group.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }
}

/// Supported metadata descriptor formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataKind {
    /// Structured module-metadata file (JSON)
    Structured,
    /// Legacy POM-style descriptor (XML)
    LegacyPom,
}

impl MetadataKind {
    /// File name of the descriptor for a module in this format
    pub fn descriptor_file_name(&self, module: &ModuleId) -> String {
        match self {
            MetadataKind::Structured => {
                format!("{}-{}.module", module.name, module.version)
            }
            MetadataKind::LegacyPom => {
                format!("{}-{}.pom", module.name, module.version)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetadataKind::Structured => "module",
            MetadataKind::LegacyPom => "pom",
        }
    }
}

/// Parsed module descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub id: ModuleId,
    /// Direct dependencies, in declaration order
    pub dependencies: Vec<ModuleId>,
    /// Which descriptor format produced this metadata
    pub source_kind: MetadataKind,
}

/// Parses raw descriptor bytes into module metadata
pub trait MetadataParser: Send + Sync {
    /// Parse a fetched descriptor resource
    ///
    /// `repository` names the repository for diagnostics only. Fails with
    /// [`RepoError::MetadataParse`] on malformed input.
    fn parse(
        &self,
        repository: &str,
        resource: &[u8],
        ids: &dyn ModuleIdFactory,
    ) -> Result<ModuleMetadata>;
}

/// Lets a validator probe for artifact presence without owning a transport
pub trait ArtifactLocator {
    fn has_artifact(&self, artifact: &ArtifactId) -> bool;
}

/// Inspects freshly-parsed metadata against a repository-specific policy
///
/// Validators are pure: they must not mutate the metadata they inspect.
/// A `false` result makes the resolver fall through to the next metadata
/// source rather than failing the lookup.
pub trait MetadataValidator: Send + Sync {
    fn validate(
        &self,
        repository: &str,
        metadata: &ModuleMetadata,
        artifacts: &dyn ArtifactLocator,
    ) -> bool;
}

/// Default validation policy: accept everything
#[derive(Debug, Default)]
pub struct AcceptAllValidator;

impl MetadataValidator for AcceptAllValidator {
    fn validate(&self, _: &str, _: &ModuleMetadata, _: &dyn ArtifactLocator) -> bool {
        true
    }
}

/// Wire format of a structured (JSON) module descriptor
#[derive(Debug, Deserialize)]
struct StructuredDescriptor {
    #[serde(rename = "formatVersion")]
    format_version: String,
    component: StructuredComponent,
    #[serde(default)]
    dependencies: Vec<StructuredDependency>,
}

#[derive(Debug, Deserialize)]
struct StructuredComponent {
    group: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct StructuredDependency {
    group: String,
    module: String,
    version: String,
}

/// Parser for structured module-metadata files
#[derive(Debug, Default)]
pub struct StructuredMetadataParser;

impl StructuredMetadataParser {
    const SUPPORTED_FORMAT: &'static str = "1.0";
}

impl MetadataParser for StructuredMetadataParser {
    fn parse(
        &self,
        repository: &str,
        resource: &[u8],
        ids: &dyn ModuleIdFactory,
    ) -> Result<ModuleMetadata> {
        let parse_err = |message: String| RepoError::MetadataParse {
            repository: repository.to_string(),
            format: MetadataKind::Structured.label().to_string(),
            message,
        };

        let descriptor: StructuredDescriptor =
            serde_json::from_slice(resource).map_err(|e| parse_err(e.to_string()))?;

        if descriptor.format_version != Self::SUPPORTED_FORMAT {
            return Err(parse_err(format!(
                "unsupported format version '{}'",
                descriptor.format_version
            )));
        }
        // Component versions in structured descriptors must be semver.
        semver::Version::parse(&descriptor.component.version)
            .map_err(|e| parse_err(format!("invalid component version: {}", e)))?;

        let component = &descriptor.component;
        let id = ids.module(&component.group, &component.module, &component.version);
        let dependencies = descriptor
            .dependencies
            .iter()
            .map(|d| ids.module(&d.group, &d.module, &d.version))
            .collect();

        Ok(ModuleMetadata {
            id,
            dependencies,
            source_kind: MetadataKind::Structured,
        })
    }
}

/// Parser for legacy POM-style descriptors
///
/// Reads only the coordinate and dependency elements; everything else in
/// the descriptor is ignored.
#[derive(Debug, Default)]
pub struct LegacyPomParser;

impl LegacyPomParser {
    fn element<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
        let open = format!("<{}>", tag);
        let close = format!("</{}>", tag);
        let start = text.find(&open)? + open.len();
        let end = text[start..].find(&close)? + start;
        Some(text[start..end].trim())
    }

    fn required<'a>(
        text: &'a str,
        tag: &str,
        repository: &str,
    ) -> Result<&'a str> {
        Self::element(text, tag).ok_or_else(|| RepoError::MetadataParse {
            repository: repository.to_string(),
            format: MetadataKind::LegacyPom.label().to_string(),
            message: format!("missing <{}> element", tag),
        })
    }
}

impl MetadataParser for LegacyPomParser {
    fn parse(
        &self,
        repository: &str,
        resource: &[u8],
        ids: &dyn ModuleIdFactory,
    ) -> Result<ModuleMetadata> {
        let text = std::str::from_utf8(resource).map_err(|e| RepoError::MetadataParse {
            repository: repository.to_string(),
            format: MetadataKind::LegacyPom.label().to_string(),
            message: format!("descriptor is not valid UTF-8: {}", e),
        })?;

        let body = match text.find("<dependencies>") {
            Some(pos) => &text[..pos],
            None => text,
        };
        let group = Self::required(body, "groupId", repository)?;
        let name = Self::required(body, "artifactId", repository)?;
        let version = Self::required(body, "version", repository)?;
        let id = ids.module(group, name, version);

        let mut dependencies = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find("<dependency>") {
            rest = &rest[start + "<dependency>".len()..];
            let end = rest.find("</dependency>").ok_or_else(|| {
                RepoError::MetadataParse {
                    repository: repository.to_string(),
                    format: MetadataKind::LegacyPom.label().to_string(),
                    message: "unterminated <dependency> element".to_string(),
                }
            })?;
            let dep = &rest[..end];
            let dep_group = Self::required(dep, "groupId", repository)?;
            let dep_name = Self::required(dep, "artifactId", repository)?;
            let dep_version = Self::required(dep, "version", repository)?;
            dependencies.push(ids.module(dep_group, dep_name, dep_version));
            rest = &rest[end..];
        }

        Ok(ModuleMetadata {
            id,
            dependencies,
            source_kind: MetadataKind::LegacyPom,
        })
    }
}

/// One metadata format a repository can serve: a parser plus a validator
#[derive(Clone)]
pub struct MetadataSource {
    pub kind: MetadataKind,
    pub parser: Arc<dyn MetadataParser>,
    pub validator: Arc<dyn MetadataValidator>,
}

impl MetadataSource {
    pub fn structured(parser: Arc<dyn MetadataParser>) -> Self {
        Self {
            kind: MetadataKind::Structured,
            parser,
            validator: Arc::new(AcceptAllValidator),
        }
    }

    pub fn legacy_pom(parser: Arc<dyn MetadataParser>) -> Self {
        Self {
            kind: MetadataKind::LegacyPom,
            parser,
            validator: Arc::new(AcceptAllValidator),
        }
    }

    /// Replace the validation policy for this source
    pub fn with_validator(mut self, validator: Arc<dyn MetadataValidator>) -> Self {
        self.validator = validator;
        self
    }
}

impl std::fmt::Debug for MetadataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataSource")
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered, mutable collection of metadata sources
///
/// Mutable only until a resolver is built from it; [`Self::as_immutable`]
/// takes a frozen snapshot that later mutation cannot affect.
#[derive(Debug, Clone, Default)]
pub struct MetadataSourceSet {
    sources: Vec<MetadataSource>,
}

impl MetadataSourceSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock pairing: structured module metadata plus legacy POM,
    /// each with the accept-all validator
    pub fn defaults() -> Self {
        let mut set = Self::new();
        set.add(MetadataSource::structured(Arc::new(
            StructuredMetadataParser,
        )));
        set.add(MetadataSource::legacy_pom(Arc::new(LegacyPomParser)));
        set
    }

    pub fn add(&mut self, source: MetadataSource) {
        self.sources.push(source);
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Freeze the set into the resolution order a resolver will use
    ///
    /// When `prefer_structured` is set, structured sources come before
    /// legacy ones; otherwise the order is reversed. Within each kind the
    /// insertion order is preserved.
    pub fn as_immutable(&self, prefer_structured: bool) -> MetadataSourceOrder {
        let preferred_kind = if prefer_structured {
            MetadataKind::Structured
        } else {
            MetadataKind::LegacyPom
        };
        let mut ordered: Vec<MetadataSource> = Vec::with_capacity(self.sources.len());
        ordered.extend(
            self.sources
                .iter()
                .filter(|s| s.kind == preferred_kind)
                .cloned(),
        );
        ordered.extend(
            self.sources
                .iter()
                .filter(|s| s.kind != preferred_kind)
                .cloned(),
        );
        MetadataSourceOrder {
            sources: ordered.into(),
        }
    }
}

/// Immutable snapshot of a [`MetadataSourceSet`] in resolution order
#[derive(Debug, Clone)]
pub struct MetadataSourceOrder {
    sources: Arc<[MetadataSource]>,
}

impl MetadataSourceOrder {
    pub fn iter(&self) -> impl Iterator<Item = &MetadataSource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
