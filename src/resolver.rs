//! Resolver construction
//!
//! [`ResolverFactory`] turns a [`RepositoryDescriptor`] plus injected
//! services into a [`RepositoryResolver`]. Construction is pure object
//! wiring: the URL is resolved and a transport selected, but no network or
//! filesystem access happens until the resolver starts serving lookups.

use crate::error::{RepoError, Result};
use crate::metadata::{
    ArtifactId, ArtifactLocator, DefaultModuleIdFactory, MetadataSourceOrder, MetadataSourceSet,
    ModuleId, ModuleIdFactory, ModuleMetadata,
};
use crate::repository::RepositoryDescriptor;
use crate::store::{DirectoryStore, FileStore};
use crate::transport::{DefaultTransportFactory, Transport, TransportFactory};
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Assembles resolvers from descriptors and injected services
///
/// The collaborator set is fixed and known at configuration time, so the
/// factory is a plain struct of capabilities rather than any kind of
/// service registry.
#[derive(Clone)]
pub struct ResolverFactory {
    transports: Arc<dyn TransportFactory>,
    artifact_store: Arc<dyn FileStore<ArtifactId>>,
    resource_store: Arc<dyn FileStore<String>>,
    ids: Arc<dyn ModuleIdFactory>,
}

impl ResolverFactory {
    pub fn new(
        transports: Arc<dyn TransportFactory>,
        artifact_store: Arc<dyn FileStore<ArtifactId>>,
        resource_store: Arc<dyn FileStore<String>>,
        ids: Arc<dyn ModuleIdFactory>,
    ) -> Self {
        Self {
            transports,
            artifact_store,
            resource_store,
            ids,
        }
    }

    /// Factory wired with the stock transport factory, directory stores
    /// under `cache_dir`, and the default identifier factory
    pub fn with_default_services(cache_dir: impl AsRef<Path>) -> Self {
        let cache_dir = cache_dir.as_ref();
        Self::new(
            Arc::new(DefaultTransportFactory),
            Arc::new(DirectoryStore::new(cache_dir.join("artifacts"))),
            Arc::new(DirectoryStore::new(cache_dir.join("resources"))),
            Arc::new(DefaultModuleIdFactory),
        )
    }

    /// Build a resolver bound to a snapshot of `descriptor` and `sources`
    ///
    /// The descriptor must have a primary URL; that is the single hard
    /// precondition. Each call snapshots afresh, so two builds from the
    /// same descriptor are independent and reflect the descriptor state at
    /// their respective build times.
    pub fn build(
        &self,
        descriptor: &RepositoryDescriptor,
        sources: &MetadataSourceSet,
    ) -> Result<RepositoryResolver> {
        let root = descriptor
            .url()?
            .ok_or_else(|| RepoError::MissingConfiguration {
                repository: descriptor.name().to_string(),
                message: "a URL for the repository must be specified".to_string(),
            })?;

        let transport = self.transports.create_transport(
            root.scheme(),
            descriptor.name(),
            descriptor.authentication(),
        )?;

        let order = sources.as_immutable(descriptor.prefer_structured_metadata());

        let mut resolver = RepositoryResolver {
            name: descriptor.name().to_string(),
            root,
            transport,
            sources: order,
            artifact_store: Arc::clone(&self.artifact_store),
            resource_store: Arc::clone(&self.resource_store),
            ids: Arc::clone(&self.ids),
            artifact_locations: Vec::new(),
        };

        for url in descriptor.resolved_artifact_urls()? {
            resolver.add_artifact_location(url);
        }

        log::debug!("built resolver for {}", descriptor.display_name());
        Ok(resolver)
    }
}

/// A repository resolver, bound to immutable snapshots taken at build time
///
/// Later mutation of the originating descriptor or metadata-source set is
/// invisible here. Safe to share for concurrent read-only resolution as
/// long as the underlying transport and stores are.
pub struct RepositoryResolver {
    name: String,
    root: Url,
    transport: Arc<dyn Transport>,
    sources: MetadataSourceOrder,
    artifact_store: Arc<dyn FileStore<ArtifactId>>,
    resource_store: Arc<dyn FileStore<String>>,
    ids: Arc<dyn ModuleIdFactory>,
    artifact_locations: Vec<Url>,
}

impl RepositoryResolver {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_url(&self) -> &Url {
        &self.root
    }

    /// Register an additional artifact-fetch location
    ///
    /// Fallback locations are consulted for artifact bytes only, never for
    /// metadata, in registration order.
    pub fn add_artifact_location(&mut self, url: Url) {
        self.artifact_locations.push(url);
    }

    pub fn artifact_locations(&self) -> &[Url] {
        &self.artifact_locations
    }

    /// Locate metadata for a module
    ///
    /// Metadata sources are tried in the order frozen at build time; a
    /// source whose descriptor is absent or rejected by its validator
    /// falls through to the next one. Parse failures propagate.
    pub fn resolve(&self, module: &ModuleId) -> Result<Option<ModuleMetadata>> {
        for source in self.sources.iter() {
            let file = source.kind.descriptor_file_name(module);
            let url = self.module_file_url(&self.root, module, &file)?;

            let bytes = match self.transport.fetch(&url)? {
                Some(bytes) => bytes,
                None => {
                    log::debug!("{}: no {} descriptor for {}", self.name, source.kind.label(), module);
                    continue;
                }
            };

            let metadata = source.parser.parse(&self.name, &bytes, self.ids.as_ref())?;
            if !source.validator.validate(&self.name, &metadata, self) {
                log::debug!(
                    "{}: {} metadata for {} rejected by validator",
                    self.name,
                    source.kind.label(),
                    module
                );
                continue;
            }

            let resource_key = format!("{}{}", self.name, url.path());
            self.resource_store.put(&resource_key, &bytes)?;
            return Ok(Some(metadata));
        }
        Ok(None)
    }

    /// Fetch the bytes of an artifact
    ///
    /// The primary URL is tried first, then the fallback artifact
    /// locations in registration order; first match wins.
    pub fn fetch_artifact(&self, artifact: &ArtifactId) -> Result<Option<Vec<u8>>> {
        for base in std::iter::once(&self.root).chain(self.artifact_locations.iter()) {
            let url = self.module_file_url(base, &artifact.module, &artifact.file_name())?;
            if let Some(bytes) = self.transport.fetch(&url)? {
                self.artifact_store.put(artifact, &bytes)?;
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    /// Publish an artifact to the primary URL
    pub fn publish(&self, artifact: &ArtifactId, bytes: &[u8]) -> Result<()> {
        let url = self.module_file_url(&self.root, &artifact.module, &artifact.file_name())?;
        self.transport.put(&url, bytes)?;
        log::debug!("{}: published {}", self.name, artifact);
        Ok(())
    }

    /// URL of a file within a module's directory under `base`
    fn module_file_url(&self, base: &Url, module: &ModuleId, file: &str) -> Result<Url> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RepoError::InvalidLocation {
                    token: base.to_string(),
                    message: "repository URL cannot have paths appended".to_string(),
                }
            })?;
            segments.pop_if_empty();
            segments.extend(module.group.split('.'));
            segments.push(&module.name);
            segments.push(&module.version);
            segments.push(file);
        }
        Ok(url)
    }
}

impl ArtifactLocator for RepositoryResolver {
    fn has_artifact(&self, artifact: &ArtifactId) -> bool {
        let url = match self.module_file_url(&self.root, &artifact.module, &artifact.file_name()) {
            Ok(url) => url,
            Err(_) => return false,
        };
        match self.transport.fetch(&url) {
            Ok(found) => found.is_some(),
            Err(e) => {
                log::debug!("{}: artifact probe for {} failed: {}", self.name, artifact, e);
                false
            }
        }
    }
}

impl std::fmt::Debug for RepositoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryResolver")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("artifact_locations", &self.artifact_locations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::BaseDirResolver;
    use crate::metadata::{DefaultModuleIdFactory, MetadataKind};
    use crate::transport::Authentication;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory transport recording every URL it is asked for
    #[derive(Default)]
    struct MemoryTransport {
        resources: Mutex<HashMap<String, Vec<u8>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MemoryTransport {
        fn insert(&self, url: &str, bytes: &[u8]) {
            self.resources
                .lock()
                .unwrap()
                .insert(url.to_string(), bytes.to_vec());
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for MemoryTransport {
        fn fetch(&self, url: &Url) -> Result<Option<Vec<u8>>> {
            self.requests.lock().unwrap().push(url.to_string());
            Ok(self.resources.lock().unwrap().get(url.as_str()).cloned())
        }

        fn put(&self, url: &Url, bytes: &[u8]) -> Result<()> {
            self.insert(url.as_str(), bytes);
            Ok(())
        }
    }

    struct MemoryTransportFactory(Arc<MemoryTransport>);

    impl TransportFactory for MemoryTransportFactory {
        fn create_transport(
            &self,
            _scheme: &str,
            _repository: &str,
            _authentication: &Authentication,
        ) -> Result<Arc<dyn Transport>> {
            let transport: Arc<dyn Transport> = self.0.clone();
            Ok(transport)
        }
    }

    struct Fixture {
        transport: Arc<MemoryTransport>,
        factory: ResolverFactory,
        _cache: TempDir,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(MemoryTransport::default());
        let cache = TempDir::new().unwrap();
        let factory = ResolverFactory::new(
            Arc::new(MemoryTransportFactory(Arc::clone(&transport))),
            Arc::new(DirectoryStore::new(cache.path().join("artifacts"))),
            Arc::new(DirectoryStore::new(cache.path().join("resources"))),
            Arc::new(DefaultModuleIdFactory),
        );
        Fixture {
            transport,
            factory,
            _cache: cache,
        }
    }

    fn descriptor(name: &str, url: &str) -> RepositoryDescriptor {
        let mut repo = RepositoryDescriptor::new(name, BaseDirResolver::new("/project"));
        repo.set_url(url);
        repo
    }

    fn module(name: &str, version: &str) -> ModuleId {
        DefaultModuleIdFactory.module("org.example", name, version)
    }

    const POM: &str = "<project>\
        <groupId>org.example</groupId>\
        <artifactId>core</artifactId>\
        <version>1.0.0</version>\
        </project>";

    const MODULE_JSON: &str = r#"{
        "formatVersion": "1.0",
        "component": { "group": "org.example", "module": "core", "version": "1.0.0" }
    }"#;

    #[test]
    fn test_missing_url_fails_build() {
        let fx = fixture();
        let repo = RepositoryDescriptor::new("central", BaseDirResolver::new("/project"));
        let result = fx.factory.build(&repo, &MetadataSourceSet::defaults());
        assert!(matches!(
            result,
            Err(RepoError::MissingConfiguration { .. })
        ));
    }

    #[test]
    fn test_legacy_first_by_default() {
        let fx = fixture();
        let repo = descriptor("central", "https://example.org/m2");
        let resolver = fx.factory.build(&repo, &MetadataSourceSet::defaults()).unwrap();

        resolver.resolve(&module("core", "1.0.0")).unwrap();

        let requests = fx.transport.requests();
        assert!(requests[0].ends_with("core-1.0.0.pom"));
        assert!(requests[1].ends_with("core-1.0.0.module"));
    }

    #[test]
    fn test_structured_first_when_preferred() {
        let fx = fixture();
        let mut repo = descriptor("central", "https://example.org/m2");
        repo.set_prefer_structured_metadata(true);
        let resolver = fx.factory.build(&repo, &MetadataSourceSet::defaults()).unwrap();

        resolver.resolve(&module("core", "1.0.0")).unwrap();

        let requests = fx.transport.requests();
        assert!(requests[0].ends_with("core-1.0.0.module"));
        assert!(requests[1].ends_with("core-1.0.0.pom"));
    }

    #[test]
    fn test_falls_back_to_legacy_when_structured_absent() {
        let fx = fixture();
        fx.transport.insert(
            "https://example.org/m2/org/example/core/1.0.0/core-1.0.0.pom",
            POM.as_bytes(),
        );

        let mut repo = descriptor("central", "https://example.org/m2");
        repo.set_prefer_structured_metadata(true);
        let resolver = fx.factory.build(&repo, &MetadataSourceSet::defaults()).unwrap();

        let metadata = resolver.resolve(&module("core", "1.0.0")).unwrap().unwrap();
        assert_eq!(metadata.source_kind, MetadataKind::LegacyPom);
    }

    #[test]
    fn test_structured_metadata_wins_when_present() {
        let fx = fixture();
        fx.transport.insert(
            "https://example.org/m2/org/example/core/1.0.0/core-1.0.0.module",
            MODULE_JSON.as_bytes(),
        );
        fx.transport.insert(
            "https://example.org/m2/org/example/core/1.0.0/core-1.0.0.pom",
            POM.as_bytes(),
        );

        let mut repo = descriptor("central", "https://example.org/m2");
        repo.set_prefer_structured_metadata(true);
        let resolver = fx.factory.build(&repo, &MetadataSourceSet::defaults()).unwrap();

        let metadata = resolver.resolve(&module("core", "1.0.0")).unwrap().unwrap();
        assert_eq!(metadata.source_kind, MetadataKind::Structured);
    }

    #[test]
    fn test_not_found_when_no_descriptor() {
        let fx = fixture();
        let repo = descriptor("central", "https://example.org/m2");
        let resolver = fx.factory.build(&repo, &MetadataSourceSet::defaults()).unwrap();
        assert!(resolver.resolve(&module("core", "1.0.0")).unwrap().is_none());
    }

    #[test]
    fn test_artifact_fallback_locations_in_order() {
        let fx = fixture();
        fx.transport.insert(
            "https://mirror-b.example.org/org/example/core/1.0.0/core-1.0.0.jar",
            b"jar-bytes",
        );

        let mut repo = descriptor("central", "https://example.org/m2");
        repo.artifact_urls(["https://mirror-a.example.org", "https://mirror-b.example.org"]);
        let resolver = fx.factory.build(&repo, &MetadataSourceSet::defaults()).unwrap();

        assert_eq!(resolver.artifact_locations().len(), 2);

        let artifact = ArtifactId::new(module("core", "1.0.0"), "jar");
        let bytes = resolver.fetch_artifact(&artifact).unwrap().unwrap();
        assert_eq!(bytes, b"jar-bytes");

        // root first, then fallbacks in registration order
        let requests = fx.transport.requests();
        assert!(requests[0].starts_with("https://example.org/m2/"));
        assert!(requests[1].starts_with("https://mirror-a.example.org/"));
        assert!(requests[2].starts_with("https://mirror-b.example.org/"));
    }

    #[test]
    fn test_fallback_locations_not_used_for_metadata() {
        let fx = fixture();
        fx.transport.insert(
            "https://mirror.example.org/org/example/core/1.0.0/core-1.0.0.pom",
            POM.as_bytes(),
        );

        let mut repo = descriptor("central", "https://example.org/m2");
        repo.artifact_urls(["https://mirror.example.org"]);
        let resolver = fx.factory.build(&repo, &MetadataSourceSet::defaults()).unwrap();

        // Metadata only exists on the mirror, which must not be consulted.
        assert!(resolver.resolve(&module("core", "1.0.0")).unwrap().is_none());
    }

    #[test]
    fn test_each_build_snapshots_descriptor() {
        let fx = fixture();
        let sources = MetadataSourceSet::defaults();
        let mut repo = descriptor("central", "https://one.example.org");
        let first = fx.factory.build(&repo, &sources).unwrap();

        repo.set_url("https://two.example.org");
        let second = fx.factory.build(&repo, &sources).unwrap();

        assert_eq!(first.root_url().as_str(), "https://one.example.org/");
        assert_eq!(second.root_url().as_str(), "https://two.example.org/");
    }

    #[test]
    fn test_publish_round_trip() {
        let fx = fixture();
        let repo = descriptor("central", "https://example.org/m2");
        let resolver = fx.factory.build(&repo, &MetadataSourceSet::defaults()).unwrap();

        let artifact = ArtifactId::new(module("core", "1.0.0"), "jar");
        resolver.publish(&artifact, b"published").unwrap();
        assert_eq!(
            resolver.fetch_artifact(&artifact).unwrap().unwrap(),
            b"published"
        );
    }

    /// Only accepts metadata whose main jar is actually present
    struct RequireJarValidator;

    impl crate::metadata::MetadataValidator for RequireJarValidator {
        fn validate(
            &self,
            _repository: &str,
            metadata: &crate::metadata::ModuleMetadata,
            artifacts: &dyn crate::metadata::ArtifactLocator,
        ) -> bool {
            artifacts.has_artifact(&ArtifactId::new(metadata.id.clone(), "jar"))
        }
    }

    #[test]
    fn test_validator_rejection_falls_through() {
        let fx = fixture();
        // POM exists but the jar does not, so the validating source must
        // reject and the lookup report not-found.
        fx.transport.insert(
            "https://example.org/m2/org/example/core/1.0.0/core-1.0.0.pom",
            POM.as_bytes(),
        );

        let mut sources = crate::metadata::MetadataSourceSet::new();
        sources.add(
            crate::metadata::MetadataSource::legacy_pom(Arc::new(crate::metadata::LegacyPomParser))
                .with_validator(Arc::new(RequireJarValidator)),
        );

        let repo = descriptor("central", "https://example.org/m2");
        let resolver = fx.factory.build(&repo, &sources).unwrap();
        assert!(resolver.resolve(&module("core", "1.0.0")).unwrap().is_none());

        // With the jar present the same lookup succeeds.
        fx.transport.insert(
            "https://example.org/m2/org/example/core/1.0.0/core-1.0.0.jar",
            b"jar-bytes",
        );
        assert!(resolver.resolve(&module("core", "1.0.0")).unwrap().is_some());
    }

    #[test]
    fn test_parse_error_propagates() {
        let fx = fixture();
        fx.transport.insert(
            "https://example.org/m2/org/example/core/1.0.0/core-1.0.0.pom",
            b"not a descriptor",
        );

        let repo = descriptor("central", "https://example.org/m2");
        let resolver = fx.factory.build(&repo, &MetadataSourceSet::defaults()).unwrap();

        let result = resolver.resolve(&module("core", "1.0.0"));
        assert!(matches!(result, Err(RepoError::MetadataParse { .. })));
    }
}
