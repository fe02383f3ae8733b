//! Repository configuration and resolver construction for Caravel
//!
//! This crate is the layer of the build tool that describes where external
//! dependency artifacts live and turns those descriptions into resolvers.
//! A [`RepositoryDescriptor`] carries identity, a lazily-resolved primary
//! URL and additional artifact search URLs; a [`ResolverFactory`] combines
//! it with injected transport, store and parser capabilities into a
//! [`RepositoryResolver`] that the dependency-resolution engine consumes.
//! [`RetentionPolicy`] configures how long unused local cache entries are
//! retained for the external cleanup sweep.
//!
//! Descriptors are configuration-time objects: build a resolver from one
//! and the resolver keeps its own immutable snapshot.

pub mod config;
pub mod error;
pub mod location;
pub mod metadata;
pub mod repository;
pub mod resolver;
pub mod retention;
pub mod store;
pub mod transport;

pub use config::RepoConfig;
pub use error::{RepoError, Result};
pub use location::{BaseDirResolver, Location, LocationResolver};
pub use metadata::{
    AcceptAllValidator, ArtifactId, ArtifactLocator, DefaultModuleIdFactory, LegacyPomParser,
    MetadataKind, MetadataParser, MetadataSource, MetadataSourceOrder, MetadataSourceSet,
    MetadataValidator, ModuleId, ModuleIdFactory, ModuleMetadata, StructuredMetadataParser,
};
pub use repository::RepositoryDescriptor;
pub use resolver::{RepositoryResolver, ResolverFactory};
pub use retention::RetentionPolicy;
pub use store::{DirectoryStore, FileStore, StoreKey};
pub use transport::{
    Authentication, DefaultTransportFactory, FileTransport, HttpTransport, Transport,
    TransportFactory,
};
