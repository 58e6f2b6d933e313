use std::{collections::BTreeSet, path::Path, sync::Arc};

use crate::{
    classify::{is_system_identity, AssemblySource},
    graph::NodeId,
    identity::AssemblyIdentity,
    loader::AssemblyMetadata,
};

/// How a node was resolved.
///
/// The metadata handle only exists in the resolved state and the alternative version
/// only in the unresolved one, so a node can never carry both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Metadata was loaded.
    Resolved {
        /// `Local`, `GlobalCache` or `Unknown`
        source: AssemblySource,
        /// The loaded metadata
        metadata: Arc<AssemblyMetadata>,
    },
    /// Nothing was loaded (yet).
    NotFound {
        /// A resolved node with the same simple name, if one was found.
        alternative: Option<NodeId>,
    },
}

impl Resolution {
    /// The provenance this resolution implies.
    #[must_use]
    pub fn source(&self) -> AssemblySource {
        match self {
            Resolution::Resolved { source, .. } => *source,
            Resolution::NotFound { .. } => AssemblySource::NotFound,
        }
    }
}

/// A vertex of the reference graph: one per effective identity.
#[derive(Debug, Clone)]
pub struct AssemblyNode {
    pub(crate) id: NodeId,
    pub(crate) identity: AssemblyIdentity,
    pub(crate) effective_identity: AssemblyIdentity,
    pub(crate) key: String,
    pub(crate) origin_file_name: Option<String>,
    pub(crate) resolution: Resolution,
    pub(crate) references: BTreeSet<NodeId>,
    pub(crate) referenced_by: BTreeSet<NodeId>,
    pub(crate) reachable_from_root: bool,
}

impl AssemblyNode {
    pub(crate) fn new(
        id: NodeId,
        identity: AssemblyIdentity,
        effective_identity: AssemblyIdentity,
    ) -> Self {
        let key = effective_identity.key();
        AssemblyNode {
            id,
            identity,
            effective_identity,
            key,
            origin_file_name: None,
            resolution: Resolution::NotFound { alternative: None },
            references: BTreeSet::new(),
            referenced_by: BTreeSet::new(),
            reachable_from_root: false,
        }
    }

    /// This node's id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The identity as declared, before redirection.
    #[must_use]
    pub fn identity(&self) -> &AssemblyIdentity {
        &self.identity
    }

    /// The identity after redirection.
    #[must_use]
    pub fn effective_identity(&self) -> &AssemblyIdentity {
        &self.effective_identity
    }

    /// The graph key: lowercase display name of the effective identity.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// How the node was resolved.
    #[must_use]
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Where the metadata came from.
    #[must_use]
    pub fn source(&self) -> AssemblySource {
        self.resolution.source()
    }

    /// File name of the analyzed file this node was loaded from.
    #[must_use]
    pub fn origin_file_name(&self) -> Option<&str> {
        self.origin_file_name.as_deref()
    }

    /// The loaded metadata, if resolved.
    #[must_use]
    pub fn metadata(&self) -> Option<&Arc<AssemblyMetadata>> {
        match &self.resolution {
            Resolution::Resolved { metadata, .. } => Some(metadata),
            Resolution::NotFound { .. } => None,
        }
    }

    /// Path of the binary the metadata was read from, if resolved.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.metadata().map(|metadata| metadata.location.as_path())
    }

    /// Returns `true` if the identity looks like a platform assembly.
    #[must_use]
    pub fn is_system(&self) -> bool {
        is_system_identity(&self.identity)
    }

    /// Returns `true` if redirection changed the identity.
    #[must_use]
    pub fn is_redirected(&self) -> bool {
        self.identity != self.effective_identity
    }

    /// The alternative version attached to an unresolved node.
    #[must_use]
    pub fn alternative_version(&self) -> Option<NodeId> {
        match self.resolution {
            Resolution::NotFound { alternative } => alternative,
            Resolution::Resolved { .. } => None,
        }
    }

    /// Returns `true` if an alternative version is attached.
    #[must_use]
    pub fn has_alternative_version(&self) -> bool {
        self.alternative_version().is_some()
    }

    /// Returns `true` if the node is reachable from a root.
    #[must_use]
    pub fn reachable_from_root(&self) -> bool {
        self.reachable_from_root
    }

    /// Nodes this node references, in id order.
    pub fn references(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.references.iter().copied()
    }

    /// Nodes referencing this node, in id order.
    pub fn referenced_by(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.referenced_by.iter().copied()
    }

    /// Number of outgoing edges.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Number of incoming edges.
    #[must_use]
    pub fn referenced_by_count(&self) -> usize {
        self.referenced_by.len()
    }

    /// Returns `true` if the node still lacks metadata and no alternative was attached.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(
            self.resolution,
            Resolution::NotFound { alternative: None }
        )
    }

    pub(crate) fn has_metadata(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved { .. })
    }

    /// Attaches metadata. A node keeps the first metadata it receives.
    ///
    /// # Panics
    /// Panics if `source` is [`AssemblySource::NotFound`] or an alternative is attached.
    pub(crate) fn resolve(
        &mut self,
        source: AssemblySource,
        metadata: Arc<AssemblyMetadata>,
        origin_file_name: Option<String>,
    ) -> bool {
        assert!(
            source.is_resolved(),
            "cannot resolve {} as NotFound",
            self.key
        );

        match self.resolution {
            Resolution::Resolved { .. } => false,
            Resolution::NotFound { alternative } => {
                assert!(
                    alternative.is_none(),
                    "cannot resolve {}: an alternative version is attached",
                    self.key
                );
                self.resolution = Resolution::Resolved { source, metadata };
                self.origin_file_name = origin_file_name;
                true
            }
        }
    }

    /// # Panics
    /// Panics if the node already holds metadata.
    pub(crate) fn set_alternative(&mut self, alternative: NodeId) {
        match &mut self.resolution {
            Resolution::NotFound { alternative: slot } => *slot = Some(alternative),
            Resolution::Resolved { .. } => panic!(
                "cannot attach an alternative version to resolved node {}",
                self.key
            ),
        }
    }
}
