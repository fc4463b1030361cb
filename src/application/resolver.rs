//! Depth-bounded expansion of artifact references into nested views.
//!
//! Resolution happens in two phases. [`ReferenceResolver`] walks the graph
//! breadth-first, fetching each missing record batch and reference batch from
//! the store exactly once. [`ArtifactGraph::materialize`] then builds views
//! without touching the store, memoizing by `(artifact id, remaining depth)`
//! so that a target reachable from several parents is built once and shared.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::repos::{ArtifactsRepo, RepoError};
use crate::domain::entities::{ArtifactRecord, NavigationChoiceRecord, ReferenceEdge, ReferenceSet};
use crate::domain::references::{EdgeOrdering, REFERENCE_POLICIES, ReferenceKind};
use crate::domain::types::ArtifactType;

const METRIC_RESOLVE_MS: &str = "oracle_artifact_resolve_ms";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("artifact `{id}` is referenced but was not found")]
    MissingArtifact { id: i64 },
}

/// A reference list: bare target guids at the depth frontier, nested views above it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReferenceField {
    Leaf(Vec<Uuid>),
    Nested(Vec<Arc<ArtifactView>>),
}

impl ReferenceField {
    pub fn len(&self) -> usize {
        match self {
            ReferenceField::Leaf(guids) => guids.len(),
            ReferenceField::Nested(views) => views.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn guids(&self) -> Vec<Uuid> {
        match self {
            ReferenceField::Leaf(guids) => guids.clone(),
            ReferenceField::Nested(views) => views.iter().map(|view| view.guid).collect(),
        }
    }
}

impl Default for ReferenceField {
    fn default() -> Self {
        ReferenceField::Leaf(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    pub title: String,
    pub order: i32,
    pub artifact_id: Option<Uuid>,
}

impl From<&NavigationChoiceRecord> for ChoiceView {
    fn from(record: &NavigationChoiceRecord) -> Self {
        Self {
            title: record.choice.clone(),
            order: record.order,
            artifact_id: record.target_guid,
        }
    }
}

/// The serialized shape of one artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactView {
    #[serde(rename = "id")]
    pub guid: Uuid,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub artifacts: ReferenceField,
    pub answers: ReferenceField,
    pub content: String,
    pub test_cases: ReferenceField,
    pub choices: Vec<ChoiceView>,
    pub in_line: bool,
    pub boilerplate_code: Option<Uuid>,
    pub programming_resources: ReferenceField,
    pub topics: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub creation_time: OffsetDateTime,
    pub creator: Option<String>,
    pub title: Option<String>,
    pub deprecated: bool,
}

impl ArtifactView {
    fn references_mut(&mut self, kind: ReferenceKind) -> &mut ReferenceField {
        match kind {
            ReferenceKind::Children => &mut self.artifacts,
            ReferenceKind::Answers => &mut self.answers,
            ReferenceKind::TestCases => &mut self.test_cases,
            ReferenceKind::ProgrammingResources => &mut self.programming_resources,
        }
    }
}

/// Records and references loaded for one resolve call.
#[derive(Debug, Default)]
pub struct ArtifactGraph {
    records: HashMap<i64, ArtifactRecord>,
    edges: HashMap<i64, Vec<ReferenceEdge>>,
    choices: HashMap<i64, Vec<NavigationChoiceRecord>>,
    references_loaded: HashSet<i64>,
}

type Memo = HashMap<(i64, u32), Arc<ArtifactView>>;

impl ArtifactGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_record(&mut self, record: ArtifactRecord) {
        self.records.entry(record.id).or_insert(record);
    }

    pub fn contains_record(&self, id: i64) -> bool {
        self.records.contains_key(&id)
    }

    pub fn has_references(&self, id: i64) -> bool {
        self.references_loaded.contains(&id)
    }

    /// Stores the references of `owners`. Owners without rows are marked loaded too.
    pub fn insert_references(&mut self, owners: &[i64], set: ReferenceSet) {
        for owner in owners {
            self.references_loaded.insert(*owner);
        }
        for edge in set.edges {
            self.edges.entry(edge.source_id).or_default().push(edge);
        }
        for choice in set.choices {
            self.choices.entry(choice.artifact_id).or_default().push(choice);
        }
    }

    /// Edge targets of `id`, across every kind, in store order.
    pub fn targets(&self, id: i64) -> impl Iterator<Item = i64> + '_ {
        self.edges
            .get(&id)
            .into_iter()
            .flatten()
            .map(|edge| edge.target_id)
    }

    /// Builds views for `roots` with `depth` levels of nesting.
    pub fn materialize(
        &self,
        roots: &[i64],
        depth: u32,
    ) -> Result<Vec<Arc<ArtifactView>>, ResolveError> {
        let mut memo = Memo::new();
        roots
            .iter()
            .map(|id| self.view(*id, depth, &mut memo))
            .collect()
    }

    fn view(&self, id: i64, depth: u32, memo: &mut Memo) -> Result<Arc<ArtifactView>, ResolveError> {
        if let Some(view) = memo.get(&(id, depth)) {
            return Ok(Arc::clone(view));
        }

        let record = self
            .records
            .get(&id)
            .ok_or(ResolveError::MissingArtifact { id })?;

        let mut view = ArtifactView {
            guid: record.guid,
            artifact_type: record.artifact_type,
            artifacts: ReferenceField::default(),
            answers: ReferenceField::default(),
            content: record.content.clone(),
            test_cases: ReferenceField::default(),
            choices: self
                .choices
                .get(&id)
                .map(|choices| choices.iter().map(ChoiceView::from).collect())
                .unwrap_or_default(),
            in_line: record.in_line,
            boilerplate_code: record.boilerplate_code,
            programming_resources: ReferenceField::default(),
            topics: record.topics.clone(),
            creation_time: record.creation_time,
            creator: record.creator.clone(),
            title: record.title.clone(),
            deprecated: record.deprecated,
        };

        let edges = self.edges.get(&id).map(Vec::as_slice).unwrap_or_default();
        for policy in &REFERENCE_POLICIES {
            let mut selected: Vec<&ReferenceEdge> =
                edges.iter().filter(|edge| edge.kind == policy.kind).collect();
            if selected.is_empty() {
                continue;
            }
            if policy.ordering == EdgeOrdering::Ordered {
                // Stable sort keeps store order between equal keys.
                selected.sort_by_key(|edge| edge.order.unwrap_or(i32::MAX));
            }

            let field = if depth == 0 {
                ReferenceField::Leaf(selected.iter().map(|edge| edge.target_guid).collect())
            } else {
                let nested = selected
                    .iter()
                    .map(|edge| self.view(edge.target_id, depth - 1, memo))
                    .collect::<Result<Vec<_>, _>>()?;
                ReferenceField::Nested(nested)
            };
            *view.references_mut(policy.kind) = field;
        }

        let view = Arc::new(view);
        memo.insert((id, depth), Arc::clone(&view));
        Ok(view)
    }
}

/// Loads artifact graphs from the store and materializes them.
#[derive(Clone)]
pub struct ReferenceResolver {
    repo: Arc<dyn ArtifactsRepo>,
}

impl ReferenceResolver {
    pub fn new(repo: Arc<dyn ArtifactsRepo>) -> Self {
        Self { repo }
    }

    /// Resolves `roots` in the given order with `depth` levels of nesting.
    #[instrument(skip(self, roots), fields(roots = roots.len()))]
    pub async fn resolve(
        &self,
        roots: Vec<ArtifactRecord>,
        depth: u32,
    ) -> Result<Vec<Arc<ArtifactView>>, ResolveError> {
        let started = Instant::now();
        let root_ids: Vec<i64> = roots.iter().map(|record| record.id).collect();

        let mut graph = ArtifactGraph::new();
        for record in roots {
            graph.insert_record(record);
        }
        self.load(&mut graph, &root_ids, depth).await?;

        let views = graph.materialize(&root_ids, depth)?;
        histogram!(METRIC_RESOLVE_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        Ok(views)
    }

    /// Breadth-first load. Each level fetches only records and reference sets
    /// not already in the graph.
    async fn load(
        &self,
        graph: &mut ArtifactGraph,
        roots: &[i64],
        depth: u32,
    ) -> Result<(), ResolveError> {
        let mut best: HashMap<i64, u32> = HashMap::new();
        let mut frontier: Vec<(i64, u32)> = Vec::new();
        for id in roots {
            if best.insert(*id, depth).is_none() {
                frontier.push((*id, depth));
            }
        }

        let mut level = 0usize;
        while !frontier.is_empty() {
            let missing_records = unique(
                frontier
                    .iter()
                    .map(|(id, _)| *id)
                    .filter(|id| !graph.contains_record(*id)),
            );
            if !missing_records.is_empty() {
                for record in self.repo.find_by_ids(&missing_records).await? {
                    graph.insert_record(record);
                }
                if let Some(id) = missing_records.iter().find(|id| !graph.contains_record(**id)) {
                    return Err(ResolveError::MissingArtifact { id: *id });
                }
            }

            let missing_references = unique(
                frontier
                    .iter()
                    .map(|(id, _)| *id)
                    .filter(|id| !graph.has_references(*id)),
            );
            if !missing_references.is_empty() {
                let set = self.repo.load_references(&missing_references).await?;
                graph.insert_references(&missing_references, set);
            }

            debug!(
                level,
                frontier = frontier.len(),
                fetched_records = missing_records.len(),
                fetched_references = missing_references.len(),
                "resolved artifact level"
            );

            let mut next = Vec::new();
            for (id, remaining) in &frontier {
                if *remaining == 0 {
                    continue;
                }
                let child_depth = remaining - 1;
                for target in graph.targets(*id) {
                    let improves = best.get(&target).is_none_or(|known| *known < child_depth);
                    if improves {
                        best.insert(target, child_depth);
                        next.push((target, child_depth));
                    }
                }
            }
            frontier = next;
            level += 1;
        }

        Ok(())
    }
}

fn unique(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}
