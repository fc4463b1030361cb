use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        ArtifactQueryFilter, ArtifactsRepo, ArtifactsWriteRepo, CreateArtifactParams, RepoError,
        non_blank,
    },
    domain::{
        entities::{ArtifactRecord, NavigationChoiceRecord, ReferenceEdge, ReferenceSet},
        references::{EdgeOrdering, REFERENCE_POLICIES, ReferencePolicy},
        types::ArtifactType,
    },
};

use super::{
    PostgresRepositories,
    util::{contains_pattern, map_sqlx_error},
};

const ARTIFACT_SELECT: &str = "SELECT a.id, a.guid, a.type AS artifact_type, a.content, \
     a.title, a.creator, a.creation_time, a.deprecated, a.in_line, \
     b.guid AS boilerplate_code, \
     ARRAY(SELECT t.topic FROM artifact_topics t WHERE t.artifact_id = a.id ORDER BY t.id) AS topics \
     FROM artifacts a \
     LEFT JOIN artifacts b ON b.id = a.boilerplate_code_id \
     WHERE 1=1 ";

#[derive(sqlx::FromRow)]
struct ArtifactRow {
    id: i64,
    guid: Uuid,
    artifact_type: ArtifactType,
    content: String,
    title: Option<String>,
    creator: Option<String>,
    creation_time: OffsetDateTime,
    deprecated: bool,
    in_line: bool,
    boilerplate_code: Option<Uuid>,
    topics: Vec<String>,
}

impl From<ArtifactRow> for ArtifactRecord {
    fn from(row: ArtifactRow) -> Self {
        Self {
            id: row.id,
            guid: row.guid,
            artifact_type: row.artifact_type,
            content: row.content,
            title: row.title,
            creator: row.creator,
            creation_time: row.creation_time,
            deprecated: row.deprecated,
            in_line: row.in_line,
            boilerplate_code: row.boilerplate_code,
            topics: row.topics,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EdgeRow {
    source_id: i64,
    target_id: i64,
    target_guid: Uuid,
    edge_order: Option<i32>,
}

#[derive(sqlx::FromRow)]
struct ChoiceRow {
    artifact_id: i64,
    choice: String,
    choice_order: i32,
    target_guid: Option<Uuid>,
}

fn edge_query(policy: &ReferencePolicy) -> String {
    let order = match policy.ordering {
        EdgeOrdering::Ordered => "e.\"order\"",
        EdgeOrdering::StoreOrder => "NULL::integer",
    };
    format!(
        "SELECT e.artifact_id AS source_id, e.{column} AS target_id, t.guid AS target_guid, \
         {order} AS edge_order \
         FROM {table} e \
         INNER JOIN artifacts t ON t.id = e.{column} \
         WHERE e.artifact_id = ANY($1) \
         ORDER BY e.id",
        column = policy.target_column,
        table = policy.table,
    )
}

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q ArtifactQueryFilter) {
    if let Some(kind) = filter.artifact_type {
        qb.push(" AND a.type = ");
        qb.push_bind(kind);
    }

    if let Some(creator) = non_blank(filter.creator.as_deref()) {
        qb.push(" AND a.creator = ");
        qb.push_bind(creator);
    }

    if let Some(title) = non_blank(filter.title.as_deref()) {
        qb.push(" AND a.title ILIKE ");
        qb.push_bind(contains_pattern(title));
    }

    if let Some(topic) = non_blank(filter.topic.as_deref()) {
        qb.push(
            " AND EXISTS (SELECT 1 FROM artifact_topics t WHERE t.artifact_id = a.id AND t.topic = ",
        );
        qb.push_bind(topic);
        qb.push(")");
    }

    if let Some(search) = non_blank(filter.search.as_deref()) {
        let pattern = contains_pattern(search);
        qb.push(" AND (a.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR a.content ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    if let Some(in_line) = filter.in_line {
        qb.push(" AND a.in_line = ");
        qb.push_bind(in_line);
    }
}

#[async_trait]
impl ArtifactsRepo for PostgresRepositories {
    async fn find_by_guid(&self, guid: Uuid) -> Result<Option<ArtifactRecord>, RepoError> {
        let mut qb = QueryBuilder::new(ARTIFACT_SELECT);
        qb.push(" AND a.guid = ");
        qb.push_bind(guid);

        let row = qb
            .build_query_as::<ArtifactRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ArtifactRecord::from))
    }

    async fn list_artifacts(
        &self,
        filter: &ArtifactQueryFilter,
    ) -> Result<Vec<ArtifactRecord>, RepoError> {
        let mut qb = QueryBuilder::new(ARTIFACT_SELECT);
        apply_filter(&mut qb, filter);
        qb.push(" ORDER BY a.id ASC");

        let rows = qb
            .build_query_as::<ArtifactRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArtifactRecord::from).collect())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<ArtifactRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::new(ARTIFACT_SELECT);
        qb.push(" AND a.id = ANY(");
        qb.push_bind(ids.to_vec());
        qb.push(") ORDER BY a.id ASC");

        let rows = qb
            .build_query_as::<ArtifactRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArtifactRecord::from).collect())
    }

    async fn load_references(&self, ids: &[i64]) -> Result<ReferenceSet, RepoError> {
        let mut set = ReferenceSet::default();
        if ids.is_empty() {
            return Ok(set);
        }

        for policy in &REFERENCE_POLICIES {
            let sql = edge_query(policy);
            let rows = sqlx::query_as::<_, EdgeRow>(&sql)
                .bind(ids)
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;

            set.edges.extend(rows.into_iter().map(|row| ReferenceEdge {
                kind: policy.kind,
                source_id: row.source_id,
                target_id: row.target_id,
                target_guid: row.target_guid,
                order: row.edge_order,
            }));
        }

        let choices = sqlx::query_as::<_, ChoiceRow>(
            "SELECT n.artifact_id, n.choice, n.\"order\" AS choice_order, t.guid AS target_guid \
             FROM artifact_navigations n \
             LEFT JOIN artifacts t ON t.id = n.navigation_id \
             WHERE n.artifact_id = ANY($1) \
             ORDER BY n.id",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        set.choices = choices
            .into_iter()
            .map(|row| NavigationChoiceRecord {
                artifact_id: row.artifact_id,
                choice: row.choice,
                order: row.choice_order,
                target_guid: row.target_guid,
            })
            .collect();

        Ok(set)
    }

    async fn find_ids_by_guids(&self, guids: &[Uuid]) -> Result<HashMap<Uuid, i64>, RepoError> {
        if guids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT guid, id FROM artifacts WHERE guid = ANY($1)",
        )
        .bind(guids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl ArtifactsWriteRepo for PostgresRepositories {
    async fn create_artifact(
        &self,
        params: CreateArtifactParams,
    ) -> Result<ArtifactRecord, RepoError> {
        let CreateArtifactParams {
            guid,
            artifact_type,
            content,
            title,
            creator,
            in_line,
            boilerplate_code,
            edges,
            choices,
            topics,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO artifacts (guid, type, content, title, creator, in_line, boilerplate_code_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(guid)
        .bind(artifact_type)
        .bind(content)
        .bind(title)
        .bind(creator)
        .bind(in_line)
        .bind(boilerplate_code.map(|reference| reference.id))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for policy in &REFERENCE_POLICIES {
            let selected: Vec<_> = edges.iter().filter(|edge| edge.kind == policy.kind).collect();
            if selected.is_empty() {
                continue;
            }

            let ordered = policy.ordering == EdgeOrdering::Ordered;
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
                "INSERT INTO {} (artifact_id, {}{}) ",
                policy.table,
                policy.target_column,
                if ordered { ", \"order\"" } else { "" },
            ));
            qb.push_values(selected, |mut row, edge| {
                row.push_bind(id).push_bind(edge.target.id);
                if ordered {
                    row.push_bind(edge.order.unwrap_or_default());
                }
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        if !choices.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO artifact_navigations (artifact_id, choice, \"order\", navigation_id) ",
            );
            qb.push_values(choices, |mut row, choice| {
                row.push_bind(id)
                    .push_bind(choice.choice)
                    .push_bind(choice.order)
                    .push_bind(choice.target.map(|reference| reference.id));
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        if !topics.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> =
                QueryBuilder::new("INSERT INTO artifact_topics (artifact_id, topic) ");
            qb.push_values(topics, |mut row, topic| {
                row.push_bind(id).push_bind(topic);
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        let mut qb = QueryBuilder::new(ARTIFACT_SELECT);
        qb.push(" AND a.id = ");
        qb.push_bind(id);
        let row = qb
            .build_query_as::<ArtifactRow>()
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(ArtifactRecord::from(row))
    }
}
