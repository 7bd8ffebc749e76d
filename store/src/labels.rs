//! Label manager.

use crate::{ChangeEvent, EntityStore, RequestContext, StoreError, StoreResult};
use std::collections::BTreeSet;
use strata_authz::Privilege;
use strata_core::messages::{ERR_GUID_EMPTY, ERR_LABELS_EMPTY};
use strata_core::{ErrorCode, Guid};
use strata_graph::GraphStore;

impl<G: GraphStore + Send> EntityStore<G> {
    /// Replace the labels of an entity. Each added label is checked with
    /// add-label access, each removed one with remove-label access. An empty
    /// set removes every label.
    pub fn set_labels(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
        labels: BTreeSet<String>,
    ) -> StoreResult<()> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_EMPTY));
        }
        self.run(ctx, "setLabels", vec![guid.clone()], |tx, ctx| {
            let vertex = tx
                .find_by_guid(guid)
                .ok_or_else(|| StoreError::guid_not_found(guid))?;
            self.validate_labels(&labels)?;

            let added: BTreeSet<String> = labels.difference(&vertex.labels).cloned().collect();
            let removed: BTreeSet<String> = vertex.labels.difference(&labels).cloned().collect();

            let header = vertex.header();
            let gate = self.gate(ctx.caller());
            for label in &added {
                gate.verify_label(Privilege::EntityAddLabel, &header, label)?;
            }
            for label in &removed {
                gate.verify_label(Privilege::EntityRemoveLabel, &header, label)?;
            }

            if added.is_empty() && removed.is_empty() {
                return Ok(());
            }
            let vertex = self.mapper.set_labels(tx, guid, labels, ctx.user())?;
            if !added.is_empty() {
                ctx.queue_event(ChangeEvent::LabelsAdded {
                    entity: vertex.header(),
                    labels: added,
                });
            }
            if !removed.is_empty() {
                ctx.queue_event(ChangeEvent::LabelsDeleted {
                    entity: vertex.header(),
                    labels: removed,
                });
            }
            Ok(())
        })
    }

    pub fn add_labels(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
        labels: BTreeSet<String>,
    ) -> StoreResult<()> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_EMPTY));
        }
        if labels.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_LABELS_EMPTY));
        }
        self.run(ctx, "addLabels", vec![guid.clone()], |tx, ctx| {
            let header = tx
                .find_by_guid(guid)
                .ok_or_else(|| StoreError::guid_not_found(guid))?
                .header();
            let gate = self.gate(ctx.caller());
            for label in &labels {
                gate.verify_label(Privilege::EntityAddLabel, &header, label)?;
            }
            self.validate_labels(&labels)?;

            let vertex = self.mapper.add_labels(tx, guid, &labels, ctx.user())?;
            ctx.queue_event(ChangeEvent::LabelsAdded {
                entity: vertex.header(),
                labels,
            });
            Ok(())
        })
    }

    pub fn remove_labels(
        &self,
        ctx: &mut RequestContext,
        guid: &Guid,
        labels: BTreeSet<String>,
    ) -> StoreResult<()> {
        if guid.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_GUID_EMPTY));
        }
        if labels.is_empty() {
            return Err(StoreError::invalid_parameters(ERR_LABELS_EMPTY));
        }
        self.run(ctx, "removeLabels", vec![guid.clone()], |tx, ctx| {
            let header = tx
                .find_by_guid(guid)
                .ok_or_else(|| StoreError::guid_not_found(guid))?
                .header();
            let gate = self.gate(ctx.caller());
            for label in &labels {
                gate.verify_label(Privilege::EntityRemoveLabel, &header, label)?;
            }
            self.validate_labels(&labels)?;

            let vertex = self.mapper.remove_labels(tx, guid, &labels, ctx.user())?;
            ctx.queue_event(ChangeEvent::LabelsDeleted {
                entity: vertex.header(),
                labels,
            });
            Ok(())
        })
    }

    /// Check every label against the configured length and pattern.
    pub(crate) fn validate_labels(&self, labels: &BTreeSet<String>) -> StoreResult<()> {
        let max = self.config.label_max_length;
        let mut messages = Vec::new();
        for label in labels {
            if label.chars().count() > max {
                messages.push(format!(
                    "label {} exceeds maximum length of {} characters",
                    label, max
                ));
            } else if !self.label_regex.is_match(label) {
                messages.push(format!(
                    "invalid label {}: only alphanumeric characters, '_' and '-' are allowed",
                    label
                ));
            }
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(StoreError::with_messages(ErrorCode::InvalidLabel, messages))
        }
    }
}
