//! Update-set listing and selection.

use fieldsync_core::{
  is_remote_id,
  model::{EntityKind, NewUpdateSet, UpdateSet},
  remote::RemoteClient,
  store::CacheStore,
};
use tracing::{debug, info};

use crate::{
  Error, Result,
  sync::Synchronizer,
  wire::{self, PickerEnvelope, PickerItem},
};

impl<S: CacheStore, R: RemoteClient> Synchronizer<S, R> {
  /// The update sets of the scope named `scope_name`.
  ///
  /// Served from the cache when any are cached for the scope. Otherwise the
  /// remote picker is fetched and every update set it lists is cached, the
  /// picker's current selection flagged as current.
  pub async fn list_or_fetch_update_sets(&self, scope_name: &str) -> Result<Vec<UpdateSet>> {
    let scope = self.resolve_scope_by_name(scope_name).await?;

    if self
      .store()
      .update_sets_cached_for(scope.id)
      .await
      .map_err(Error::store)?
    {
      debug!(scope = %scope_name, "update set cache hit");
      return self.store().list_update_sets(scope.id).await.map_err(Error::store);
    }

    debug!(scope = %scope_name, "update set cache miss");
    let url = self.endpoints().update_set_picker(&scope.remote_id)?;
    let body = self.remote().get(&url).await?;
    let picker = wire::decode::<PickerEnvelope>("update set picker", &body)?.result;

    let current = picker.current;
    let mut choices = vec![(current.clone(), true)];
    choices.extend(
      picker
        .update_sets
        .into_iter()
        .filter(|item| item.sys_id != current.sys_id)
        .map(|item| (item, false)),
    );

    for (item, is_current) in choices {
      let inserted = self
        .store()
        .insert_update_set(NewUpdateSet {
          remote_id: item.sys_id.clone(),
          name:      item.name,
          scope_id:  scope.id,
          is_current,
        })
        .await
        .map_err(Error::store)?;
      if !inserted {
        debug!(remote_id = %item.sys_id, "update set already cached");
      }
    }

    let update_sets = self
      .store()
      .list_update_sets(scope.id)
      .await
      .map_err(Error::store)?;
    info!(
      scope = %scope_name,
      count = update_sets.len(),
      current = %current.name,
      "cached update sets"
    );
    Ok(update_sets)
  }

  /// Make `update_set_remote_id` the current update set of the scope named
  /// `scope_name`, remotely and then in the cache.
  ///
  /// The scope must be known (cached or confirmed by the remote), the update
  /// set must already be cached and belong to it; nothing is sent otherwise.
  pub async fn set_update_set(
    &self,
    scope_name: &str,
    update_set_remote_id: &str,
  ) -> Result<UpdateSet> {
    if !is_remote_id(update_set_remote_id) {
      return Err(Error::InvalidId {
        kind: EntityKind::UpdateSet,
        id:   update_set_remote_id.to_owned(),
      });
    }

    let scope = self.resolve_scope_by_name(scope_name).await?;

    let update_set = self
      .store()
      .find_update_set(update_set_remote_id)
      .await
      .map_err(Error::store)?
      .filter(|u| u.scope_id == scope.id)
      .ok_or_else(|| {
        Error::not_found(
          EntityKind::UpdateSet,
          format!("{update_set_remote_id} in scope {scope_name}"),
        )
      })?;

    let body = serde_json::to_vec(&PickerItem {
      sys_id: update_set.remote_id.clone(),
      name:   update_set.name.clone(),
    })?;
    let url = self.endpoints().update_set_picker(&scope.remote_id)?;
    self.remote().put(&url, body).await?;

    if !self
      .store()
      .mark_current_update_set(scope.id, update_set.id)
      .await
      .map_err(Error::store)?
    {
      return Err(Error::not_found(EntityKind::UpdateSet, update_set_remote_id));
    }

    info!(scope = %scope_name, update_set = %update_set.name, "selected update set");
    Ok(UpdateSet { is_current: true, ..update_set })
  }

  /// Drop every cached update set so the next listing refetches.
  pub async fn truncate_update_sets(&self) -> Result<usize> {
    let removed = self
      .store()
      .truncate_update_sets()
      .await
      .map_err(Error::store)?;
    info!(removed, "truncated update sets");
    Ok(removed)
  }
}
