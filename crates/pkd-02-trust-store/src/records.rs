//! # Trust Records
//!
//! Lookups run over any [`StoreView`], so the same code reads committed
//! state and the write-set of an open [`LeafTransaction`]. Every mutation
//! takes the transaction plus the leaf that authorizes it, and cites that
//! leaf in the record it touches.

use crate::domain::errors::TrustStoreError;
use crate::domain::keys::{new_key_id, KeyPrefix};
use pkd_01_merkle_log::{read_record, scan_records, LeafTransaction, StoreView};
use pkd_crypto::Totp;
use pkd_types::{
    actor_domain, Actor, AuxDataRecord, KeyRecord, MerkleLeaf, PublicKey, SecondFactor, Timestamp,
};

type Result<T> = std::result::Result<T, TrustStoreError>;

// =============================================================================
// READS
// =============================================================================

/// Actor row, if any.
pub fn actor<V: StoreView + ?Sized>(view: &V, url: &str) -> Result<Option<Actor>> {
    Ok(read_record(view, &KeyPrefix::actor_key(url))?)
}

/// Actor row, or `ActorNotFound`.
pub fn require_actor<V: StoreView + ?Sized>(view: &V, url: &str) -> Result<Actor> {
    actor(view, url)?.ok_or_else(|| TrustStoreError::ActorNotFound {
        actor: url.to_string(),
    })
}

/// Actor row that may still act: present and not moved.
pub fn require_active_actor<V: StoreView + ?Sized>(view: &V, url: &str) -> Result<Actor> {
    let actor = require_actor(view, url)?;
    if let Some(moved_to) = &actor.moved_to {
        return Err(TrustStoreError::ActorMoved {
            actor: actor.url.clone(),
            moved_to: moved_to.clone(),
        });
    }
    Ok(actor)
}

/// Every key row of `actor`, trusted or not, in key-id order.
pub fn keys<V: StoreView + ?Sized>(view: &V, actor: &str) -> Result<Vec<KeyRecord>> {
    Ok(scan_records(view, &KeyPrefix::actor_keys_prefix(actor))?)
}

/// Currently-trusted keys of `actor`, in key-id order.
pub fn trusted_keys<V: StoreView + ?Sized>(view: &V, actor: &str) -> Result<Vec<KeyRecord>> {
    Ok(keys(view, actor)?.into_iter().filter(|k| k.trusted).collect())
}

/// Every aux row of `actor`.
pub fn aux_data<V: StoreView + ?Sized>(view: &V, actor: &str) -> Result<Vec<AuxDataRecord>> {
    Ok(scan_records(view, &KeyPrefix::actor_aux_prefix(actor))?)
}

/// Second-factor enrollment for `domain`.
pub fn second_factor<V: StoreView + ?Sized>(
    view: &V,
    domain: &str,
) -> Result<Option<SecondFactor>> {
    Ok(read_record(view, &KeyPrefix::second_factor_key(domain))?)
}

// =============================================================================
// KEY LIFECYCLE
// =============================================================================

/// Bind `public_key` to `actor_url`, creating the actor on first use.
pub fn add_key(
    tx: &mut LeafTransaction<'_>,
    actor_url: &str,
    public_key: &PublicKey,
    leaf: &MerkleLeaf,
) -> Result<KeyRecord> {
    match actor(&*tx, actor_url)? {
        Some(existing) => {
            if let Some(moved_to) = existing.moved_to {
                return Err(TrustStoreError::ActorMoved {
                    actor: existing.url,
                    moved_to,
                });
            }
            if trusted_keys(&*tx, actor_url)?
                .iter()
                .any(|k| &k.public_key == public_key)
            {
                return Err(TrustStoreError::DuplicateKey {
                    actor: actor_url.to_string(),
                });
            }
        }
        None => {
            let created = Actor {
                url: actor_url.to_string(),
                fireproof: false,
                created_leaf: leaf.id,
                moved_leaf: None,
                moved_to: None,
            };
            tx.put_record(KeyPrefix::actor_key(actor_url), &created)?;
            tracing::debug!(actor = actor_url, leaf_id = leaf.id, "[pkd-02] actor created");
        }
    }

    let record = KeyRecord {
        key_id: new_key_id(),
        actor: actor_url.to_string(),
        public_key: *public_key,
        trusted: true,
        insert_leaf: leaf.id,
        revoke_leaf: None,
    };
    tx.put_record(KeyPrefix::key_record_key(actor_url, &record.key_id), &record)?;
    Ok(record)
}

fn revoke(
    tx: &mut LeafTransaction<'_>,
    mut record: KeyRecord,
    leaf: &MerkleLeaf,
) -> Result<KeyRecord> {
    record.trusted = false;
    record.revoke_leaf = Some(leaf.id);
    tx.put_record(
        KeyPrefix::key_record_key(&record.actor, &record.key_id),
        &record,
    )?;
    Ok(record)
}

/// Revoke the trusted key of `actor_url` whose public key is `public_key`.
pub fn revoke_key(
    tx: &mut LeafTransaction<'_>,
    actor_url: &str,
    public_key: &PublicKey,
    leaf: &MerkleLeaf,
) -> Result<KeyRecord> {
    require_active_actor(&*tx, actor_url)?;
    let matching: Vec<KeyRecord> = keys(&*tx, actor_url)?
        .into_iter()
        .filter(|k| &k.public_key == public_key)
        .collect();

    let trusted = matching.iter().find(|k| k.trusted).cloned();
    match trusted {
        Some(record) => revoke(tx, record, leaf),
        None => match matching.into_iter().next() {
            Some(revoked) => Err(TrustStoreError::KeyAlreadyRevoked {
                key_id: revoked.key_id,
            }),
            None => Err(TrustStoreError::KeyNotFound {
                actor: actor_url.to_string(),
            }),
        },
    }
}

/// Revoke every trusted key, across all actors, whose public key matches.
pub fn revoke_keys_matching(
    tx: &mut LeafTransaction<'_>,
    public_key: &PublicKey,
    leaf: &MerkleLeaf,
) -> Result<Vec<KeyRecord>> {
    let matching: Vec<KeyRecord> = scan_records::<KeyRecord, _>(&*tx, KeyPrefix::Key.as_bytes())?
        .into_iter()
        .filter(|k| k.trusted && &k.public_key == public_key)
        .collect();
    if matching.is_empty() {
        return Err(TrustStoreError::NoMatchingKey);
    }
    matching
        .into_iter()
        .map(|record| revoke(tx, record, leaf))
        .collect()
}

/// Revoke every trusted key of `target` unless it is fireproof.
pub fn burn_down(
    tx: &mut LeafTransaction<'_>,
    target: &str,
    leaf: &MerkleLeaf,
) -> Result<Vec<KeyRecord>> {
    let actor = require_active_actor(&*tx, target)?;
    if actor.fireproof {
        return Err(TrustStoreError::FireproofConflict {
            actor: target.to_string(),
        });
    }
    let revoked = trusted_keys(&*tx, target)?
        .into_iter()
        .map(|record| revoke(tx, record, leaf))
        .collect::<Result<Vec<_>>>()?;
    tracing::warn!(
        actor = target,
        revoked = revoked.len(),
        leaf_id = leaf.id,
        "[pkd-02] burn down"
    );
    Ok(revoked)
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Re-parent the trusted keys of `old_url` onto `new_url` and mark the old
/// actor moved. Revoked keys stay with the old actor as history.
pub fn move_identity(
    tx: &mut LeafTransaction<'_>,
    old_url: &str,
    new_url: &str,
    leaf: &MerkleLeaf,
) -> Result<Vec<KeyRecord>> {
    if old_url == new_url {
        return Err(TrustStoreError::MoveToSelf {
            actor: old_url.to_string(),
        });
    }
    let mut old = require_active_actor(&*tx, old_url)?;

    if !keys(&*tx, new_url)?.is_empty() {
        return Err(TrustStoreError::MoveTargetHasKeys {
            actor: new_url.to_string(),
        });
    }
    let new_actor = match actor(&*tx, new_url)? {
        Some(Actor {
            url,
            moved_to: Some(moved_to),
            ..
        }) => return Err(TrustStoreError::ActorMoved { actor: url, moved_to }),
        Some(mut existing) => {
            existing.fireproof = existing.fireproof || old.fireproof;
            existing
        }
        None => Actor {
            url: new_url.to_string(),
            fireproof: old.fireproof,
            created_leaf: leaf.id,
            moved_leaf: None,
            moved_to: None,
        },
    };
    tx.put_record(KeyPrefix::actor_key(new_url), &new_actor)?;

    let mut moved = Vec::new();
    for mut record in trusted_keys(&*tx, old_url)? {
        tx.delete(KeyPrefix::key_record_key(old_url, &record.key_id));
        record.actor = new_url.to_string();
        tx.put_record(KeyPrefix::key_record_key(new_url, &record.key_id), &record)?;
        moved.push(record);
    }

    old.moved_leaf = Some(leaf.id);
    old.moved_to = Some(new_url.to_string());
    tx.put_record(KeyPrefix::actor_key(old_url), &old)?;

    tracing::info!(
        from = old_url,
        to = new_url,
        keys = moved.len(),
        "[pkd-02] identity moved"
    );
    Ok(moved)
}

/// Set or clear the fireproof flag.
pub fn set_fireproof(
    tx: &mut LeafTransaction<'_>,
    actor_url: &str,
    fireproof: bool,
) -> Result<Actor> {
    let mut actor = require_active_actor(&*tx, actor_url)?;
    match (actor.fireproof, fireproof) {
        (true, true) => Err(TrustStoreError::AlreadyFireproof {
            actor: actor_url.to_string(),
        }),
        (false, false) => Err(TrustStoreError::NotFireproof {
            actor: actor_url.to_string(),
        }),
        _ => {
            actor.fireproof = fireproof;
            tx.put_record(KeyPrefix::actor_key(actor_url), &actor)?;
            Ok(actor)
        }
    }
}

// =============================================================================
// AUX DATA
// =============================================================================

/// Attach aux data to an existing actor.
pub fn add_aux_data(
    tx: &mut LeafTransaction<'_>,
    actor_url: &str,
    aux_type: &str,
    aux_data: &str,
    leaf: &MerkleLeaf,
) -> Result<AuxDataRecord> {
    require_active_actor(&*tx, actor_url)?;
    let aux_id = AuxDataRecord::compute_id(aux_type, aux_data);
    let key = KeyPrefix::aux_record_key(actor_url, &aux_id);

    if let Some(existing) = read_record::<AuxDataRecord, _>(&*tx, &key)? {
        if existing.trusted {
            return Err(TrustStoreError::DuplicateAuxData {
                actor: actor_url.to_string(),
                aux_id,
            });
        }
    }

    let record = AuxDataRecord {
        aux_id,
        actor: actor_url.to_string(),
        aux_type: aux_type.to_string(),
        aux_data: aux_data.to_string(),
        trusted: true,
        insert_leaf: leaf.id,
        revoke_leaf: None,
    };
    tx.put_record(key, &record)?;
    Ok(record)
}

/// Revoke aux data by id.
pub fn revoke_aux_data(
    tx: &mut LeafTransaction<'_>,
    actor_url: &str,
    aux_id: &str,
    leaf: &MerkleLeaf,
) -> Result<AuxDataRecord> {
    require_active_actor(&*tx, actor_url)?;
    let key = KeyPrefix::aux_record_key(actor_url, aux_id);
    let mut record = read_record::<AuxDataRecord, _>(&*tx, &key)?.ok_or_else(|| {
        TrustStoreError::AuxDataNotFound {
            actor: actor_url.to_string(),
            aux_id: aux_id.to_string(),
        }
    })?;
    if !record.trusted {
        return Err(TrustStoreError::AuxDataAlreadyRevoked {
            aux_id: aux_id.to_string(),
        });
    }
    record.trusted = false;
    record.revoke_leaf = Some(leaf.id);
    tx.put_record(key, &record)?;
    Ok(record)
}

// =============================================================================
// SECOND FACTOR
// =============================================================================

/// Check a one-time code for the domain of `actor_url`.
///
/// Returns `Ok(None)` when the domain has no enrollment. Otherwise the code
/// must match a time-step strictly later than the last one accepted; that
/// step becomes the new high-water mark.
pub fn consume_second_factor(
    tx: &mut LeafTransaction<'_>,
    actor_url: &str,
    otp: Option<&str>,
    now: Timestamp,
) -> Result<Option<u64>> {
    let domain = actor_domain(actor_url);
    let Some(mut enrollment) = second_factor(&*tx, &domain)? else {
        return Ok(None);
    };
    let invalid = || TrustStoreError::SecondFactorInvalid {
        domain: domain.clone(),
    };

    let code = otp.ok_or_else(invalid)?;
    let step = Totp::new(enrollment.secret.clone())
        .verify(code, now)
        .ok_or_else(invalid)?;

    if step <= enrollment.last_time_step {
        return Err(TrustStoreError::SecondFactorReused {
            domain,
            step,
            last: enrollment.last_time_step,
        });
    }

    enrollment.last_time_step = step;
    tx.put_record(KeyPrefix::second_factor_key(&enrollment.domain), &enrollment)?;
    Ok(Some(step))
}
