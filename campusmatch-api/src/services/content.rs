use std::collections::{HashMap, HashSet};

use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use campusmatch_shared::clients::storage::StorageClient;
use campusmatch_shared::errors::{AppError, AppResult, ErrorCode};

use crate::constants::{MIN_PHOTOS, REQUIRED_PROMPTS};
use crate::models::{ContentType, LikedContent, Photo, PhotoView, Profile, PromptAnswer};
use crate::schema::{profile_photos, profile_prompts, profiles};

/// Non-deleted photos for a profile, display order, keys resolved to URLs.
pub fn visible_photos(
    conn: &mut PgConnection,
    storage: &StorageClient,
    profile_id: Uuid,
) -> AppResult<Vec<PhotoView>> {
    let photos: Vec<Photo> = profile_photos::table
        .filter(profile_photos::profile_id.eq(profile_id))
        .filter(profile_photos::deleted_at.is_null())
        .order(profile_photos::order_index.asc())
        .load(conn)?;

    Ok(photos.into_iter().map(|p| photo_view(storage, &p)).collect())
}

/// Non-deleted prompt answers for a profile, display order.
pub fn visible_prompts(conn: &mut PgConnection, profile_id: Uuid) -> AppResult<Vec<PromptAnswer>> {
    let prompts = profile_prompts::table
        .filter(profile_prompts::profile_id.eq(profile_id))
        .filter(profile_prompts::deleted_at.is_null())
        .order(profile_prompts::order_index.asc())
        .load(conn)?;

    Ok(prompts)
}

pub fn profile_content(
    conn: &mut PgConnection,
    storage: &StorageClient,
    profile_id: Uuid,
) -> AppResult<(Vec<PhotoView>, Vec<PromptAnswer>)> {
    let photos = visible_photos(conn, storage, profile_id)?;
    let prompts = visible_prompts(conn, profile_id)?;
    Ok((photos, prompts))
}

pub fn photo_view(storage: &StorageClient, photo: &Photo) -> PhotoView {
    PhotoView {
        photo_id: photo.photo_id.clone(),
        order_index: photo.order_index,
        url: storage.url_for(&photo.object_key),
    }
}

/// Resolve the content a like points at. Soft-deleted rows are still
/// returned here; tombstoned content stays visible in conversation
/// history.
pub fn liked_content(
    conn: &mut PgConnection,
    storage: &StorageClient,
    content_type: ContentType,
    content_reference: &str,
) -> AppResult<Option<LikedContent>> {
    match content_type {
        ContentType::Photo => {
            let photo: Option<Photo> = profile_photos::table
                .filter(profile_photos::photo_id.eq(content_reference))
                .first(conn)
                .optional()?;

            Ok(photo.map(|p| LikedContent::Photo(photo_view(storage, &p))))
        }
        ContentType::Prompt => {
            let prompt: Option<PromptAnswer> = profile_prompts::table
                .filter(profile_prompts::prompt_answer_id.eq(content_reference))
                .first(conn)
                .optional()?;

            Ok(prompt.map(|p| LikedContent::Prompt {
                prompt_id: p.prompt_id,
                answer: p.answer,
            }))
        }
    }
}

/// Validate a client-supplied reorder against the current non-deleted
/// set. The ids must cover exactly that set, each appearing once; the
/// items come back in the requested order, ready for index assignment.
/// Any deviation (duplicate, unknown id, wrong count, over the limit)
/// rejects the whole request.
pub fn reorder_permutation<'a, T>(
    ids: &[String],
    items: &'a [T],
    id_of: impl Fn(&T) -> &str,
    max: usize,
) -> AppResult<Vec<&'a T>> {
    if ids.len() > max {
        return Err(AppError::new(
            ErrorCode::InvalidReorder,
            "too many items provided",
        ));
    }

    if ids.len() != items.len() {
        return Err(AppError::new(
            ErrorCode::InvalidReorder,
            format!(
                "must provide all {} non-deleted items for reordering",
                items.len()
            ),
        ));
    }

    let by_id: HashMap<&str, &T> = items.iter().map(|i| (id_of(i), i)).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut ordered: Vec<&T> = Vec::with_capacity(ids.len());

    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(AppError::new(
                ErrorCode::InvalidReorder,
                format!("{id} provided more than once"),
            ));
        }
        let item = by_id.get(id.as_str()).ok_or_else(|| {
            AppError::new(ErrorCode::InvalidReorder, format!("{id} not found"))
        })?;
        ordered.push(*item);
    }

    Ok(ordered)
}

/// Re-derive the completeness flag after a profile or content mutation.
/// Only ever upgrades false to true.
pub fn refresh_profile_complete(conn: &mut PgConnection, profile: &Profile) -> AppResult<()> {
    if profile.profile_complete {
        return Ok(());
    }

    let photo_count: i64 = profile_photos::table
        .filter(profile_photos::profile_id.eq(profile.id))
        .filter(profile_photos::deleted_at.is_null())
        .count()
        .get_result(conn)?;

    let prompt_count: i64 = profile_prompts::table
        .filter(profile_prompts::profile_id.eq(profile.id))
        .filter(profile_prompts::deleted_at.is_null())
        .count()
        .get_result(conn)?;

    let has_required_fields = !profile.display_name.is_empty()
        && profile.bio.as_deref().is_some_and(|b| !b.is_empty())
        && !profile.major.is_empty();

    if photo_count >= MIN_PHOTOS && prompt_count >= REQUIRED_PROMPTS && has_required_fields {
        diesel::update(profiles::table.find(profile.id))
            .set(profiles::profile_complete.eq(true))
            .execute(conn)?;

        tracing::info!(profile_id = %profile.id, "profile marked complete");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item(&'static str);

    fn items() -> Vec<Item> {
        vec![Item("a"), Item("b"), Item("c")]
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn assert_invalid(result: AppResult<Vec<&Item>>) {
        match result {
            Err(AppError::Known { code, .. }) => assert_eq!(code, ErrorCode::InvalidReorder),
            other => panic!("expected InvalidReorder, got {other:?}"),
        }
    }

    #[test]
    fn permutation_returns_items_in_requested_order() {
        let items = items();
        let ordered = reorder_permutation(&ids(&["c", "a", "b"]), &items, |i| i.0, 6).unwrap();

        let names: Vec<&str> = ordered.iter().map(|i| i.0).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let items = items();
        assert_invalid(reorder_permutation(&ids(&["a", "a", "b"]), &items, |i| i.0, 6));
    }

    #[test]
    fn unknown_id_is_rejected() {
        // covers ids belonging to another profile; they are simply not
        // in the caller's set
        let items = items();
        assert_invalid(reorder_permutation(&ids(&["a", "b", "z"]), &items, |i| i.0, 6));
    }

    #[test]
    fn partial_cover_is_rejected() {
        let items = items();
        assert_invalid(reorder_permutation(&ids(&["a", "b"]), &items, |i| i.0, 6));
    }

    #[test]
    fn over_limit_is_rejected() {
        let items = items();
        assert_invalid(reorder_permutation(&ids(&["a", "b", "c"]), &items, |i| i.0, 2));
    }

    #[test]
    fn empty_set_reorders_to_empty() {
        let items: Vec<Item> = Vec::new();
        let ordered = reorder_permutation(&[], &items, |i| i.0, 6).unwrap();
        assert!(ordered.is_empty());
    }
}
