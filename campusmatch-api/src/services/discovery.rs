use std::collections::HashSet;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use campusmatch_shared::errors::AppResult;
use campusmatch_shared::types::pagination::{Cursor, CursorPage};

use crate::models::Profile;
use crate::schema::{likes, passes, profiles};

/// How many rows each index scan round-trip pulls. The predicate below
/// can reject most of a batch, so scanning continues batch by batch
/// until the page fills or the index runs out.
const SCAN_BATCH: i64 = 50;

/// Row-level predicate applied lazily during the candidate scan. Checks
/// run in order and short-circuit on the first failure.
pub struct CandidateFilter<'a> {
    viewer: &'a Profile,
    interacted: &'a HashSet<Uuid>,
}

impl<'a> CandidateFilter<'a> {
    pub fn new(viewer: &'a Profile, interacted: &'a HashSet<Uuid>) -> Self {
        Self { viewer, interacted }
    }

    pub fn accepts(&self, candidate: &Profile) -> bool {
        // Guards against data anomalies; distinct users should never collide
        if candidate.user_id == self.viewer.user_id {
            return false;
        }

        // The index only checked that the candidate wants the viewer's
        // gender; the viewer must want the candidate's gender too
        if candidate.gender != self.viewer.interested_in {
            return false;
        }

        if self.interacted.contains(&candidate.user_id) {
            return false;
        }

        if let Some(prefs) = candidate.preferred_years {
            if !prefs.allows(self.viewer.year) {
                return false;
            }
        }

        if let Some(prefs) = self.viewer.preferred_years {
            if !prefs.allows(candidate.year) {
                return false;
            }
        }

        true
    }
}

/// Every user the viewer has already liked or passed on. Loaded in full
/// once per call; exclusion must cover all history, not just a page.
pub fn interacted_set(conn: &mut PgConnection, user_id: Uuid) -> AppResult<HashSet<Uuid>> {
    let liked: Vec<Uuid> = likes::table
        .filter(likes::from_user_id.eq(user_id))
        .select(likes::to_user_id)
        .load(conn)?;

    let passed: Vec<Uuid> = passes::table
        .filter(passes::from_user_id.eq(user_id))
        .select(passes::to_user_id)
        .load(conn)?;

    Ok(liked.into_iter().chain(passed).collect())
}

/// One keyset batch of the coarse index scan: profiles that state a
/// preference for the viewer's gender and are complete and active,
/// newest first, strictly after the cursor position.
fn scan_batch(
    conn: &mut PgConnection,
    viewer: &Profile,
    after: Option<Cursor>,
) -> QueryResult<Vec<Profile>> {
    let mut query = profiles::table
        .filter(profiles::interested_in.eq(viewer.gender))
        .filter(profiles::profile_complete.eq(true))
        .filter(profiles::is_active.eq(true))
        .order((profiles::created_at.desc(), profiles::id.desc()))
        .limit(SCAN_BATCH)
        .into_boxed();

    if let Some(cursor) = after {
        query = query.filter(
            profiles::created_at.lt(cursor.ts).or(profiles::created_at
                .eq(cursor.ts)
                .and(profiles::id.lt(cursor.id))),
        );
    }

    query.load::<Profile>(conn)
}

/// Produce one page of swipeable candidates for the viewer. The cursor
/// tracks the scan position (not the accept position), so resuming never
/// revisits a row regardless of how many were rejected.
pub fn discover(
    conn: &mut PgConnection,
    viewer: &Profile,
    interacted: &HashSet<Uuid>,
    cursor: Option<Cursor>,
    page_size: i64,
) -> AppResult<CursorPage<Profile>> {
    let filter = CandidateFilter::new(viewer, interacted);
    let mut accepted: Vec<Profile> = Vec::with_capacity(page_size as usize);
    let mut position = cursor;

    loop {
        let batch = scan_batch(conn, viewer, position)?;
        let exhausted = (batch.len() as i64) < SCAN_BATCH;

        for candidate in batch {
            position = Some(Cursor {
                ts: candidate.created_at,
                id: candidate.id,
            });

            if filter.accepts(&candidate) {
                accepted.push(candidate);
                if accepted.len() as i64 == page_size {
                    return Ok(CursorPage::new(accepted, position, false));
                }
            }
        }

        if exhausted {
            return Ok(CursorPage::new(accepted, position, true));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    use crate::models::{ClassYear, Gender, PreferredYears};

    fn profile(
        gender: Gender,
        interested_in: Gender,
        year: ClassYear,
        preferred_years: Option<PreferredYears>,
    ) -> Profile {
        Profile {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            display_name: "Sam".to_string(),
            gender,
            interested_in,
            birth_date: NaiveDate::from_ymd_opt(2004, 6, 1).unwrap(),
            year,
            preferred_years,
            major: "Economics".to_string(),
            bio: Some("hi".to_string()),
            drinking: None,
            smoking: None,
            profile_complete: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn all_years() -> PreferredYears {
        PreferredYears {
            freshman: true,
            sophomore: true,
            junior: true,
            senior: true,
        }
    }

    #[test]
    fn mutually_compatible_pair_is_accepted_both_ways() {
        // junior with no year restriction, senior who accepts juniors
        let a = profile(Gender::Male, Gender::Female, ClassYear::Junior, None);
        let b = profile(
            Gender::Female,
            Gender::Male,
            ClassYear::Senior,
            Some(PreferredYears {
                freshman: false,
                sophomore: false,
                junior: true,
                senior: true,
            }),
        );

        let empty = HashSet::new();
        assert!(CandidateFilter::new(&a, &empty).accepts(&b));
        assert!(CandidateFilter::new(&b, &empty).accepts(&a));
    }

    #[test]
    fn rejects_self() {
        let me = profile(Gender::Male, Gender::Female, ClassYear::Junior, None);
        let mut twin = me.clone();
        twin.gender = Gender::Female;
        twin.interested_in = Gender::Male;

        let empty = HashSet::new();
        assert!(!CandidateFilter::new(&me, &empty).accepts(&twin));
    }

    #[test]
    fn rejects_gender_mismatch() {
        let me = profile(Gender::Male, Gender::Female, ClassYear::Junior, None);
        // candidate is open to males but is himself male; viewer wants female
        let candidate = profile(Gender::Male, Gender::Male, ClassYear::Junior, None);

        let empty = HashSet::new();
        assert!(!CandidateFilter::new(&me, &empty).accepts(&candidate));
    }

    #[test]
    fn rejects_already_interacted() {
        let me = profile(Gender::Male, Gender::Female, ClassYear::Junior, None);
        let candidate = profile(Gender::Female, Gender::Male, ClassYear::Junior, None);

        let mut interacted = HashSet::new();
        interacted.insert(candidate.user_id);

        assert!(!CandidateFilter::new(&me, &interacted).accepts(&candidate));
    }

    #[test]
    fn rejects_when_candidate_excludes_viewer_year() {
        let me = profile(Gender::Male, Gender::Female, ClassYear::Freshman, None);
        let candidate = profile(
            Gender::Female,
            Gender::Male,
            ClassYear::Junior,
            Some(PreferredYears {
                freshman: false,
                sophomore: true,
                junior: true,
                senior: true,
            }),
        );

        let empty = HashSet::new();
        assert!(!CandidateFilter::new(&me, &empty).accepts(&candidate));
    }

    #[test]
    fn rejects_when_viewer_excludes_candidate_year() {
        let me = profile(
            Gender::Male,
            Gender::Female,
            ClassYear::Senior,
            Some(PreferredYears {
                freshman: false,
                sophomore: false,
                junior: false,
                senior: true,
            }),
        );
        let candidate = profile(Gender::Female, Gender::Male, ClassYear::Freshman, None);

        let empty = HashSet::new();
        assert!(!CandidateFilter::new(&me, &empty).accepts(&candidate));
    }

    #[test]
    fn absent_preferences_mean_no_restriction() {
        let me = profile(Gender::Female, Gender::Male, ClassYear::Sophomore, None);
        let candidate = profile(Gender::Male, Gender::Female, ClassYear::Senior, None);

        let empty = HashSet::new();
        assert!(CandidateFilter::new(&me, &empty).accepts(&candidate));
    }

    #[test]
    fn full_preference_grid_accepts_every_year() {
        let me = profile(
            Gender::Male,
            Gender::Female,
            ClassYear::Junior,
            Some(all_years()),
        );

        for year in [
            ClassYear::Freshman,
            ClassYear::Sophomore,
            ClassYear::Junior,
            ClassYear::Senior,
        ] {
            let candidate = profile(Gender::Female, Gender::Male, year, Some(all_years()));
            let empty = HashSet::new();
            assert!(CandidateFilter::new(&me, &empty).accepts(&candidate));
        }
    }
}
