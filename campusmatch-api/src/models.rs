use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::{Jsonb, Text};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{
    conversation_reads, likes, matches, messages, passes, profile_photos, profile_prompts,
    profiles, push_subscriptions,
};

// --- Enums (text-backed) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl ToSql<Text, Pg> for Gender {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Gender {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        match value.as_bytes() {
            b"male" => Ok(Gender::Male),
            b"female" => Ok(Gender::Female),
            other => Err(format!("unrecognized gender: {}", String::from_utf8_lossy(other)).into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ClassYear {
    Freshman,
    Sophomore,
    Junior,
    Senior,
}

impl ClassYear {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassYear::Freshman => "freshman",
            ClassYear::Sophomore => "sophomore",
            ClassYear::Junior => "junior",
            ClassYear::Senior => "senior",
        }
    }
}

impl ToSql<Text, Pg> for ClassYear {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for ClassYear {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        match value.as_bytes() {
            b"freshman" => Ok(ClassYear::Freshman),
            b"sophomore" => Ok(ClassYear::Sophomore),
            b"junior" => Ok(ClassYear::Junior),
            b"senior" => Ok(ClassYear::Senior),
            other => Err(format!("unrecognized year: {}", String::from_utf8_lossy(other)).into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Photo,
    Prompt,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Photo => "photo",
            ContentType::Prompt => "prompt",
        }
    }
}

impl ToSql<Text, Pg> for ContentType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for ContentType {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        match value.as_bytes() {
            b"photo" => Ok(ContentType::Photo),
            b"prompt" => Ok(ContentType::Prompt),
            other => {
                Err(format!("unrecognized content type: {}", String::from_utf8_lossy(other)).into())
            }
        }
    }
}

/// Which class years a user accepts in candidates. Absent means no
/// restriction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Jsonb)]
pub struct PreferredYears {
    pub freshman: bool,
    pub sophomore: bool,
    pub junior: bool,
    pub senior: bool,
}

impl PreferredYears {
    pub fn allows(&self, year: ClassYear) -> bool {
        match year {
            ClassYear::Freshman => self.freshman,
            ClassYear::Sophomore => self.sophomore,
            ClassYear::Junior => self.junior,
            ClassYear::Senior => self.senior,
        }
    }
}

impl FromSql<Jsonb, Pg> for PreferredYears {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        let json = <serde_json::Value as FromSql<Jsonb, Pg>>::from_sql(value)?;
        Ok(serde_json::from_value(json)?)
    }
}

impl ToSql<Jsonb, Pg> for PreferredYears {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        // jsonb wire format: version byte then the document
        out.write_all(&[1])?;
        out.write_all(&serde_json::to_vec(self)?)?;
        Ok(IsNull::No)
    }
}

// --- Profile ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub gender: Gender,
    pub interested_in: Gender,
    pub birth_date: NaiveDate,
    pub year: ClassYear,
    pub preferred_years: Option<PreferredYears>,
    pub major: String,
    pub bio: Option<String>,
    pub drinking: Option<String>,
    pub smoking: Option<String>,
    pub profile_complete: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub display_name: String,
    pub gender: Gender,
    pub interested_in: Gender,
    pub birth_date: NaiveDate,
    pub year: ClassYear,
    pub preferred_years: Option<PreferredYears>,
    pub major: String,
    pub profile_complete: bool,
    pub is_active: bool,
}

#[derive(Debug, AsChangeset, Deserialize, Default)]
#[diesel(table_name = profiles)]
pub struct UpdateProfile {
    pub display_name: Option<String>,
    pub gender: Option<Gender>,
    pub interested_in: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub year: Option<ClassYear>,
    pub preferred_years: Option<PreferredYears>,
    pub major: Option<String>,
    pub bio: Option<String>,
    pub drinking: Option<String>,
    pub smoking: Option<String>,
}

// --- Photo ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profile_photos)]
pub struct Photo {
    pub id: Uuid,
    pub photo_id: String,
    pub profile_id: Uuid,
    #[serde(skip_serializing)]
    pub object_key: String,
    pub order_index: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_photos)]
pub struct NewPhoto {
    pub photo_id: String,
    pub profile_id: Uuid,
    pub object_key: String,
    pub order_index: i32,
}

// --- Prompt answer ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profile_prompts)]
pub struct PromptAnswer {
    pub id: Uuid,
    pub prompt_answer_id: String,
    pub profile_id: Uuid,
    pub prompt_id: String,
    pub answer: String,
    pub order_index: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_prompts)]
pub struct NewPromptAnswer {
    pub prompt_answer_id: String,
    pub profile_id: Uuid,
    pub prompt_id: String,
    pub answer: String,
    pub order_index: i32,
}

// --- Like / Pass ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = likes)]
pub struct Like {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub content_type: ContentType,
    pub content_reference: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub content_type: ContentType,
    pub content_reference: String,
    pub message: Option<String>,
}

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = passes)]
pub struct Pass {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = passes)]
pub struct NewPass {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
}

// --- Match ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub initiating_like_id: Uuid,
    pub is_active: bool,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_sender_id: Option<Uuid>,
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    pub fn other_user(&self, user_id: Uuid) -> Uuid {
        if self.user1_id == user_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub initiating_like_id: Uuid,
    pub is_active: bool,
}

/// An unordered pair stored with the lower id first so a single-direction
/// unique index guarantees at most one match per pair. Must be applied
/// before both inserts and lookups.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

// --- Conversation read marker ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = conversation_reads)]
pub struct ConversationRead {
    pub id: Uuid,
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub last_read_at: DateTime<Utc>,
    pub unread_count: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = conversation_reads)]
pub struct NewConversationRead {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub last_read_at: DateTime<Utc>,
    pub unread_count: i32,
}

// --- Push subscription ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = push_subscriptions)]
pub struct PushSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = push_subscriptions)]
pub struct NewPushSubscription {
    pub user_id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth_key: String,
}

// --- Response views ---

/// A photo as surfaced to clients, with its storage key resolved to a URL.
#[derive(Debug, Serialize, Clone)]
pub struct PhotoView {
    pub photo_id: String,
    pub order_index: i32,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileWithContent {
    #[serde(flatten)]
    pub profile: Profile,
    pub photos: Vec<PhotoView>,
    pub prompts: Vec<PromptAnswer>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LikedContent {
    Photo(PhotoView),
    Prompt { prompt_id: String, answer: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_orders_lower_first() {
        let a = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        let b = Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap();

        assert_eq!(canonical_pair(a, b), (a, b));
        assert_eq!(canonical_pair(b, a), (a, b));
        assert_eq!(canonical_pair(a, a), (a, a));
    }

    #[test]
    fn match_party_helpers() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let c = Uuid::now_v7();
        let (user1_id, user2_id) = canonical_pair(a, b);

        let m = Match {
            id: Uuid::now_v7(),
            user1_id,
            user2_id,
            initiating_like_id: Uuid::now_v7(),
            is_active: true,
            last_message_at: None,
            last_message_sender_id: None,
            last_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(m.involves(a));
        assert!(m.involves(b));
        assert!(!m.involves(c));
        assert_eq!(m.other_user(a), b);
        assert_eq!(m.other_user(b), a);
    }

    #[test]
    fn preferred_years_lookup() {
        let prefs = PreferredYears {
            freshman: false,
            sophomore: false,
            junior: true,
            senior: true,
        };

        assert!(prefs.allows(ClassYear::Junior));
        assert!(prefs.allows(ClassYear::Senior));
        assert!(!prefs.allows(ClassYear::Freshman));
        assert!(!prefs.allows(ClassYear::Sophomore));
    }

    #[test]
    fn enum_serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), "\"male\"");
        assert_eq!(
            serde_json::to_string(&ClassYear::Sophomore).unwrap(),
            "\"sophomore\""
        );
        assert_eq!(
            serde_json::from_str::<ContentType>("\"prompt\"").unwrap(),
            ContentType::Prompt
        );
    }
}
