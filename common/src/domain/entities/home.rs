use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{SHORT_TEXT_MAX_LENGTH, Singleton, SingletonPatch};
use crate::domain::validation::{ValidationErrors, Validator, plain, text};
use crate::domain::{DocumentId, Email};

pub const HOME_CONTENTS_COLLECTION: &str = "homecontents";

/// Landing page copy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeContent {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub hero_title: String,
    #[serde(default)]
    pub hero_subtitle: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub vision: String,
    #[serde(default)]
    pub contact_email: Option<Email>,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeContentInput {
    pub hero_title: Option<String>,
    pub hero_subtitle: Option<String>,
    pub about: Option<String>,
    pub mission: Option<String>,
    pub vision: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub version: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeContentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

fn phone(raw: String) -> Result<String, String> {
    let value = raw.trim();
    let allowed = |c: char| c.is_ascii_digit() || " +-()".contains(c);
    if value.chars().all(allowed) {
        Ok(value.to_owned())
    } else {
        Err("may only contain digits, spaces and + - ( )".to_owned())
    }
}

impl Singleton for HomeContent {
    const COLLECTION: &'static str = HOME_CONTENTS_COLLECTION;
    const NAME: &'static str = "Home content";

    type Input = HomeContentInput;
    type Patch = HomeContentPatch;

    fn validate_patch(
        input: HomeContentInput,
    ) -> Result<SingletonPatch<HomeContentPatch>, ValidationErrors> {
        let mut v = Validator::new();
        let fields = HomeContentPatch {
            hero_title: v.optional("heroTitle", input.hero_title, text(SHORT_TEXT_MAX_LENGTH)),
            hero_subtitle: v.optional("heroSubtitle", input.hero_subtitle, plain),
            about: v.optional("about", input.about, plain),
            mission: v.optional("mission", input.mission, plain),
            vision: v.optional("vision", input.vision, plain),
            contact_email: v.optional("contactEmail", input.contact_email, Email::parse),
            contact_phone: v.optional("contactPhone", input.contact_phone, phone),
            address: v.optional("address", input.address, plain),
        };
        let expected_version = v.optional("version", input.version, |version| {
            if version < 0 {
                Err("must not be negative".to_owned())
            } else {
                Ok(version)
            }
        });
        v.finish(SingletonPatch {
            fields,
            expected_version,
        })
    }
}
