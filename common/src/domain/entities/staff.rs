use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Entity, NAME_MAX_LENGTH, NoFilter, SHORT_TEXT_MAX_LENGTH};
use crate::domain::validation::{ValidationErrors, Validator, link, nullable, plain, text};
use crate::domain::{DocumentId, Email};

pub const STAFFS_COLLECTION: &str = "staffs";

/// A member of the institute shown on the people page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    pub designation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub email: Option<Email>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffInput {
    pub name: Option<String>,
    pub designation: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub photo: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaff {
    pub name: String,
    pub designation: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<Email>>,
}

impl Entity for Staff {
    const COLLECTION: &'static str = STAFFS_COLLECTION;
    const NAME: &'static str = "Staff member";

    type Input = StaffInput;
    type Draft = NewStaff;
    type Patch = StaffPatch;
    type Query = NoFilter;

    fn validate_create(input: StaffInput) -> Result<NewStaff, ValidationErrors> {
        let mut v = Validator::new();
        let name = v.required("name", input.name, text(NAME_MAX_LENGTH));
        let designation = v.required(
            "designation",
            input.designation,
            text(SHORT_TEXT_MAX_LENGTH),
        );
        let description = v
            .optional("description", input.description, plain)
            .unwrap_or_default();
        let photo = v.optional("photo", input.photo.flatten(), link);
        let email = v.optional("email", input.email.flatten(), Email::parse);

        match (name, designation) {
            (Some(name), Some(designation)) => v.finish(NewStaff {
                name,
                designation,
                description,
                photo,
                email,
            }),
            _ => Err(v.into_errors()),
        }
    }

    fn validate_patch(input: StaffInput) -> Result<StaffPatch, ValidationErrors> {
        let mut v = Validator::new();
        let patch = StaffPatch {
            name: v.optional("name", input.name, text(NAME_MAX_LENGTH)),
            designation: v.optional(
                "designation",
                input.designation,
                text(SHORT_TEXT_MAX_LENGTH),
            ),
            description: v.optional("description", input.description, plain),
            photo: v.clearable("photo", input.photo, link),
            email: v.clearable("email", input.email, Email::parse),
        };
        v.finish(patch)
    }
}
