//! Operator-side record editing.
//!
//! The form holds raw text as typed. It is checked field by field before
//! anything is sent, and the description is cut to the server's limit on
//! submit.
use std::collections::BTreeMap;

use records::{
    Field, Interests, MAX_DESCRIPTION_LEN, User, UserPayload, inspect,
    validate::truncate_chars,
};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub firstname: String,
    pub lastname: String,
    pub age: Option<String>,
    pub gender: String,
    pub interests: Vec<String>,
    pub description: String,
}

impl UserForm {
    /// Prefilled with an existing record, for editing.
    pub fn from_user(user: &User) -> Self {
        Self {
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            age: Some(user.age.to_string()),
            gender: user.gender.to_string(),
            interests: user.interest_list().into_iter().map(String::from).collect(),
            description: user.description.clone(),
        }
    }

    /// Only the fields given override the current values.
    pub fn apply(&mut self, changes: UserForm) {
        let UserForm {
            firstname,
            lastname,
            age,
            gender,
            interests,
            description,
        } = changes;

        if !firstname.is_empty() {
            self.firstname = firstname;
        }
        if !lastname.is_empty() {
            self.lastname = lastname;
        }
        if age.is_some() {
            self.age = age;
        }
        if !gender.is_empty() {
            self.gender = gender;
        }
        if !interests.is_empty() {
            self.interests = interests;
        }
        if !description.is_empty() {
            self.description = description;
        }
    }

    pub fn to_payload(&self) -> UserPayload {
        let age = self
            .age
            .as_deref()
            .map(str::trim)
            .filter(|age| !age.is_empty())
            .map(|age| match age.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::from(age),
            });

        UserPayload {
            firstname: Some(self.firstname.trim().to_string()),
            lastname: Some(self.lastname.trim().to_string()),
            age,
            gender: Some(self.gender.trim().to_string()),
            interests: Some(Interests::List(self.interests.clone())),
            description: Some(truncate_chars(self.description.trim(), MAX_DESCRIPTION_LEN)),
        }
    }

    /// One message per invalid field, empty when the form can be submitted.
    pub fn field_errors(&self) -> BTreeMap<Field, String> {
        inspect(&self.to_payload())
            .into_iter()
            .map(|e| (e.field, e.message))
            .collect()
    }
}

/// Case-insensitive match on `"firstname lastname"`, a blank term keeps all.
pub fn search<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    let term = term.trim().to_lowercase();

    users
        .iter()
        .filter(|user| term.is_empty() || user.full_name().to_lowercase().contains(&term))
        .collect()
}
