use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::{
    MAX_AGE, MAX_DESCRIPTION_LEN, MAX_INTERESTS_LEN, MAX_NAME_LEN, MIN_AGE,
    user::{Gender, Interests, NewUser, UserPayload},
};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Firstname,
    Lastname,
    Age,
    Gender,
    Interests,
    Description,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Firstname => "firstname",
            Field::Lastname => "lastname",
            Field::Age => "age",
            Field::Gender => "gender",
            Field::Interests => "interests",
            Field::Description => "description",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Server-side check. Either the whole payload is usable or every violation
/// is reported, nothing in between.
pub fn validate(payload: &UserPayload) -> Result<NewUser, Vec<String>> {
    check(payload).map_err(|errors| errors.into_iter().map(|e| e.message).collect())
}

/// Client-side check, at most one error per field, in form order.
pub fn inspect(payload: &UserPayload) -> Vec<FieldError> {
    check(payload).err().unwrap_or_default()
}

fn check(payload: &UserPayload) -> Result<NewUser, Vec<FieldError>> {
    let mut errors = Vec::new();

    let firstname = text(
        payload.firstname.as_deref(),
        Field::Firstname,
        MAX_NAME_LEN,
        &mut errors,
    );
    let lastname = text(
        payload.lastname.as_deref(),
        Field::Lastname,
        MAX_NAME_LEN,
        &mut errors,
    );
    let age = age(payload.age.as_ref(), &mut errors);
    let gender = gender(payload.gender.as_deref(), &mut errors);
    let interests = interests(payload.interests.as_ref(), &mut errors);
    let description = text(
        payload.description.as_deref(),
        Field::Description,
        MAX_DESCRIPTION_LEN,
        &mut errors,
    );

    match (firstname, lastname, age, gender, interests, description) {
        (
            Some(firstname),
            Some(lastname),
            Some(age),
            Some(gender),
            Some(interests),
            Some(description),
        ) if errors.is_empty() => Ok(NewUser {
            firstname,
            lastname,
            age,
            gender,
            interests,
            description,
        }),
        _ => Err(errors),
    }
}

fn text(value: Option<&str>, field: Field, max: usize, errors: &mut Vec<FieldError>) -> Option<String> {
    let value = value.map(str::trim).unwrap_or_default();

    if value.is_empty() {
        errors.push(FieldError::new(field, format!("{field} is required")));
        return None;
    }

    if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("{field} must be at most {max} characters"),
        ));
        return None;
    }

    Some(value.to_string())
}

fn age(value: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<i64> {
    let number = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().parse::<f64>().ok()),
        Some(Value::Number(n)) => Some(n.as_f64()),
        Some(_) => Some(None),
    };

    match number {
        None => {
            errors.push(FieldError::new(Field::Age, "age is required"));
            None
        }
        Some(Some(n)) if n.fract() == 0.0 && (MIN_AGE as f64..=MAX_AGE as f64).contains(&n) => {
            Some(n as i64)
        }
        Some(_) => {
            errors.push(FieldError::new(
                Field::Age,
                format!("age must be a whole number between {MIN_AGE} and {MAX_AGE}"),
            ));
            None
        }
    }
}

fn gender(value: Option<&str>, errors: &mut Vec<FieldError>) -> Option<Gender> {
    let value = value.map(str::trim).unwrap_or_default();

    if value.is_empty() {
        errors.push(FieldError::new(Field::Gender, "gender is required"));
        return None;
    }

    value
        .parse()
        .map_err(|_| {
            let choices: Vec<&str> = Gender::ALL.iter().map(Gender::as_str).collect();
            errors.push(FieldError::new(
                Field::Gender,
                format!("gender must be one of {}", choices.join(", ")),
            ));
        })
        .ok()
}

fn interests(value: Option<&Interests>, errors: &mut Vec<FieldError>) -> Option<String> {
    let joined = value.map(normalize_interests).unwrap_or_default();

    if joined.is_empty() {
        errors.push(FieldError::new(
            Field::Interests,
            "at least one interest is required",
        ));
        return None;
    }

    if joined.chars().count() > MAX_INTERESTS_LEN {
        errors.push(FieldError::new(
            Field::Interests,
            format!("interests must be at most {MAX_INTERESTS_LEN} characters"),
        ));
        return None;
    }

    Some(joined)
}

/// Joins tags as `"a, b, c"`, collapsing inner whitespace and dropping blanks.
///
/// List entries may themselves be comma joined.
pub fn normalize_interests(interests: &Interests) -> String {
    let tags: Vec<&str> = match interests {
        Interests::List(tags) => tags.iter().flat_map(|tag| tag.split(',')).collect(),
        Interests::Joined(joined) => joined.split(',').collect(),
    };

    tags.into_iter()
        .map(|tag| WHITESPACE.replace_all(tag.trim(), " ").into_owned())
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
