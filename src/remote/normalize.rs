// src/remote/normalize.rs

//! Canonical shapes for joined relations.
//!
//! The managed backend returns an embedded relation as an array, a single
//! object or `null` depending on how the foreign key is declared. Row types
//! deserialize joins through these adapters so that everything above the
//! remote layer only ever sees `Vec<T>` or `Option<T>`.

use serde::{Deserialize, Deserializer};

/// Either a JSON array of `T` or a bare `T`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }

    /// First element, if any.
    pub fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

/// `#[serde(deserialize_with = "deserialize_vec", default)]`: null, object or array into `Vec<T>`.
pub fn deserialize_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<OneOrMany<T>>::deserialize(deserializer)?;
    Ok(value.map(OneOrMany::into_vec).unwrap_or_default())
}

/// `#[serde(deserialize_with = "deserialize_single", default)]`: null, object or array into `Option<T>`.
pub fn deserialize_single<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<OneOrMany<T>>::deserialize(deserializer)?;
    Ok(value.and_then(OneOrMany::into_first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Skill {
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "deserialize_single")]
        skill: Option<Skill>,
        #[serde(default, deserialize_with = "deserialize_vec")]
        tags: Vec<Skill>,
    }

    #[test]
    fn test_single_accepts_object_array_and_null() {
        let obj: Row = serde_json::from_value(json!({ "skill": { "name": "Excel" } })).unwrap();
        let arr: Row = serde_json::from_value(json!({ "skill": [{ "name": "Excel" }] })).unwrap();
        let empty: Row = serde_json::from_value(json!({ "skill": [] })).unwrap();
        let null: Row = serde_json::from_value(json!({ "skill": null })).unwrap();
        let missing: Row = serde_json::from_value(json!({})).unwrap();

        assert_eq!(obj.skill, Some(Skill { name: "Excel".into() }));
        assert_eq!(arr.skill, Some(Skill { name: "Excel".into() }));
        assert_eq!(empty.skill, None);
        assert_eq!(null.skill, None);
        assert_eq!(missing.skill, None);
    }

    #[test]
    fn test_vec_accepts_object_array_and_null() {
        let obj: Row = serde_json::from_value(json!({ "tags": { "name": "a" } })).unwrap();
        let arr: Row =
            serde_json::from_value(json!({ "tags": [{ "name": "a" }, { "name": "b" }] })).unwrap();
        let null: Row = serde_json::from_value(json!({ "tags": null })).unwrap();

        assert_eq!(obj.tags.len(), 1);
        assert_eq!(arr.tags.len(), 2);
        assert!(null.tags.is_empty());
    }
}
