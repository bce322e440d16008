//! GraphQL names derived from an entity key
//!
//! Every operation the bound APIs execute is addressed through these
//! names, so they must match whatever compiled the schemas.

use serde::{Deserialize, Serialize};

/// GraphQL type, field and input names of one entity
///
/// For an entity `Post` with plural `Posts`:
///
/// | name | value |
/// |------|-------|
/// | `output_type_name` | `Post` |
/// | `item_query_name` | `post` |
/// | `list_query_name` | `posts` |
/// | `list_query_count_name` | `postsCount` |
/// | `create_mutation_name` | `createPost` |
/// | `create_many_mutation_name` | `createPosts` |
/// | `where_unique_input_name` | `PostWhereUniqueInput` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLNames {
    pub output_type_name: String,
    pub item_query_name: String,
    pub list_query_name: String,
    pub list_query_count_name: String,
    pub list_order_name: String,
    pub create_mutation_name: String,
    pub create_many_mutation_name: String,
    pub update_mutation_name: String,
    pub update_many_mutation_name: String,
    pub delete_mutation_name: String,
    pub delete_many_mutation_name: String,
    pub where_input_name: String,
    pub where_unique_input_name: String,
    pub create_input_name: String,
    pub update_input_name: String,
    pub update_many_input_name: String,
    pub relate_to_many_for_create_input_name: String,
    pub relate_to_many_for_update_input_name: String,
    pub relate_to_one_for_create_input_name: String,
    pub relate_to_one_for_update_input_name: String,
}

impl GraphQLNames {
    /// Derive names from the entity key and its plural
    pub fn new(key: &str, plural: &str) -> Self {
        let item = lower_first(key);
        let list = lower_first(plural);

        Self {
            output_type_name: key.to_string(),
            item_query_name: item,
            list_query_count_name: format!("{list}Count"),
            list_query_name: list,
            list_order_name: format!("{key}OrderByInput"),
            create_mutation_name: format!("create{key}"),
            create_many_mutation_name: format!("create{plural}"),
            update_mutation_name: format!("update{key}"),
            update_many_mutation_name: format!("update{plural}"),
            delete_mutation_name: format!("delete{key}"),
            delete_many_mutation_name: format!("delete{plural}"),
            where_input_name: format!("{key}WhereInput"),
            where_unique_input_name: format!("{key}WhereUniqueInput"),
            create_input_name: format!("{key}CreateInput"),
            update_input_name: format!("{key}UpdateInput"),
            update_many_input_name: format!("{key}UpdateArgs"),
            relate_to_many_for_create_input_name: format!("{key}RelateToManyForCreateInput"),
            relate_to_many_for_update_input_name: format!("{key}RelateToManyForUpdateInput"),
            relate_to_one_for_create_input_name: format!("{key}RelateToOneForCreateInput"),
            relate_to_one_for_update_input_name: format!("{key}RelateToOneForUpdateInput"),
        }
    }
}

/// English plural of an entity key, preserving its casing
///
/// `Category` → `Categories`, `Address` → `Addresses`, `Shelf` → `Shelves`.
/// Only suffix rules are applied: irregular nouns come out regular
/// (`Person` → `Persons`, `Mouse` → `Mouses`) and need an explicit plural,
/// see [`EntityDefinition::with_plural`](super::EntityDefinition::with_plural).
pub fn pluralize(key: &str) -> String {
    let lower = key.to_ascii_lowercase();
    let stem = |n: usize| &key[..key.len() - n];

    if lower.len() > 1
        && lower.ends_with('y')
        && !matches!(lower.as_bytes()[lower.len() - 2], b'a' | b'e' | b'i' | b'o' | b'u')
    {
        return format!("{}ies", stem(1));
    }

    if ["s", "sh", "ch", "x", "z"].iter().any(|end| lower.ends_with(end)) {
        return format!("{key}es");
    }

    if lower.ends_with("fe") && lower.len() > 2 {
        return format!("{}ves", stem(2));
    }

    if lower.ends_with('f') && lower.len() > 1 {
        return format!("{}ves", stem(1));
    }

    if lower.ends_with('o')
        && lower.len() > 1
        && !matches!(lower.as_bytes()[lower.len() - 2], b'a' | b'e' | b'i' | b'o' | b'u')
        && !matches!(lower.as_str(), "photo" | "piano" | "halo" | "video" | "logo")
    {
        return format!("{key}es");
    }

    format!("{key}s")
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
