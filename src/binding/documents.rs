//! Operation documents executed by the bound entity APIs
//!
//! Documents are rendered from an entity's [`GraphQLNames`] once, when the
//! binding cache is built. Each is split around its selection set so the
//! query API can splice in a caller-provided selection without
//! re-deriving names on every call.

use std::fmt;

use crate::entities::{GraphQLNames, OperationFlags};

/// Operations every entity API exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindOne,
    FindMany,
    Count,
    CreateOne,
    CreateMany,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    DeleteMany,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::FindOne,
        Operation::FindMany,
        Operation::Count,
        Operation::CreateOne,
        Operation::CreateMany,
        Operation::UpdateOne,
        Operation::UpdateMany,
        Operation::DeleteOne,
        Operation::DeleteMany,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::FindOne => "findOne",
            Operation::FindMany => "findMany",
            Operation::Count => "count",
            Operation::CreateOne => "createOne",
            Operation::CreateMany => "createMany",
            Operation::UpdateOne => "updateOne",
            Operation::UpdateMany => "updateMany",
            Operation::DeleteOne => "deleteOne",
            Operation::DeleteMany => "deleteMany",
        }
    }

    /// Alias of the top-level field holding the operation's result
    pub fn result_field(self) -> &'static str {
        match self {
            Operation::FindOne
            | Operation::CreateOne
            | Operation::UpdateOne
            | Operation::DeleteOne => "item",
            Operation::FindMany
            | Operation::CreateMany
            | Operation::UpdateMany
            | Operation::DeleteMany => "items",
            Operation::Count => "count",
        }
    }

    pub fn is_enabled(self, flags: &OperationFlags) -> bool {
        match self {
            Operation::FindOne | Operation::FindMany | Operation::Count => flags.query,
            Operation::CreateOne | Operation::CreateMany => flags.create,
            Operation::UpdateOne | Operation::UpdateMany => flags.update,
            Operation::DeleteOne | Operation::DeleteMany => flags.delete,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operation document split around its selection set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTemplate {
    head: String,
    tail: Option<String>,
}

impl OperationTemplate {
    fn selecting(head: String) -> Self {
        Self {
            head,
            tail: Some(" } }".to_string()),
        }
    }

    fn scalar(head: String) -> Self {
        Self { head, tail: None }
    }

    /// Full document for `selection`; scalar operations ignore it
    pub fn render(&self, selection: &str) -> String {
        match &self.tail {
            Some(tail) => format!("{}{}{}", self.head, selection, tail),
            None => self.head.clone(),
        }
    }
}

/// Templates of every operation of one entity
#[derive(Debug, Clone)]
pub struct OperationTemplates {
    templates: Vec<OperationTemplate>,
}

impl OperationTemplates {
    pub fn new(names: &GraphQLNames) -> Self {
        let templates = Operation::ALL
            .iter()
            .map(|op| template(*op, names))
            .collect();
        Self { templates }
    }

    pub fn get(&self, op: Operation) -> &OperationTemplate {
        &self.templates[op.index()]
    }

    /// Render every operation with the same selection
    pub fn render_all(&self, selection: &str) -> Vec<String> {
        self.templates.iter().map(|t| t.render(selection)).collect()
    }
}

fn template(op: Operation, names: &GraphQLNames) -> OperationTemplate {
    let unique = &names.where_unique_input_name;
    let filter = &names.where_input_name;
    let alias = op.result_field();

    match op {
        Operation::FindOne => OperationTemplate::selecting(format!(
            "query ($where: {unique}!) {{ {alias}: {}(where: $where) {{ ",
            names.item_query_name
        )),
        Operation::FindMany => OperationTemplate::selecting(format!(
            "query ($where: {filter} = {{}}, $orderBy: [{}!] = [], $take: Int, $skip: Int = 0, \
             $cursor: {unique}) {{ {alias}: {}(where: $where, orderBy: $orderBy, take: $take, \
             skip: $skip, cursor: $cursor) {{ ",
            names.list_order_name, names.list_query_name
        )),
        Operation::Count => OperationTemplate::scalar(format!(
            "query ($where: {filter} = {{}}) {{ {alias}: {}(where: $where) }}",
            names.list_query_count_name
        )),
        Operation::CreateOne => OperationTemplate::selecting(format!(
            "mutation ($data: {}!) {{ {alias}: {}(data: $data) {{ ",
            names.create_input_name, names.create_mutation_name
        )),
        Operation::CreateMany => OperationTemplate::selecting(format!(
            "mutation ($data: [{}!]!) {{ {alias}: {}(data: $data) {{ ",
            names.create_input_name, names.create_many_mutation_name
        )),
        Operation::UpdateOne => OperationTemplate::selecting(format!(
            "mutation ($where: {unique}!, $data: {}!) {{ \
             {alias}: {}(where: $where, data: $data) {{ ",
            names.update_input_name, names.update_mutation_name
        )),
        Operation::UpdateMany => OperationTemplate::selecting(format!(
            "mutation ($data: [{}!]!) {{ {alias}: {}(data: $data) {{ ",
            names.update_many_input_name, names.update_many_mutation_name
        )),
        Operation::DeleteOne => OperationTemplate::selecting(format!(
            "mutation ($where: {unique}!) {{ {alias}: {}(where: $where) {{ ",
            names.delete_mutation_name
        )),
        Operation::DeleteMany => OperationTemplate::selecting(format!(
            "mutation ($where: [{unique}!]!) {{ {alias}: {}(where: $where) {{ ",
            names.delete_many_mutation_name
        )),
    }
}
