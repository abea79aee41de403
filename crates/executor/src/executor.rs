use std::collections::HashMap;

use indexmap::IndexMap;
use parser::{
    types::{
        DocumentOperations, ExecutableDocument, Field, FragmentDefinition, OperationDefinition,
        OperationType, Selection, SelectionSet,
    },
    Positioned,
};
use tracing::instrument;
use value::{ConstValue, Name, Variables};

use graphward_schema::{MetaType, TypeExt};

use crate::{
    arguments::coerce_arguments,
    context::RequestContext,
    middleware::run_field_chain,
    resolver::{Resolved, ResolverParams},
    ExecuteError, Request, Response, ServerError,
};

/// Executes one GraphQL request against the policy schema.
///
/// Execution is cooperative and single-tasked: every sibling field of a level
/// runs its middleware chain and resolver, then the batch registry flushes
/// once for the tick, then deferred values are read and sub-selections
/// recurse. Sibling fields interleave but never run concurrently.
pub struct Executor {
    ctx: RequestContext,
}

struct ExecScope<'a> {
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    variables: &'a Variables,
}

#[derive(Debug, Clone)]
struct ParentNode {
    value: ConstValue,
    path: Vec<ConstValue>,
}

impl ParentNode {
    fn root() -> Self {
        Self {
            value: ConstValue::Null,
            path: Vec::new(),
        }
    }

    fn child(&self, segment: ConstValue) -> Vec<ConstValue> {
        let mut path = self.path.clone();
        path.push(segment);
        path
    }
}

/// How one parent's field value decomposed into child roots.
enum Shape {
    /// Error already recorded; the field nulls out.
    Errored,
    Null,
    /// A leaf value delivered as-is despite a sub-selection.
    Leaf(ConstValue),
    /// One child root was contributed.
    Object,
    /// This many child roots were contributed.
    List(usize),
}

impl Executor {
    pub fn new(ctx: RequestContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    #[instrument(skip_all, level = "debug")]
    pub fn execute(&self, request: &Request) -> Response {
        let document = match parser::parse_query(&request.query) {
            Ok(document) => document,
            Err(err) => {
                return Response::from_error(ServerError::new(format!(
                    "Failed to parse the query: {err}"
                )))
            }
        };

        let operation = match select_operation(&document, request.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(err) => return Response::from_error(err.to_server_error(&[], self.ctx.debug)),
        };

        let scope = ExecScope {
            fragments: &document.fragments,
            variables: &request.variables,
        };
        let mut errors = Vec::new();

        let data = match operation.node.ty {
            OperationType::Query => {
                let root_type = self.ctx.schema.query_root();
                let mut results = self.execute_selection(
                    &scope,
                    &mut errors,
                    root_type,
                    &operation.node.selection_set.node,
                    vec![ParentNode::root()],
                );
                results.pop().unwrap_or(ConstValue::Null)
            }
            OperationType::Mutation => match self.ctx.schema.mutation_root() {
                Some(root_type) => self.execute_mutation_root(
                    &scope,
                    &mut errors,
                    root_type,
                    &operation.node.selection_set.node,
                ),
                None => {
                    return Response::from_error(ServerError::new(
                        "The schema does not define a mutation root.",
                    ))
                }
            },
            OperationType::Subscription => {
                return Response::from_error(
                    ExecuteError::SubscriptionsUnsupported.to_server_error(&[], self.ctx.debug),
                )
            }
        };

        Response { data, errors }
    }

    fn execute_selection<'a>(
        &self,
        scope: &ExecScope<'a>,
        errors: &mut Vec<ServerError>,
        parent_type: &MetaType,
        selection_set: &'a SelectionSet,
        parents: Vec<ParentNode>,
    ) -> Vec<ConstValue> {
        let fields = self.collect_fields(scope, parent_type, selection_set);
        self.execute_fields(scope, errors, parent_type, &fields, parents)
    }

    /// Mutation root fields run serially, each with its own tick, so one
    /// mutation's writes are visible to the next.
    fn execute_mutation_root<'a>(
        &self,
        scope: &ExecScope<'a>,
        errors: &mut Vec<ServerError>,
        root_type: &MetaType,
        selection_set: &'a SelectionSet,
    ) -> ConstValue {
        let fields = self.collect_fields(scope, root_type, selection_set);
        let mut merged = IndexMap::new();
        for field in fields {
            let results = self.execute_fields(
                scope,
                errors,
                root_type,
                &[field],
                vec![ParentNode::root()],
            );
            if let Some(ConstValue::Object(object)) = results.into_iter().next() {
                merged.extend(object);
            }
        }
        ConstValue::Object(merged)
    }

    /// One tick: resolve every (parent, field) pair, flush the batch
    /// registry once, then read deferred values and recurse breadth-first
    /// into sub-selections.
    fn execute_fields<'a>(
        &self,
        scope: &ExecScope<'a>,
        errors: &mut Vec<ServerError>,
        parent_type: &MetaType,
        fields: &[&'a Positioned<Field>],
        parents: Vec<ParentNode>,
    ) -> Vec<ConstValue> {
        // Phase 1: run middleware chains and resolvers for all siblings.
        let mut slots: Vec<Vec<Result<Resolved, ExecuteError>>> = Vec::with_capacity(parents.len());
        for parent in &parents {
            let mut row = Vec::with_capacity(fields.len());
            for field in fields {
                row.push(self.resolve_field(scope, parent_type, parent, field));
            }
            slots.push(row);
        }

        // Phase 2: the tick's single flush, before any deferred value is
        // read.
        self.ctx
            .batches
            .lock()
            .expect("batch registry poisoned")
            .flush(&self.ctx.store);

        // Phase 3: materialize deferred values.
        let materialized: Vec<Vec<Result<ConstValue, ExecuteError>>> = slots
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|slot| match slot {
                        Ok(Resolved::Value(value)) => Ok(value),
                        Ok(Resolved::Deferred(lazy)) => lazy.take().unwrap_or_else(|| {
                            Err(ExecuteError::Resolver(
                                "deferred value was not resolved by the batch flush".to_string(),
                            ))
                        }),
                        Err(err) => Err(err),
                    })
                    .collect()
            })
            .collect();
        let mut materialized: Vec<Vec<Option<Result<ConstValue, ExecuteError>>>> = materialized
            .into_iter()
            .map(|row| row.into_iter().map(Some).collect())
            .collect();

        // Phase 4: assemble objects, recursing per field across all parents
        // so nested relations keep batching together.
        let mut objects: Vec<IndexMap<Name, ConstValue>> =
            parents.iter().map(|_| IndexMap::new()).collect();

        for (field_index, field) in fields.iter().enumerate() {
            let response_key = field.node.response_key().node.clone();
            let definition = parent_type.fields.get(field.node.name.node.as_str());
            let sub_selection = &field.node.selection_set.node;
            let child_type = definition.and_then(|definition| {
                self.ctx
                    .schema
                    .types
                    .get(definition.ty.named_type().unwrap_or_default())
            });

            let recurse = !sub_selection.items.is_empty()
                && child_type.map(|ty| ty.is_composite()).unwrap_or(false);

            if !recurse {
                for (parent_index, parent) in parents.iter().enumerate() {
                    let slot = materialized[parent_index][field_index]
                        .take()
                        .unwrap_or(Ok(ConstValue::Null));
                    let value = self.unwrap_or_record(errors, parent, &response_key, slot);
                    objects[parent_index].insert(response_key.clone(), value);
                }
                continue;
            }

            // Decompose each parent's value into child roots.
            let mut shapes = Vec::with_capacity(parents.len());
            let mut child_parents = Vec::new();
            for (parent_index, parent) in parents.iter().enumerate() {
                let slot = materialized[parent_index][field_index]
                    .take()
                    .unwrap_or(Ok(ConstValue::Null));
                match slot {
                    Err(err) => {
                        let mut path = parent.path.clone();
                        path.push(ConstValue::String(response_key.to_string()));
                        errors.push(err.to_server_error(&path, self.ctx.debug));
                        shapes.push(Shape::Errored);
                    }
                    Ok(ConstValue::Null) => shapes.push(Shape::Null),
                    Ok(ConstValue::Object(object)) => {
                        child_parents.push(ParentNode {
                            value: ConstValue::Object(object),
                            path: parent.child(ConstValue::String(response_key.to_string())),
                        });
                        shapes.push(Shape::Object);
                    }
                    Ok(ConstValue::List(items)) => {
                        shapes.push(Shape::List(items.len()));
                        for (index, item) in items.into_iter().enumerate() {
                            let mut path =
                                parent.child(ConstValue::String(response_key.to_string()));
                            path.push(ConstValue::from(index as u64));
                            child_parents.push(ParentNode { value: item, path });
                        }
                    }
                    Ok(other) => shapes.push(Shape::Leaf(other)),
                }
            }

            let child_type = child_type.unwrap_or(parent_type);
            let completed =
                self.execute_selection(scope, errors, child_type, sub_selection, child_parents);
            let mut completed = completed.into_iter();

            for (parent_index, shape) in shapes.into_iter().enumerate() {
                let value = match shape {
                    Shape::Errored | Shape::Null => ConstValue::Null,
                    Shape::Leaf(value) => value,
                    Shape::Object => completed.next().unwrap_or(ConstValue::Null),
                    Shape::List(len) => ConstValue::List(
                        (0..len)
                            .map(|_| completed.next().unwrap_or(ConstValue::Null))
                            .collect(),
                    ),
                };
                objects[parent_index].insert(response_key.clone(), value);
            }
        }

        objects.into_iter().map(ConstValue::Object).collect()
    }

    fn resolve_field<'a>(
        &self,
        scope: &ExecScope<'a>,
        parent_type: &MetaType,
        parent: &ParentNode,
        field: &'a Positioned<Field>,
    ) -> Result<Resolved, ExecuteError> {
        let field_name = field.node.name.node.as_str();
        if field_name == "__typename" {
            return Ok(Resolved::Value(ConstValue::String(
                parent_type.name.to_string(),
            )));
        }

        let Some(definition) = parent_type.fields.get(field_name) else {
            return Err(ExecuteError::UnknownField {
                type_name: parent_type.name.to_string(),
                field_name: field_name.to_string(),
            });
        };

        let args = coerce_arguments(definition, &field.node, scope.variables)?;
        let params = ResolverParams {
            ctx: &self.ctx,
            root: &parent.value,
            args: &args,
            parent_type: parent_type.name.as_str(),
            field_name,
        };
        run_field_chain(&params, &definition.plan.middleware, definition)
    }

    fn unwrap_or_record(
        &self,
        errors: &mut Vec<ServerError>,
        parent: &ParentNode,
        response_key: &Name,
        slot: Result<ConstValue, ExecuteError>,
    ) -> ConstValue {
        match slot {
            Ok(value) => value,
            Err(err) => {
                let mut path = parent.path.clone();
                path.push(ConstValue::String(response_key.to_string()));
                errors.push(err.to_server_error(&path, self.ctx.debug));
                ConstValue::Null
            }
        }
    }

    /// Flatten a selection set into its fields, expanding fragments whose
    /// type condition matches the parent type.
    fn collect_fields<'a>(
        &self,
        scope: &ExecScope<'a>,
        parent_type: &MetaType,
        selection_set: &'a SelectionSet,
    ) -> Vec<&'a Positioned<Field>> {
        let mut fields = Vec::new();
        self.collect_fields_into(scope, parent_type, selection_set, &mut fields);
        fields
    }

    fn collect_fields_into<'a>(
        &self,
        scope: &ExecScope<'a>,
        parent_type: &MetaType,
        selection_set: &'a SelectionSet,
        fields: &mut Vec<&'a Positioned<Field>>,
    ) {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => fields.push(field),
                Selection::FragmentSpread(spread) => {
                    if let Some(fragment) = scope.fragments.get(&spread.node.fragment_name.node) {
                        let condition = fragment.node.type_condition.node.on.node.as_str();
                        if self.condition_matches(parent_type, condition) {
                            self.collect_fields_into(
                                scope,
                                parent_type,
                                &fragment.node.selection_set.node,
                                fields,
                            );
                        }
                    }
                }
                Selection::InlineFragment(inline) => {
                    let matches = match &inline.node.type_condition {
                        Some(condition) => {
                            self.condition_matches(parent_type, condition.node.on.node.as_str())
                        }
                        None => true,
                    };
                    if matches {
                        self.collect_fields_into(
                            scope,
                            parent_type,
                            &inline.node.selection_set.node,
                            fields,
                        );
                    }
                }
            }
        }
    }

    fn condition_matches(&self, parent_type: &MetaType, condition: &str) -> bool {
        if parent_type.name == condition {
            return true;
        }
        if parent_type.implements.contains(condition) {
            return true;
        }
        self.ctx
            .schema
            .types
            .get(condition)
            .map(|ty| ty.is_possible_type(parent_type.name.as_str()))
            .unwrap_or(false)
    }
}

/// Pick the operation to execute, by name when the document defines several.
fn select_operation<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'a Positioned<OperationDefinition>, ExecuteError> {
    match operation_name {
        Some(name) => match &document.operations {
            DocumentOperations::Single(_) => {
                Err(ExecuteError::UnknownOperation(name.to_string()))
            }
            DocumentOperations::Multiple(operations) => operations
                .get(name)
                .ok_or_else(|| ExecuteError::UnknownOperation(name.to_string())),
        },
        None => match &document.operations {
            DocumentOperations::Single(operation) => Ok(operation),
            DocumentOperations::Multiple(operations) if operations.len() == 1 => {
                Ok(operations.values().next().expect("len checked"))
            }
            DocumentOperations::Multiple(_) => Err(ExecuteError::OperationNameRequired),
        },
    }
}
