use indexmap::{IndexMap, IndexSet};
use parser::{
    types::{
        ConstDirective, FieldDefinition, ObjectType, ServiceDocument, Type, TypeDefinition,
        TypeSystemDefinition,
    },
    Positioned,
};
use tracing::instrument;
use value::{ConstValue, Name};

use crate::{
    directives::{FieldMiddleware, FieldPlan, GuardSpec},
    registry::{DirectiveArguments, DirectiveRegistry, FieldContext, PlanBuilder},
    DefinitionError,
};

/// Directives handled by the GraphQL layer itself, not by the registry.
const BUILTIN_DIRECTIVES: [&str; 5] = ["deprecated", "specifiedBy", "include", "skip", "oneOf"];

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

#[derive(Debug, PartialEq)]
pub struct MetaInputValue {
    pub name: Name,
    pub description: Option<String>,
    pub ty: Type,
    pub default_value: Option<ConstValue>,
}

#[derive(Debug, PartialEq)]
pub struct MetaField {
    pub name: Name,
    pub description: Option<String>,
    pub arguments: IndexMap<Name, MetaInputValue>,
    pub ty: Type,
    /// The field's authorization/resolution plan, fixed at schema build.
    pub plan: FieldPlan,
}

#[derive(Debug, PartialEq)]
pub struct MetaType {
    pub name: Name,
    pub description: Option<String>,
    pub kind: TypeKind,
    pub implements: IndexSet<Name>,
    pub fields: IndexMap<Name, MetaField>,
    pub possible_types: IndexSet<Name>,
    pub enum_values: IndexSet<Name>,
    pub input_fields: IndexMap<Name, MetaInputValue>,
}

impl MetaType {
    fn empty(name: Name, kind: TypeKind) -> Self {
        Self {
            name,
            description: None,
            kind,
            implements: Default::default(),
            fields: Default::default(),
            possible_types: Default::default(),
            enum_values: Default::default(),
            input_fields: Default::default(),
        }
    }

    #[inline]
    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }

    #[inline]
    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Object | TypeKind::Interface | TypeKind::Union
        )
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Interface | TypeKind::Union)
    }

    #[inline]
    pub fn is_possible_type(&self, type_name: &str) -> bool {
        match self.kind {
            TypeKind::Interface | TypeKind::Union => self.possible_types.contains(type_name),
            TypeKind::Object => self.name == type_name,
            _ => false,
        }
    }
}

/// The immutable result of schema construction: meta types plus one
/// [`FieldPlan`] per field.
///
/// Everything here is derived from schema-directive metadata once, at build
/// time; requests only read it.
#[derive(Debug)]
pub struct PolicySchema {
    pub query_type: Name,
    pub mutation_type: Option<Name>,
    pub types: IndexMap<Name, MetaType>,
}

impl PolicySchema {
    /// Parse an SDL document with the built-in directive set.
    #[instrument(err(Debug), skip_all, level = "debug")]
    pub fn parse(document: &str) -> Result<PolicySchema, DefinitionError> {
        Self::parse_with(document, &DirectiveRegistry::with_defaults())
    }

    pub fn parse_with(
        document: &str,
        registry: &DirectiveRegistry,
    ) -> Result<PolicySchema, DefinitionError> {
        let document =
            parser::parse_schema(document).map_err(|err| DefinitionError::Parse(err.to_string()))?;
        Self::new(document, registry)
    }

    pub fn new(
        document: ServiceDocument,
        registry: &DirectiveRegistry,
    ) -> Result<PolicySchema, DefinitionError> {
        // First pass: root operation type names from any schema definition.
        let mut query_name = Name::new("Query");
        let mut mutation_name = Name::new("Mutation");
        for definition in &document.definitions {
            if let TypeSystemDefinition::Schema(schema) = definition {
                if let Some(query) = &schema.node.query {
                    query_name = query.node.clone();
                }
                if let Some(mutation) = &schema.node.mutation {
                    mutation_name = mutation.node.clone();
                }
            }
        }

        // Second pass: convert type definitions and extensions in order.
        let mut types: IndexMap<Name, MetaType> = IndexMap::new();
        for definition in document.definitions {
            match definition {
                TypeSystemDefinition::Schema(_) => {}
                TypeSystemDefinition::Directive(_) => {
                    // Directive definitions only document the SDL surface;
                    // behavior comes from the registry.
                }
                TypeSystemDefinition::Type(type_definition) => {
                    convert_type_definition(
                        &mut types,
                        registry,
                        type_definition,
                        &mutation_name,
                    )?;
                }
            }
        }

        if !types.contains_key(&query_name) {
            return Err(DefinitionError::MissingQueryType);
        }
        let mutation_type = types.contains_key(&mutation_name).then_some(mutation_name);

        let mut schema = PolicySchema {
            query_type: query_name,
            mutation_type,
            types,
        };
        wire_possible_types(&mut schema);
        Ok(schema)
    }

    #[inline]
    pub fn get_type(&self, ty: &Type) -> Option<&MetaType> {
        use crate::type_ext::TypeExt;
        self.types.get(ty.named_type()?)
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&MetaField> {
        self.types.get(type_name)?.fields.get(field_name)
    }

    pub fn query_root(&self) -> &MetaType {
        &self.types[&self.query_type]
    }

    pub fn mutation_root(&self) -> Option<&MetaType> {
        self.mutation_type.as_ref().map(|name| &self.types[name])
    }

    pub fn is_mutation_root(&self, type_name: &str) -> bool {
        self.mutation_type
            .as_ref()
            .map(|name| name == type_name)
            .unwrap_or(false)
    }
}

fn convert_type_definition(
    types: &mut IndexMap<Name, MetaType>,
    registry: &DirectiveRegistry,
    type_definition: Positioned<TypeDefinition>,
    mutation_name: &Name,
) -> Result<(), DefinitionError> {
    use parser::types::TypeKind as AstTypeKind;

    let name = type_definition.node.name.node.clone();
    let description = type_definition
        .node
        .description
        .as_ref()
        .map(|description| description.node.clone());

    match type_definition.node.kind {
        AstTypeKind::Object(object) => {
            let is_mutation_root = &name == mutation_name;
            let meta_type = types
                .entry(name.clone())
                .or_insert_with(|| MetaType::empty(name.clone(), TypeKind::Object));
            if meta_type.description.is_none() {
                meta_type.description = description;
            }
            convert_object_block(
                meta_type,
                registry,
                &name,
                &type_definition.node.directives,
                object,
                is_mutation_root,
            )?;
        }
        AstTypeKind::Interface(interface) => {
            let meta_type = types
                .entry(name.clone())
                .or_insert_with(|| MetaType::empty(name.clone(), TypeKind::Interface));
            meta_type.description = description;
            for implements in interface.implements {
                meta_type.implements.insert(implements.node);
            }
            for field in interface.fields {
                let meta_field = convert_field(registry, &name, &[], &field.node, false)?;
                meta_type.fields.insert(meta_field.name.clone(), meta_field);
            }
        }
        AstTypeKind::Union(union_type) => {
            let meta_type = types
                .entry(name.clone())
                .or_insert_with(|| MetaType::empty(name.clone(), TypeKind::Union));
            meta_type.description = description;
            for member in union_type.members {
                meta_type.possible_types.insert(member.node);
            }
        }
        AstTypeKind::Enum(enum_type) => {
            let meta_type = types
                .entry(name.clone())
                .or_insert_with(|| MetaType::empty(name.clone(), TypeKind::Enum));
            meta_type.description = description;
            for enum_value in enum_type.values {
                meta_type.enum_values.insert(enum_value.node.value.node);
            }
        }
        AstTypeKind::InputObject(input_object) => {
            let meta_type = types
                .entry(name.clone())
                .or_insert_with(|| MetaType::empty(name.clone(), TypeKind::InputObject));
            meta_type.description = description;
            for field in input_object.fields {
                let input_value = convert_input_value(&field.node);
                meta_type
                    .input_fields
                    .insert(input_value.name.clone(), input_value);
            }
        }
        AstTypeKind::Scalar => {
            types
                .entry(name.clone())
                .or_insert_with(|| MetaType::empty(name, TypeKind::Scalar));
        }
    }
    Ok(())
}

/// Convert one object block (original definition or extension).
///
/// A `@guard` on the block propagates to exactly the fields declared in this
/// block, ahead of their own directives; fields of other blocks of the same
/// merged type are not affected.
fn convert_object_block(
    meta_type: &mut MetaType,
    registry: &DirectiveRegistry,
    type_name: &Name,
    directives: &[Positioned<ConstDirective>],
    object: ObjectType,
    is_mutation_root: bool,
) -> Result<(), DefinitionError> {
    let mut block_guards = Vec::new();
    for directive in directives {
        let directive_name = directive.node.name.node.as_str();
        if directive_name == "guard" {
            let arguments = DirectiveArguments::new(
                "guard",
                type_name.to_string(),
                &directive.node.arguments,
            );
            block_guards.push(GuardSpec::from_arguments(&arguments)?);
        }
    }

    for implements in object.implements {
        meta_type.implements.insert(implements.node);
    }

    for field in object.fields {
        let meta_field = convert_field(
            registry,
            type_name,
            &block_guards,
            &field.node,
            is_mutation_root,
        )?;
        meta_type.fields.insert(meta_field.name.clone(), meta_field);
    }
    Ok(())
}

fn convert_field(
    registry: &DirectiveRegistry,
    type_name: &Name,
    block_guards: &[GuardSpec],
    field: &FieldDefinition,
    is_mutation_root: bool,
) -> Result<MetaField, DefinitionError> {
    let field_name = field.name.node.clone();
    let ctx = FieldContext {
        type_name: type_name.as_str(),
        field_name: field_name.as_str(),
        field,
        is_mutation_root,
    };

    let mut builder = PlanBuilder::new(type_name.as_str(), field_name.as_str());
    for guard in block_guards {
        builder.push_middleware(FieldMiddleware::Guard(guard.clone()));
    }

    for directive in &field.directives {
        let directive_name = directive.node.name.node.as_str();
        if BUILTIN_DIRECTIVES.contains(&directive_name) {
            continue;
        }
        let handler =
            registry
                .get(directive_name)
                .ok_or_else(|| DefinitionError::UnknownDirective {
                    type_name: type_name.to_string(),
                    field_name: field_name.to_string(),
                    directive: directive_name.to_string(),
                })?;
        let capabilities = handler.capabilities();
        if !(capabilities.field_middleware
            || capabilities.resolver_provider
            || capabilities.lookup_modifier)
        {
            return Err(DefinitionError::MisplacedDirective {
                directive: directive_name.to_string(),
                location: ctx.location(),
                expected: "field",
            });
        }
        let arguments =
            DirectiveArguments::new(directive_name, ctx.location(), &directive.node.arguments);
        handler.apply(&ctx, &arguments, &mut builder)?;
    }

    for argument in &field.arguments {
        let argument_name = &argument.node.name.node;
        for directive in &argument.node.directives {
            let directive_name = directive.node.name.node.as_str();
            if BUILTIN_DIRECTIVES.contains(&directive_name) {
                continue;
            }
            let location = format!("{}.{}({}:)", type_name, field_name, argument_name);
            let handler =
                registry
                    .get(directive_name)
                    .ok_or_else(|| DefinitionError::UnknownDirective {
                        type_name: type_name.to_string(),
                        field_name: format!("{field_name}({argument_name}:)"),
                        directive: directive_name.to_string(),
                    })?;
            if !handler.capabilities().arg_builder {
                return Err(DefinitionError::MisplacedDirective {
                    directive: directive_name.to_string(),
                    location,
                    expected: "argument",
                });
            }
            let arguments =
                DirectiveArguments::new(directive_name, location, &directive.node.arguments);
            handler.apply_to_argument(&ctx, argument_name, &arguments, &mut builder)?;
        }
    }

    Ok(MetaField {
        name: field_name,
        description: field
            .description
            .as_ref()
            .map(|description| description.node.clone()),
        arguments: field
            .arguments
            .iter()
            .map(|argument| {
                let input_value = convert_input_value(&argument.node);
                (input_value.name.clone(), input_value)
            })
            .collect(),
        ty: field.ty.node.clone(),
        plan: builder.finish(),
    })
}

fn convert_input_value(input: &parser::types::InputValueDefinition) -> MetaInputValue {
    MetaInputValue {
        name: input.name.node.clone(),
        description: input
            .description
            .as_ref()
            .map(|description| description.node.clone()),
        ty: input.ty.node.clone(),
        default_value: input
            .default_value
            .as_ref()
            .map(|default_value| default_value.node.clone()),
    }
}

/// Wire interface membership into `possible_types`, mirroring how the
/// executor matches fragment type conditions.
fn wire_possible_types(schema: &mut PolicySchema) {
    let mut memberships: Vec<(Name, Name)> = Vec::new();
    for (type_name, meta_type) in &schema.types {
        if meta_type.kind == TypeKind::Object {
            for interface in &meta_type.implements {
                memberships.push((interface.clone(), type_name.clone()));
            }
        }
    }
    for (interface, object) in memberships {
        if let Some(interface_type) = schema.types.get_mut(&interface) {
            interface_type.possible_types.insert(object);
        }
    }
}
