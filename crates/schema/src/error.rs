use thiserror::Error;

/// Schema-build-time errors.
///
/// Every variant aborts schema construction entirely; none of these are ever
/// surfaced to a client at request time.
#[derive(Debug, Clone, Error)]
pub enum DefinitionError {
    #[error("Failed to parse the schema document: {0}")]
    Parse(String),

    #[error(
        "Unknown directive '@{directive}' on '{type_name}.{field_name}'. Directives must be \
         registered with the directive registry before the schema is built."
    )]
    UnknownDirective {
        type_name: String,
        field_name: String,
        directive: String,
    },

    #[error(
        "Directive '@{directive}' cannot be applied to '{location}': it does not implement the \
         '{expected}' capability."
    )]
    MisplacedDirective {
        directive: String,
        location: String,
        expected: &'static str,
    },

    #[error(
        "The arguments {arguments:?} of '@{directive}' on field '{type_name}.{field_name}' are \
         mutually exclusive. At most one of them may be set."
    )]
    MutuallyExclusiveArguments {
        type_name: String,
        field_name: String,
        directive: String,
        arguments: Vec<&'static str>,
    },

    #[error(
        "'@can(resolved: true)' is not allowed on field '{type_name}.{field_name}': checking the \
         resolved result of a mutation would run the mutation before authorizing it."
    )]
    ResolvedOnMutation {
        type_name: String,
        field_name: String,
    },

    #[error(
        "'@can(find: \"{path}\")' on field '{type_name}.{field_name}' references argument \
         '{argument}', which the field does not declare."
    )]
    MissingFindArgument {
        type_name: String,
        field_name: String,
        path: String,
        argument: String,
    },

    #[error(
        "Unable to infer the model for '@{directive}' on field '{type_name}.{field_name}'. Set \
         the 'model' argument explicitly."
    )]
    UnknownModel {
        type_name: String,
        field_name: String,
        directive: String,
    },

    #[error("Argument '{argument}' of '@{directive}' on '{location}' must be {expected}.")]
    WrongArgumentType {
        location: String,
        directive: String,
        argument: String,
        expected: &'static str,
    },

    #[error("Missing required argument '{argument}' of '@{directive}' on '{location}'.")]
    MissingDirectiveArgument {
        location: String,
        directive: String,
        argument: &'static str,
    },

    #[error(
        "Field '{type_name}.{field_name}' declares more than one resolver directive \
         ('@{first}' and '@{second}'). A field can have at most one."
    )]
    MultipleResolverDirectives {
        type_name: String,
        field_name: String,
        first: String,
        second: String,
    },

    #[error(
        "'@can(action: RETURN_VALUE)' on field '{type_name}.{field_name}' requires the \
         'returnValue' argument."
    )]
    MissingReturnValue {
        type_name: String,
        field_name: String,
    },

    #[error(
        "'@can(returnValue: ...)' on field '{type_name}.{field_name}' has no effect unless \
         'action' is RETURN_VALUE."
    )]
    UselessReturnValue {
        type_name: String,
        field_name: String,
    },

    #[error("The schema does not define a root query type.")]
    MissingQueryType,
}
