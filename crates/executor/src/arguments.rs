use indexmap::IndexMap;
use parser::types::Field;
use value::{ConstValue, Name, Variables};

use graphward_schema::MetaField;

use crate::ExecuteError;

/// Coerce a field's client-supplied arguments against its definition.
///
/// Declared defaults fill absent arguments; variables are substituted.
/// Arguments that are absent and have no default are simply omitted.
pub(crate) fn coerce_arguments(
    definition: &MetaField,
    field: &Field,
    variables: &Variables,
) -> Result<IndexMap<Name, ConstValue>, ExecuteError> {
    let mut coerced = IndexMap::new();
    for (name, input) in &definition.arguments {
        let supplied = field
            .arguments
            .iter()
            .find(|(argument_name, _)| argument_name.node == *name)
            .map(|(_, value)| value.node.clone());
        match supplied {
            Some(value) => {
                let value = value
                    .into_const_with(|variable| {
                        variables.get(&variable).cloned().ok_or_else(|| {
                            ExecuteError::Resolver(format!(
                                "Variable '${variable}' is not defined."
                            ))
                        })
                    })?;
                coerced.insert(name.clone(), value);
            }
            None => {
                if let Some(default_value) = &input.default_value {
                    coerced.insert(name.clone(), default_value.clone());
                }
            }
        }
    }
    Ok(coerced)
}

/// Read a (possibly dotted) path out of the coerced argument map.
pub(crate) fn lookup_path<'a>(
    arguments: &'a IndexMap<Name, ConstValue>,
    path: &str,
) -> Option<&'a ConstValue> {
    let mut segments = path.split('.');
    let mut current = arguments.get(segments.next()?)?;
    for segment in segments {
        match current {
            ConstValue::Object(object) => current = object.get(segment)?,
            _ => return None,
        }
    }
    match current {
        ConstValue::Null => None,
        value => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_paths_descend_into_objects() {
        let mut input = IndexMap::new();
        input.insert(Name::new("id"), ConstValue::from(7));
        let mut arguments = IndexMap::new();
        arguments.insert(Name::new("input"), ConstValue::Object(input));

        assert_eq!(lookup_path(&arguments, "input.id"), Some(&ConstValue::from(7)));
        assert_eq!(lookup_path(&arguments, "input.missing"), None);
        assert_eq!(lookup_path(&arguments, "missing"), None);
    }

    #[test]
    fn explicit_null_counts_as_missing() {
        let mut arguments = IndexMap::new();
        arguments.insert(Name::new("id"), ConstValue::Null);
        assert_eq!(lookup_path(&arguments, "id"), None);
    }
}
