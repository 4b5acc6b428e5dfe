//! Pure predicates that categorise a source type by its structural shape.
//!
//! Every predicate tolerates handles outside the universe by answering "no".

use std::collections::HashSet;

use crate::metadata::{names, TypeDescriptor, TypeId, TypeKind, TypeUniverse};

fn definition_name(universe: &TypeUniverse, descriptor: &TypeDescriptor) -> Option<String> {
    let definition = descriptor.generic_definition?;
    universe.get(definition).map(|d| d.full_name.clone())
}

fn is_bound_to(universe: &TypeUniverse, id: TypeId, definitions: &[&str]) -> bool {
    universe
        .get(id)
        .and_then(|d| definition_name(universe, d))
        .is_some_and(|name| definitions.contains(&name.as_str()))
}

/// Finds `id` itself, one of its interfaces (transitively) or a base type that
/// is a bound instance of one of `definitions`.
pub fn find_implementation(
    universe: &TypeUniverse,
    id: TypeId,
    definitions: &[&str],
) -> Option<TypeId> {
    let mut visited = HashSet::new();
    let mut pending = vec![id];
    while let Some(current) = pending.pop() {
        if !visited.insert(current) {
            continue;
        }
        if is_bound_to(universe, current, definitions) {
            return Some(current);
        }
        let Some(descriptor) = universe.get(current) else {
            continue;
        };
        if let Some(base) = descriptor.base_type {
            pending.push(base);
        }
        pending.extend(descriptor.interfaces.iter().rev().copied());
    }
    None
}

pub fn is_string(universe: &TypeUniverse, id: TypeId) -> bool {
    universe
        .get(id)
        .is_some_and(|d| d.full_name == names::STRING)
}

/// Key and value types of anything implementing a generic dictionary interface.
pub fn dictionary_arguments(universe: &TypeUniverse, id: TypeId) -> Option<(TypeId, TypeId)> {
    let found = find_implementation(
        universe,
        id,
        &[
            names::DICTIONARY,
            names::IDICTIONARY,
            names::IREADONLY_DICTIONARY,
        ],
    )?;
    match universe.get(found)?.generic_arguments.as_slice() {
        [key, value] => Some((*key, *value)),
        _ => None,
    }
}

pub fn is_dictionary(universe: &TypeUniverse, id: TypeId) -> bool {
    dictionary_arguments(universe, id).is_some()
}

/// Element type of an array or any `IEnumerable<T>` implementer.
///
/// Strings and dictionaries are enumerable at runtime but are never treated
/// as collections here.
pub fn enumerable_element(universe: &TypeUniverse, id: TypeId) -> Option<TypeId> {
    if is_string(universe, id) || is_dictionary(universe, id) {
        return None;
    }
    let descriptor = universe.get(id)?;
    if descriptor.kind == TypeKind::Array {
        return descriptor.element_type;
    }
    let found = find_implementation(universe, id, &[names::ENUMERABLE])?;
    universe.get(found)?.generic_arguments.first().copied()
}

pub fn is_enumerable(universe: &TypeUniverse, id: TypeId) -> bool {
    enumerable_element(universe, id).is_some()
}

pub fn tuple_elements(universe: &TypeUniverse, id: TypeId) -> Option<&[TypeId]> {
    let descriptor = universe.get(id)?;
    let definition = definition_name(universe, descriptor)?;
    if definition.starts_with(names::VALUE_TUPLE) && !descriptor.generic_arguments.is_empty() {
        Some(descriptor.generic_arguments.as_slice())
    } else {
        None
    }
}

pub fn is_tuple(universe: &TypeUniverse, id: TypeId) -> bool {
    tuple_elements(universe, id).is_some()
}

/// Inner type of a nullable value wrapper (`int?`).
pub fn nullable_inner(universe: &TypeUniverse, id: TypeId) -> Option<TypeId> {
    if !is_bound_to(universe, id, &[names::NULLABLE]) {
        return None;
    }
    universe.get(id)?.generic_arguments.first().copied()
}

pub fn is_nullable(universe: &TypeUniverse, id: TypeId) -> bool {
    nullable_inner(universe, id).is_some()
}

pub fn is_generic_parameter(universe: &TypeUniverse, id: TypeId) -> bool {
    universe.get(id).is_some_and(TypeDescriptor::is_generic_parameter)
}

pub fn bound_generic(universe: &TypeUniverse, id: TypeId) -> Option<(TypeId, &[TypeId])> {
    let descriptor = universe.get(id)?;
    if !descriptor.is_bound_generic() {
        return None;
    }
    Some((
        descriptor.generic_definition?,
        descriptor.generic_arguments.as_slice(),
    ))
}

pub fn is_bound_generic(universe: &TypeUniverse, id: TypeId) -> bool {
    bound_generic(universe, id).is_some()
}

/// The untyped root object maps to `any`.
pub fn is_dynamic(universe: &TypeUniverse, id: TypeId) -> bool {
    universe
        .get(id)
        .is_some_and(|d| d.full_name == names::OBJECT)
}

/// Strips one level of `Task<T>`, `ValueTask<T>` or `ActionResult<T>`.
pub fn unwrap_async(universe: &TypeUniverse, id: TypeId) -> TypeId {
    if is_bound_to(
        universe,
        id,
        &[names::TASK, names::VALUE_TASK, names::ACTION_RESULT],
    ) {
        if let Some(inner) = universe.get(id).and_then(|d| d.generic_arguments.first()) {
            return *inner;
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EnumMemberDescriptor;

    #[test]
    fn strings_are_not_enumerable() {
        let mut universe = TypeUniverse::new();
        let string = universe.primitive(names::STRING);
        let char_type = universe.primitive("System.Char");
        let chars = universe.enumerable_of(char_type);
        universe.add_interface(string, chars);

        assert!(!is_enumerable(&universe, string));
        assert!(is_enumerable(&universe, chars));
    }

    #[test]
    fn dictionaries_are_not_enumerable() {
        let mut universe = TypeUniverse::new();
        let string = universe.primitive(names::STRING);
        let int = universe.primitive("System.Int32");
        let dictionary = universe.dictionary_of(string, int);

        assert_eq!(dictionary_arguments(&universe, dictionary), Some((string, int)));
        assert!(!is_enumerable(&universe, dictionary));
    }

    #[test]
    fn enumerable_found_through_base_type() {
        let mut universe = TypeUniverse::new();
        let item = universe.class("Acme.ItemDto");
        let list = universe.list_of(item);
        let derived = universe.class("Acme.ItemCollection");
        universe.set_base_type(derived, list);

        assert_eq!(enumerable_element(&universe, derived), Some(item));
    }

    #[test]
    fn arrays_report_their_element() {
        let mut universe = TypeUniverse::new();
        let int = universe.primitive("System.Int32");
        let array = universe.array_of(int);
        assert_eq!(enumerable_element(&universe, array), Some(int));
    }

    #[test]
    fn tuples_and_nullables() {
        let mut universe = TypeUniverse::new();
        let int = universe.primitive("System.Int32");
        let string = universe.primitive(names::STRING);
        let tuple = universe.tuple_of(&[int, string]);
        let nullable = universe.nullable_of(int);

        assert_eq!(tuple_elements(&universe, tuple), Some(&[int, string][..]));
        assert_eq!(nullable_inner(&universe, nullable), Some(int));
        assert!(!is_nullable(&universe, int));
        assert!(!is_bound_generic(&universe, int));
        assert!(is_bound_generic(&universe, nullable));
    }

    #[test]
    fn unwraps_async_wrappers_once() {
        let mut universe = TypeUniverse::new();
        let dto = universe.enumeration("Acme.Status", vec![EnumMemberDescriptor::new("A", 0)]);
        let task = universe.task_of(dto);
        let nested = universe.task_of(task);

        assert_eq!(unwrap_async(&universe, task), dto);
        assert_eq!(unwrap_async(&universe, nested), task);
        assert_eq!(unwrap_async(&universe, dto), dto);
    }

    #[test]
    fn unknown_handles_answer_no() {
        let universe = TypeUniverse::new();
        assert!(!is_dictionary(&universe, TypeId(42)));
        assert!(!is_dynamic(&universe, TypeId(42)));
        assert_eq!(unwrap_async(&universe, TypeId(42)), TypeId(42));
    }
}
