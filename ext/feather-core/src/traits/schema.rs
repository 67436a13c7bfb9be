use crate::{Field, LogicalType};

/// Trait for schema introspection
///
/// This trait provides methods for examining and querying schemas
/// without modifying them.
pub trait SchemaInspector {
    /// Get the total number of fields (including nested)
    fn field_count(&self) -> usize;

    /// Get field by path (e.g., "address.city")
    fn get_field_by_path(&self, path: &str) -> Option<&Field>;

    /// Check if schema contains a specific field
    fn has_field(&self, name: &str) -> bool;

    /// Get all field paths in the schema
    fn all_field_paths(&self) -> Vec<String>;
}

impl SchemaInspector for crate::Schema {
    fn field_count(&self) -> usize {
        self.fields.iter().map(count_fields).sum()
    }

    fn get_field_by_path(&self, path: &str) -> Option<&Field> {
        let parts: Vec<&str> = path.split('.').collect();
        let (first, rest) = parts.split_first()?;
        self.fields
            .iter()
            .find(|f| f.name == *first)
            .and_then(|f| get_field_by_path_parts(f, rest))
    }

    fn has_field(&self, name: &str) -> bool {
        self.get_field_by_path(name).is_some()
    }

    fn all_field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for field in &self.fields {
            collect_field_paths(field, String::new(), &mut paths);
        }
        paths
    }
}

fn children(field: &Field) -> &[Field] {
    match &field.logical_type {
        LogicalType::Struct(fields) => fields,
        LogicalType::List(item) => std::slice::from_ref(item.as_ref()),
        _ => &[],
    }
}

fn count_fields(field: &Field) -> usize {
    1 + children(field).iter().map(count_fields).sum::<usize>()
}

fn get_field_by_path_parts<'a>(field: &'a Field, parts: &[&str]) -> Option<&'a Field> {
    match parts.split_first() {
        None => Some(field),
        Some((first, rest)) => children(field)
            .iter()
            .find(|f| f.name == *first)
            .and_then(|f| get_field_by_path_parts(f, rest)),
    }
}

fn collect_field_paths(field: &Field, prefix: String, paths: &mut Vec<String>) {
    let current_path = if prefix.is_empty() {
        field.name.clone()
    } else {
        format!("{}.{}", prefix, field.name)
    };

    paths.push(current_path.clone());

    for child in children(field) {
        collect_field_paths(child, current_path.clone(), paths);
    }
}
