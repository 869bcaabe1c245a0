use check_keyword::CheckKeyword;
use heck::{ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};
use syn::{Ident, __private::Span};

use crate::config::FieldNaming;

/// Turns an arbitrary name into an identifier, escaping keywords.
pub fn name_to_ident(name: &str) -> Ident {
    if ["crate", "self", "super", "Self"].contains(&name) {
        // These are keywords that are not allowed as raw identifiers
        Ident::new(&format!("{}_", name), Span::call_site())
    } else if name.is_keyword() {
        Ident::new_raw(name, Span::call_site())
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        Ident::new(&format!("_{name}"), Span::call_site())
    } else {
        Ident::new(name, Span::call_site())
    }
}

pub fn type_name(name: &str) -> String {
    name.to_pascal_case()
}

pub fn type_ident(name: &str) -> Ident {
    name_to_ident(&type_name(name))
}

pub fn field_name(name: &str, naming: FieldNaming) -> String {
    match naming {
        FieldNaming::Snake => name.to_snake_case(),
        FieldNaming::Camel => name.to_lower_camel_case(),
        FieldNaming::Preserve => name.to_owned(),
    }
}

pub fn field_ident(name: &str, naming: FieldNaming) -> Ident {
    name_to_ident(&field_name(name, naming))
}

/// Functions and modules are always snake case.
pub fn snake_ident(name: &str) -> Ident {
    name_to_ident(&name.to_snake_case())
}

pub fn const_ident(name: &str) -> Ident {
    name_to_ident(&name.to_shouty_snake_case())
}

/// The module names for a dotted package name: `com.Example.api` becomes
/// `["com", "example", "api"]`.
///
/// Module names double as directory names, so raw identifiers are returned without their
/// `r#` prefix.
pub fn package_segments(package: &str) -> Vec<String> {
    package
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(module_name)
        .collect()
}

/// Stem of the file an entity is rendered to.
pub fn file_stem(rust_name: &str) -> String {
    module_name(rust_name.trim_start_matches("r#"))
}

fn module_name(name: &str) -> String {
    let ident = name_to_ident(&name.to_snake_case()).to_string();
    ident.trim_start_matches("r#").to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(name_to_ident("type").to_string(), "r#type");
        assert_eq!(name_to_ident("self").to_string(), "self_");
        assert_eq!(name_to_ident("Self").to_string(), "Self_");
        assert_eq!(name_to_ident("value").to_string(), "value");
        assert_eq!(name_to_ident("3d").to_string(), "_3d");
    }

    #[test]
    fn field_naming_styles() {
        assert_eq!(field_name("userName", FieldNaming::Snake), "user_name");
        assert_eq!(field_name("user_name", FieldNaming::Camel), "userName");
        assert_eq!(field_name("User_name", FieldNaming::Preserve), "User_name");
        assert_eq!(field_ident("Type", FieldNaming::Snake).to_string(), "r#type");
    }

    #[test]
    fn type_and_constant_names() {
        assert_eq!(type_ident("build_status").to_string(), "BuildStatus");
        assert_eq!(type_ident("OK").to_string(), "Ok");
        assert_eq!(const_ident("maxSize").to_string(), "MAX_SIZE");
        assert_eq!(snake_ident("getUser").to_string(), "get_user");
    }

    #[test]
    fn packages_become_module_segments() {
        assert_eq!(package_segments("com.Example.api"), ["com", "example", "api"]);
        assert_eq!(package_segments("a.type.self"), ["a", "type", "self_"]);
        assert_eq!(file_stem("BuildStatus"), "build_status");
        assert_eq!(file_stem("r#match"), "match");
    }
}
