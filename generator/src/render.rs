use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use syn::{parse_quote, Ident};

use crate::generators::GeneratedEntity;
use crate::naming::name_to_ident;

/// Source text and the path it should be written to, relative to the output directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Renders one entity to its own file.
pub fn render(entity: &GeneratedEntity) -> RenderedFile {
    let header = format!(
        " Generated by {} {} from `{}`. Do not edit.",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        entity.qualified_name
    );
    let file = syn::File {
        shebang: None,
        attrs: vec![
            parse_quote!(#![doc = #header]),
            parse_quote!(#![allow(dead_code, non_camel_case_types, non_snake_case)]),
        ],
        items: entity.items.clone(),
    };
    RenderedFile {
        path: entity.relative_path(),
        contents: prettyplease::unparse(&file),
    }
}

#[derive(Default)]
struct ModuleNode {
    children: BTreeSet<String>,
    files: BTreeSet<String>,
}

/// Renders the `mod.rs` files that declare every package module and re-export the entities
/// in it, from the root module down.
pub fn render_module_tree(entities: &[GeneratedEntity]) -> Vec<RenderedFile> {
    let mut modules: BTreeMap<Vec<String>, ModuleNode> = BTreeMap::new();
    modules.entry(Vec::new()).or_default();
    for entity in entities {
        for depth in 0..entity.module.len() {
            modules
                .entry(entity.module[..depth].to_vec())
                .or_default()
                .children
                .insert(entity.module[depth].clone());
        }
        modules
            .entry(entity.module.clone())
            .or_default()
            .files
            .insert(entity.file_stem.clone());
    }

    let header = format!(
        " Generated by {} {}. Do not edit.",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    modules
        .into_iter()
        .map(|(module, node)| {
            let children = node.children.iter().map(|child| name_to_ident(child));
            let files: Vec<Ident> = node.files.iter().map(|file| name_to_ident(file)).collect();
            let file: syn::File = parse_quote! {
                #![doc = #header]
                #(pub mod #children;)*
                #(mod #files;)*
                #(pub use #files::*;)*
            };
            let mut path: PathBuf = module.iter().collect();
            path.push("mod.rs");
            RenderedFile {
                path,
                contents: prettyplease::unparse(&file),
            }
        })
        .collect()
}
